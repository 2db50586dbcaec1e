//! Target selection.
//!
//! [`TargetFilter`] is a small conjunction of predicates over [`Target`]
//! fields. Matching is pure: a filter that selects nothing yields `None`,
//! never an error.
//!
//! # Example
//!
//! ```
//! use devtools_bridge::TargetFilter;
//!
//! // Main page of the app, not its background page.
//! let filter = TargetFilter::page()
//!     .attachable()
//!     .url_contains("mail.example.com")
//!     .url_excludes("background");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};

use super::target::{Target, TargetType};

// ============================================================================
// TargetFilter
// ============================================================================

/// Predicate used to pick one target out of a discovery listing.
#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    target_type: Option<TargetType>,
    attachable_only: bool,
    url_contains: Vec<String>,
    url_excludes: Vec<String>,
    title_contains: Option<String>,
    url_pattern: Option<Regex>,
}

// ============================================================================
// Constructors
// ============================================================================

impl TargetFilter {
    /// Matches every target.
    #[inline]
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches page targets only.
    #[inline]
    #[must_use]
    pub fn page() -> Self {
        Self::of_type(TargetType::Page)
    }

    /// Matches targets of the given type.
    #[inline]
    #[must_use]
    pub fn of_type(target_type: TargetType) -> Self {
        Self {
            target_type: Some(target_type),
            ..Self::default()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TargetFilter {
    /// Requires a WebSocket debugger URL.
    #[inline]
    #[must_use]
    pub fn attachable(mut self) -> Self {
        self.attachable_only = true;
        self
    }

    /// Requires the URL to contain `needle`. Repeatable.
    #[inline]
    #[must_use]
    pub fn url_contains(mut self, needle: impl Into<String>) -> Self {
        self.url_contains.push(needle.into());
        self
    }

    /// Rejects URLs containing `needle`. Repeatable.
    #[inline]
    #[must_use]
    pub fn url_excludes(mut self, needle: impl Into<String>) -> Self {
        self.url_excludes.push(needle.into());
        self
    }

    /// Requires the title to contain `needle`.
    #[inline]
    #[must_use]
    pub fn title_contains(mut self, needle: impl Into<String>) -> Self {
        self.title_contains = Some(needle.into());
        self
    }

    /// Requires the URL to match a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `pattern` does not compile.
    pub fn url_matches(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::invalid_argument(format!("invalid URL pattern: {e}")))?;
        self.url_pattern = Some(regex);
        Ok(self)
    }
}

// ============================================================================
// Matching
// ============================================================================

impl TargetFilter {
    /// Returns `true` if `target` satisfies every configured predicate.
    #[must_use]
    pub fn matches(&self, target: &Target) -> bool {
        if self
            .target_type
            .is_some_and(|wanted| target.target_type != wanted)
        {
            return false;
        }
        if self.attachable_only && !target.is_attachable() {
            return false;
        }
        if !self.url_contains.iter().all(|n| target.url.contains(n.as_str())) {
            return false;
        }
        if self.url_excludes.iter().any(|n| target.url.contains(n.as_str())) {
            return false;
        }
        if let Some(ref needle) = self.title_contains
            && !target.title.contains(needle.as_str())
        {
            return false;
        }
        if let Some(ref pattern) = self.url_pattern
            && !pattern.is_match(&target.url)
        {
            return false;
        }
        true
    }

    /// Returns the first matching target.
    #[must_use]
    pub fn find<'a>(&self, targets: &'a [Target]) -> Option<&'a Target> {
        super::find_target(targets, |target| self.matches(target))
    }
}

impl fmt::Display for TargetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(target_type) = self.target_type {
            parts.push(format!("type={target_type}"));
        }
        if self.attachable_only {
            parts.push("attachable".to_string());
        }
        parts.extend(self.url_contains.iter().map(|n| format!("url~{n}")));
        parts.extend(self.url_excludes.iter().map(|n| format!("url!~{n}")));
        if let Some(ref needle) = self.title_contains {
            parts.push(format!("title~{needle}"));
        }
        if let Some(ref pattern) = self.url_pattern {
            parts.push(format!("url=/{}/", pattern.as_str()));
        }

        if parts.is_empty() {
            f.write_str("any")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
