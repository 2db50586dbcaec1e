//! Target discovery demonstration.
//!
//! Demonstrates:
//! - Browser version lookup
//! - Listing every target on the debugging port
//! - Picking a target with a filter
//!
//! Start a browser first:
//!   chrome --remote-debugging-port=9222
//!
//! Usage:
//!   cargo run --example list_targets
//!   cargo run --example list_targets -- --port 9333 --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use devtools_bridge::{Discovery, Result, TargetFilter};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Target Discovery ({}:{}) ===\n", args.host, args.port);

    let discovery = Discovery::new(&args.host, args.port)?;

    let version = discovery.version().await?;
    println!("[Version] {} (protocol {})", version.browser, version.protocol_version);

    let targets = discovery.list_targets().await?;
    println!("[Targets] {} found", targets.len());
    for target in &targets {
        let marker = if target.is_attachable() { "*" } else { " " };
        println!("  {marker} {:<16} {} {}", target.target_type, target.id, target.url);
    }

    let filter = TargetFilter::page().attachable().url_excludes("chrome-extension://");
    match filter.find(&targets) {
        Some(target) => println!("\n[Selected] {target} ({filter})"),
        None => println!("\n[Selected] nothing matches {filter}"),
    }

    Ok(())
}
