//! Network event capture demonstration.
//!
//! Demonstrates:
//! - Attaching to the first page target
//! - Listening for `Network.requestWillBeSent` / `Network.responseReceived`
//! - Enabling a domain and invoking a command
//! - Closing the connection
//!
//! Start a browser first:
//!   chrome --remote-debugging-port=9222
//!
//! Usage:
//!   cargo run --example capture_network
//!   cargo run --example capture_network -- --no-wait --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use common::Args;
use devtools_bridge::{ConnectOptions, Result, connect};

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
    println!("=== Network Capture ===\n");

    let options = ConnectOptions::from_env()?;
    let connection = connect(&args.host, args.port, options).await?;
    println!("[Attached] {}", connection.url());

    let requests = Arc::new(AtomicUsize::new(0));

    // ========================================================================
    // Listeners
    // ========================================================================

    let network = connection.domain("Network")?;
    {
        let requests = Arc::clone(&requests);
        network.on("requestWillBeSent", move |event| {
            requests.fetch_add(1, Ordering::Relaxed);
            let method = event.params["request"]["method"].as_str().unwrap_or("?");
            let url = event.params["request"]["url"].as_str().unwrap_or("?");
            println!("  -> {method} {url}");
        })?;
    }
    network.on("responseReceived", |event| {
        let status = &event.params["response"]["status"];
        let url = event.params["response"]["url"].as_str().unwrap_or("?");
        println!("  <- {status} {url}");
    })?;

    network.enable().await?;
    println!("[Network] enabled");

    // ========================================================================
    // Trigger traffic
    // ========================================================================

    let result = connection
        .invoke(
            "Runtime",
            "evaluate",
            json!({ "expression": "location.reload(); location.href" }),
        )
        .await?;
    println!("[Runtime] {}", result["result"]["value"]);

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Teardown
    // ========================================================================

    network.disable().await?;
    println!("\n[Done] {} requests seen", requests.load(Ordering::Relaxed));
    connection.close().await;

    Ok(())
}
