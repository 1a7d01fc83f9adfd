//! Basic example: list which shelf labels are in range
//!
//! Run with: cargo run --example discover_labels

use esl_price_sync::{BtleplugTransport, DiscoveryCache, Result, SyncConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("esl_price_sync=debug".parse().unwrap()),
        )
        .init();

    let config = SyncConfig::default();
    let expected = config.expected_labels();

    println!("Scanning {:?} for {:?}...\n", config.scan_window, expected);

    let transport = Arc::new(BtleplugTransport::new().await?);
    let cache = DiscoveryCache::new(transport, config.discovery_ttl);
    let online = cache.discover(&expected, config.scan_window).await;

    for name in &expected {
        match online.address(name) {
            Some(address) => println!("  {:<10} online  ({})", name, address),
            None => println!("  {:<10} offline", name),
        }
    }

    println!("\n{} of {} labels online", online.len(), expected.len());

    Ok(())
}
