//! Print the recorded price history of every label
//!
//! Run with: cargo run --example price_history -- --store labels.json

use esl_price_sync::{format_price, JsonFileStore, PriceLedger, Result, SyncConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let args: Vec<String> = std::env::args().collect();
    let store_path = args
        .iter()
        .position(|a| a == "--store")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| "labels.json".to_string());

    let config = SyncConfig::default();
    let store = Arc::new(JsonFileStore::open(&store_path).await?);
    let ledger = PriceLedger::new(store);

    let points = ledger.history_report(&config.label_names()).await?;
    if points.is_empty() {
        println!("No price history in {}", store_path);
        return Ok(());
    }

    let mut current_product = None;
    for point in &points {
        if current_product != Some(point.product.as_str()) {
            println!("\n{}", point.product);
            println!("{}", "-".repeat(point.product.len()));
            current_product = Some(point.product.as_str());
        }
        println!("  {}  {:>12}", point.day.format("%d/%m/%Y"), format_price(point.price));
    }

    Ok(())
}
