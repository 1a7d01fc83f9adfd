//! Send a price to one label and record it in the price history
//!
//! Run with: cargo run --example send_price -- --label LABEL-1 --price 12,50

use esl_price_sync::{JsonFileStore, LabelManager, MessageKind, Result, SyncConfig};
use std::sync::Arc;

fn arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let args: Vec<String> = std::env::args().collect();
    let label = arg(&args, "--label").unwrap_or_else(|| "LABEL-1".to_string());
    let price = arg(&args, "--price").unwrap_or_else(|| "0.00".to_string());
    let store_path = arg(&args, "--store").unwrap_or_else(|| "labels.json".to_string());

    let store = Arc::new(JsonFileStore::open(&store_path).await?);
    let manager = LabelManager::with_bluetooth(SyncConfig::default(), store).await?;
    manager.start().await?;

    println!("Label Dashboard");
    println!("===============\n");

    for view in manager.refresh().await {
        println!(
            "{:<10} {:<20} {:<8} {:>12}   last contact: {}",
            view.name,
            view.product,
            format!("{:?}", view.status),
            view.current_price_display,
            view.last_contact_display
        );
    }

    println!("\nSending {} to {}...", price, label);

    manager.on_draft_change(&label, &price).await?;
    let view = manager.on_send(&label).await?;

    match view.message {
        Some(message) => {
            let marker = match message.kind {
                MessageKind::Success => "OK",
                MessageKind::Warning => "WARNING",
                MessageKind::Error => "ERROR",
            };
            println!("[{}] {}", marker, message.text);
        }
        None => println!("Nothing was sent."),
    }

    let view = manager.render(&label).await?;
    println!(
        "{} now shows {} (last contact {})",
        view.name, view.current_price_display, view.last_contact_display
    );

    Ok(())
}
