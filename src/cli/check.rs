use crate::channels::message::format_price;
use crate::core::models::{InventoryItem, InventoryResponse};
use crate::core::settings::Settings;
use crate::providers::{InventorySource, TeslaInventory};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CheckOutput {
    listed: u64,
    skipped: usize,
    items: Vec<InventoryItem>,
}

/// Polls the inventory once and prints what was found. Sends nothing and
/// leaves tracker state alone.
pub async fn run(config: Option<&Path>, json: bool) -> Result<()> {
    let settings = Settings::load_read_only(config)?;
    let source = TeslaInventory::new(&settings.inventory)?;
    let output = collect(source.fetch().await?);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn collect(response: InventoryResponse) -> CheckOutput {
    let mut items = Vec::with_capacity(response.results.len());
    let mut skipped = 0;

    for record in &response.results {
        match InventoryItem::from_value(record) {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping inventory record");
                skipped += 1;
            }
        }
    }

    CheckOutput {
        listed: response.total_matches_found,
        skipped,
        items,
    }
}

fn print_text_output(output: &CheckOutput) {
    if output.items.is_empty() {
        println!("No vehicles in stock");
        return;
    }

    println!("{} listed, {} shown", output.listed, output.items.len());
    for item in &output.items {
        println!(
            "  {:<18} {:<32} {}",
            item.vin,
            item.trim_name,
            format_price(&item.price)
        );
    }
    if output.skipped > 0 {
        println!("  ({} incomplete records skipped)", output.skipped);
    }
}
