use super::ui;
use crate::core::service::RateService;
use anyhow::{Context, Result};

/// Reprices a shop's available items at the current rates.
pub async fn run(service: &RateService, shop_id: &str) -> Result<()> {
    let available = service
        .list_items(shop_id)
        .await
        .with_context(|| format!("Failed to list items for shop {shop_id}"))?
        .iter()
        .filter(|item| item.is_available)
        .count();
    if available == 0 {
        println!("No available items in shop {shop_id}.");
        return Ok(());
    }

    let pb = ui::new_progress_bar(available as u64, true);
    pb.set_message("Repricing");
    let report = service
        .propagate_prices_with_progress(shop_id, &|| pb.inc(1))
        .await
        .with_context(|| format!("Failed to propagate prices for shop {shop_id}"))?;
    pb.finish_and_clear();

    println!(
        "{} {} items updated, {} failed",
        ui::style_text("Repriced:", ui::StyleType::TotalLabel),
        ui::style_text(&report.updated_count.to_string(), ui::StyleType::TotalValue),
        report.failures.len()
    );
    for failure in &report.failures {
        println!(
            "  {} {}",
            ui::style_text(&failure.item_id, ui::StyleType::Error),
            ui::style_text(&failure.reason, ui::StyleType::Subtle)
        );
    }
    Ok(())
}
