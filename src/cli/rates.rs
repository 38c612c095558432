use super::ui;
use crate::core::metal::{MetalType, Purity};
use crate::core::rate::RateRecord;
use crate::core::service::RateService;
use anyhow::{Context, Result};
use comfy_table::Cell;
use rust_decimal::Decimal;

/// Shows the active rate, acquiring one when the store has none.
pub async fn current(
    service: &RateService,
    metal: MetalType,
    purity: Purity,
    currency: &str,
) -> Result<()> {
    let record = service
        .get_current_rate(metal, purity)
        .await
        .with_context(|| format!("Failed to get current rate for {metal} {purity}"))?;
    display_record("Current rate", &record, currency);
    Ok(())
}

/// Acquires a fresh rate from the upstream feeds.
pub async fn refresh(
    service: &RateService,
    metal: MetalType,
    purity: Purity,
    currency: &str,
) -> Result<()> {
    let record = service
        .fetch_and_refresh(metal, purity)
        .await
        .with_context(|| format!("Failed to refresh rate for {metal} {purity}"))?;
    display_record("Refreshed rate", &record, currency);
    Ok(())
}

/// Records an operator-entered rate.
pub async fn set(
    service: &RateService,
    metal: MetalType,
    purity: Purity,
    rate_per_gram: Decimal,
    currency: &str,
) -> Result<()> {
    let record = service
        .update_rate_manually(metal, purity, rate_per_gram)
        .await
        .with_context(|| format!("Failed to set rate for {metal} {purity}"))?;
    display_record("Manual rate recorded", &record, currency);
    Ok(())
}

/// Lists a pair's rate history, newest first, with the change to the
/// previous record.
pub async fn history(
    service: &RateService,
    metal: MetalType,
    purity: Purity,
    days: u32,
    currency: &str,
) -> Result<()> {
    let records = service.get_rate_history(metal, purity, days).await?;
    if records.is_empty() {
        println!("No rates recorded for {metal} {purity} in the last {days} days.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Effective"),
        ui::header_cell("Rate / g"),
        ui::header_cell("Change"),
        ui::header_cell("Source"),
        ui::header_cell("Status"),
    ]);

    for (i, record) in records.iter().enumerate() {
        let change = records
            .get(i + 1)
            .and_then(|older| ui::percent_change(older.rate_per_gram, record.rate_per_gram));
        table.add_row(vec![
            Cell::new(record.effective_date.format("%Y-%m-%d %H:%M")),
            ui::money_cell(record.rate_per_gram, currency),
            ui::change_cell(change),
            Cell::new(record.source),
            ui::active_cell(record.is_active),
        ]);
    }

    println!(
        "\n{}",
        ui::style_text(
            &format!("{metal} {purity} rates, last {days} days"),
            ui::StyleType::Title
        )
    );
    println!("{table}");
    Ok(())
}

fn display_record(title: &str, record: &RateRecord, currency: &str) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Metal"),
        ui::header_cell("Purity"),
        ui::header_cell("Rate / g"),
        ui::header_cell("Source"),
        ui::header_cell("Effective"),
    ]);
    table.add_row(vec![
        Cell::new(record.metal_type),
        Cell::new(record.purity),
        ui::total_cell(record.rate_per_gram, currency),
        Cell::new(record.source),
        Cell::new(record.effective_date.format("%Y-%m-%d %H:%M UTC")),
    ]);

    println!("\n{}", ui::style_text(title, ui::StyleType::Title));
    println!("{table}");
}
