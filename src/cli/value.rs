use super::ui;
use crate::core::metal::{MetalType, Purity};
use crate::core::service::RateService;
use crate::core::valuation::{ValuationInput, ValuationResult};
use anyhow::{Context, Result};
use comfy_table::Cell;
use rust_decimal::Decimal;

/// Prints the itemized valuation of a piece at the current rate.
pub async fn run(
    service: &RateService,
    metal: MetalType,
    purity: Purity,
    input: ValuationInput,
    currency: &str,
) -> Result<()> {
    let result = service
        .appraise(metal, purity, &input)
        .await
        .with_context(|| format!("Failed to value {metal} {purity} item"))?;
    let tax_percent = service.tax_rate() * Decimal::ONE_HUNDRED;
    display_valuation(metal, purity, &input, &result, tax_percent, currency);
    Ok(())
}

fn display_valuation(
    metal: MetalType,
    purity: Purity,
    input: &ValuationInput,
    result: &ValuationResult,
    tax_percent: Decimal,
    currency: &str,
) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Component"), ui::header_cell("Amount")]);
    table.add_row(vec![
        Cell::new(format!(
            "Metal ({}g at {}/g)",
            input.net_weight_grams.normalize(),
            result.rate_used.normalize()
        )),
        ui::money_cell(result.metal_value, currency),
    ]);
    table.add_row(vec![
        Cell::new(format!("Wastage ({}%)", input.wastage_percentage.normalize())),
        ui::money_cell(result.wastage_value, currency),
    ]);
    table.add_row(vec![
        Cell::new("Making charges"),
        ui::money_cell(result.making_charges, currency),
    ]);
    table.add_row(vec![
        Cell::new("Stones"),
        ui::money_cell(result.stone_value, currency),
    ]);
    table.add_row(vec![
        Cell::new("Subtotal"),
        ui::money_cell(result.subtotal, currency),
    ]);
    table.add_row(vec![
        Cell::new(format!("Tax ({}%)", tax_percent.normalize())),
        ui::money_cell(result.tax_amount, currency),
    ]);
    table.add_row(vec![
        Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
        ui::total_cell(result.total_value, currency),
    ]);

    println!(
        "\n{}",
        ui::style_text(&format!("Valuation: {metal} {purity}"), ui::StyleType::Title)
    );
    println!("{table}");
}

