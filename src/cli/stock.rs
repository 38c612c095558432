use super::ui;
use crate::core::service::{NewItem, RateService};
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Prices and stores a new item.
pub async fn add(service: &RateService, new_item: NewItem, currency: &str) -> Result<()> {
    let sku = new_item.sku.clone();
    let item = service
        .add_item(new_item)
        .await
        .with_context(|| format!("Failed to add item {sku}"))?;

    println!(
        "Added {} ({}) cost {} selling {}",
        ui::style_text(&item.sku, ui::StyleType::TotalLabel),
        ui::style_text(&item.id, ui::StyleType::Subtle),
        ui::format_money(item.cost_price, currency),
        ui::style_text(
            &ui::format_money(item.selling_price, currency),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}

/// Lists a shop's items followed by the stock valuation totals.
pub async fn report(service: &RateService, shop_id: &str, currency: &str) -> Result<()> {
    let items = service.list_items(shop_id).await?;
    if items.is_empty() {
        println!("No items in shop {shop_id}.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("SKU"),
        ui::header_cell("Metal"),
        ui::header_cell("Purity"),
        ui::header_cell("Net g"),
        ui::header_cell("Cost"),
        ui::header_cell("Selling"),
        ui::header_cell("Status"),
    ]);
    for item in &items {
        table.add_row(vec![
            Cell::new(&item.sku),
            Cell::new(item.metal_type),
            Cell::new(item.purity),
            Cell::new(item.net_weight_grams.normalize()),
            ui::money_cell(item.cost_price, currency),
            ui::money_cell(item.selling_price, currency),
            Cell::new(if item.is_available { "available" } else { "sold" }),
        ]);
    }

    let stock = service.stock_report(shop_id).await?;
    for (metal, cost) in &stock.cost_by_metal {
        table.add_row(vec![
            Cell::new(ui::style_text(
                &format!("Total {metal}"),
                ui::StyleType::TotalLabel,
            )),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            ui::total_cell(*cost, currency),
            Cell::new(""),
            Cell::new(""),
        ]);
    }

    println!(
        "\nShop: {}",
        ui::style_text(shop_id, ui::StyleType::Title)
    );
    println!("{table}");
    println!(
        "{} {} ({} available, {} sold) worth {}",
        ui::style_text("Items:", ui::StyleType::TotalLabel),
        stock.total_items,
        stock.available_items,
        stock.sold_items,
        ui::style_text(
            &ui::format_money(stock.total_cost_value, currency),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}
