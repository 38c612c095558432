//! Priced inventory items, owned by the inventory collaborator.

use crate::core::error::Result;
use crate::core::metal::{MetalType, Purity};
use crate::core::valuation::ValuationInput;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedItem {
    pub id: String,
    pub shop_id: String,
    pub sku: String,
    pub metal_type: MetalType,
    #[serde(rename = "purityKarat")]
    pub purity: Purity,
    pub net_weight_grams: Decimal,
    pub gross_weight_grams: Decimal,
    pub making_charges: Decimal,
    pub wastage_percentage: Decimal,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub is_available: bool,
}

impl PricedItem {
    pub fn valuation_input(&self) -> ValuationInput {
        ValuationInput {
            net_weight_grams: self.net_weight_grams,
            making_charges: self.making_charges,
            wastage_percentage: self.wastage_percentage,
        }
    }
}

/// Read/write contract the pricing engine needs from the inventory.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn list_items(&self, shop_id: &str) -> Result<Vec<PricedItem>>;

    async fn save_item(&self, item: PricedItem) -> Result<PricedItem>;

    /// Rewrites only the cost and selling price of an existing item.
    async fn update_prices(
        &self,
        shop_id: &str,
        item_id: &str,
        cost_price: Decimal,
        selling_price: Decimal,
    ) -> Result<()>;

    async fn list_available(&self, shop_id: &str) -> Result<Vec<PricedItem>> {
        Ok(self
            .list_items(shop_id)
            .await?
            .into_iter()
            .filter(|item| item.is_available)
            .collect())
    }
}
