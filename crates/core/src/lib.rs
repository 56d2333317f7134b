//! Zestraw core types: the canonical product/cart/supplier model.
//!
//! The backend serves products under two generations of field names; the
//! normalization helpers here map any accepted raw shape into one canonical
//! `Product` at the system boundary. Engines never see raw JSON.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

pub mod builtin;

/// Display-only impact numbers attached to a product or cart line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityMetrics {
    pub carbon_footprint: f64,
    pub plastic_use: f64,
    pub plastic_avoided: f64,
}

/// One size/price entry for products sold in multiple pack sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub size: String,
    pub price: f64,
}

/// Canonical catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_price: Option<f64>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub tiers: SmallVec<[PriceTier; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SustainabilityMetrics>,
}

/// Descriptor for a line item about to enter the cart: everything but the
/// quantity. Display fields are copied from the product at add time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub name: String,
    pub unit_price: f64,
    pub image: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SustainabilityMetrics>,
}

impl NewLineItem {
    pub fn from_product(p: &Product) -> Self {
        Self {
            product_id: p.id.clone(),
            variant: None,
            name: p.name.clone(),
            unit_price: p.price,
            image: p.image.clone(),
            category: p.category.clone(),
            metrics: p.metrics,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// One row of the cart, unique by `(product_id, variant)`.
/// `quantity` is at least 1 while the row exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub name: String,
    pub unit_price: f64,
    pub image: String,
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub metrics: SustainabilityMetrics,
}

impl CartLineItem {
    /// Build a fresh row from a descriptor; metrics default to zeros when
    /// the product carries none.
    pub fn new(item: NewLineItem, quantity: u32) -> Self {
        Self {
            product_id: item.product_id,
            variant: item.variant,
            name: item.name,
            unit_price: item.unit_price,
            image: item.image,
            category: item.category,
            quantity,
            metrics: item.metrics.unwrap_or_default(),
        }
    }

    pub fn matches(&self, product_id: &str, variant: Option<&str>) -> bool {
        self.product_id == product_id && self.variant.as_deref() == variant
    }

    /// Replace the descriptor fields, keeping the quantity untouched.
    pub fn refresh(&mut self, item: NewLineItem) {
        self.name = item.name;
        self.unit_price = item.unit_price;
        self.image = item.image;
        self.category = item.category;
        if let Some(m) = item.metrics {
            self.metrics = m;
        }
    }
}

/// Marketplace supplier row. Immutable within a listing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub verified: bool,
    pub location: String,
    pub state: String,
    pub moq: u32,
    pub unit: String,
    pub price_min: f64,
    pub price_max: f64,
    pub price_unit: String,
    pub sustainability_rating: u32,
}

// ---- Boundary normalization ----

fn str_field<'a>(raw: &'a serde_json::Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| raw.get(*k).and_then(|v| v.as_str()))
}

fn num_field(raw: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| raw.get(*k).and_then(|v| v.as_f64()))
}

/// Map one raw backend product row to the canonical shape.
///
/// Accepts both field generations (`_id`/`id`, `productName`/`name`,
/// `productPrice`/`price`, `images`/`image`, `sizesAvailable`). Returns
/// `None` when the row carries neither an id nor a name.
pub fn normalize_product(raw: &serde_json::Value) -> Option<Product> {
    let name = str_field(raw, &["productName", "name"]).unwrap_or("").to_string();
    let id = match str_field(raw, &["_id", "id"]) {
        Some(s) => s.to_string(),
        None if !name.is_empty() => name.clone(),
        None => return None,
    };

    let mut tiers: SmallVec<[PriceTier; 4]> = SmallVec::new();
    if let Some(sizes) = raw.get("sizesAvailable").and_then(|v| v.as_array()) {
        for s in sizes {
            let label = match s.get("size") {
                Some(serde_json::Value::String(t)) => t.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            if let Some(price) = s.get("price").and_then(|v| v.as_f64()) {
                tiers.push(PriceTier { size: label, price });
            }
        }
    }

    // Single price falls back to the cheapest tier for tiered products.
    let price = num_field(raw, &["productPrice", "price"])
        .or_else(|| tiers.iter().map(|t| t.price).reduce(f64::min))
        .unwrap_or(0.0);

    let image = raw
        .get("images")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .or_else(|| str_field(raw, &["image"]))
        .unwrap_or("")
        .to_string();

    let metrics = raw.get("sustainabilityMetrics").map(|m| SustainabilityMetrics {
        carbon_footprint: m.get("carbonFootprint").and_then(|v| v.as_f64()).unwrap_or(0.0),
        plastic_use: m.get("plasticUse").and_then(|v| v.as_f64()).unwrap_or(0.0),
        plastic_avoided: m.get("plasticAvoided").and_then(|v| v.as_f64()).unwrap_or(0.0),
    });

    Some(Product {
        id,
        name,
        category: str_field(raw, &["category"]).unwrap_or("").to_string(),
        price,
        bulk_price: num_field(raw, &["bulkPrice"]),
        image,
        size: str_field(raw, &["size"]).map(|s| s.to_string()),
        badge: str_field(raw, &["badge"]).map(|s| s.to_string()),
        eco_score: raw.get("ecoScore").and_then(|v| v.as_u64()).map(|n| n as u32),
        product_type: str_field(raw, &["type"]).map(|s| s.to_string()),
        stock: raw.get("stock").and_then(|v| v.as_u64()).map(|n| n as u32),
        tiers,
        metrics,
    })
}

/// Normalize a whole listing, dropping rows that fail normalization.
pub fn normalize_products(rows: &[serde_json::Value]) -> Vec<Product> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match normalize_product(row) {
            Some(p) => out.push(p),
            None => warn!("dropping product row without id or name"),
        }
    }
    out
}

pub mod prelude {
    pub use super::{
        CartLineItem, NewLineItem, PriceTier, Product, Supplier, SustainabilityMetrics,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_current_shape() {
        let raw = serde_json::json!({
            "_id": "663a1f",
            "productName": "Classic Rice Straw Dinner Plate",
            "category": "PLATES",
            "productPrice": 24.0,
            "images": ["https://cdn/plates-1.jpg", "https://cdn/plates-2.jpg"],
            "sizesAvailable": [
                { "size": 25, "price": 29.0 },
                { "size": "10-inch", "price": 24.0 }
            ],
            "stock": 120,
            "sustainabilityMetrics": { "carbonFootprint": 0.4, "plasticUse": 0.0, "plasticAvoided": 1.2 }
        });
        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.id, "663a1f");
        assert_eq!(p.name, "Classic Rice Straw Dinner Plate");
        assert_eq!(p.price, 24.0);
        assert_eq!(p.image, "https://cdn/plates-1.jpg");
        assert_eq!(p.tiers.len(), 2);
        assert_eq!(p.tiers[0].size, "25");
        assert_eq!(p.stock, Some(120));
        assert_eq!(p.metrics.unwrap().plastic_avoided, 1.2);
    }

    #[test]
    fn normalizes_legacy_shape() {
        let raw = serde_json::json!({
            "id": "4",
            "name": "Eco-Party Combo Pack (50pcs)",
            "category": "COMBO PACKS",
            "type": "Combo Packs",
            "price": 85.0,
            "bulkPrice": 72.0,
            "image": "combo",
            "badge": "Best Value",
            "ecoScore": 96
        });
        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.id, "4");
        assert_eq!(p.name, "Eco-Party Combo Pack (50pcs)");
        assert_eq!(p.price, 85.0);
        assert_eq!(p.bulk_price, Some(72.0));
        assert_eq!(p.image, "combo");
        assert_eq!(p.product_type.as_deref(), Some("Combo Packs"));
        assert_eq!(p.eco_score, Some(96));
        assert!(p.metrics.is_none());
    }

    #[test]
    fn tiered_product_without_flat_price_uses_cheapest_tier() {
        let raw = serde_json::json!({
            "_id": "p9",
            "productName": "Dinner Plates",
            "category": "PLATES",
            "sizesAvailable": [
                { "size": 50, "price": 54.0 },
                { "size": 25, "price": 29.0 }
            ]
        });
        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.price, 29.0);
    }

    #[test]
    fn drops_unidentifiable_rows() {
        assert!(normalize_product(&serde_json::json!({ "category": "PLATES" })).is_none());
        let rows = vec![
            serde_json::json!({ "id": "1", "name": "a", "category": "X", "price": 1.0, "image": "a" }),
            serde_json::json!({ "price": 3.0 }),
        ];
        assert_eq!(normalize_products(&rows).len(), 1);
    }

    #[test]
    fn line_item_defaults_metrics_at_insertion() {
        let item = NewLineItem {
            product_id: "1".into(),
            variant: None,
            name: "Plate".into(),
            unit_price: 24.0,
            image: "plates".into(),
            category: "PLATES".into(),
            metrics: None,
        };
        let line = CartLineItem::new(item, 2);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.metrics, SustainabilityMetrics::default());
    }
}
