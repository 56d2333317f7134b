//! Built-in listings shipped with the client.
//!
//! The supplier marketplace is local data (no backend endpoint serves it),
//! and the shop keeps a starter catalog for offline/dev runs.

#![forbid(unsafe_code)]

use smallvec::SmallVec;

use crate::{Product, Supplier};

fn supplier(
    id: u64,
    name: &str,
    category: &str,
    verified: bool,
    location: &str,
    state: &str,
    moq: u32,
    price_min: f64,
    price_max: f64,
    sustainability_rating: u32,
) -> Supplier {
    Supplier {
        id,
        name: name.to_string(),
        category: category.to_string(),
        verified,
        location: location.to_string(),
        state: state.to_string(),
        moq,
        unit: "Tons".to_string(),
        price_min,
        price_max,
        price_unit: "Ton".to_string(),
        sustainability_rating,
    }
}

/// The marketplace listing. Order is "recently joined" first.
pub fn suppliers() -> Vec<Supplier> {
    vec![
        supplier(1, "GreenPulse Bio-Energy", "Power Plant", true, "Ludhiana", "Punjab", 50, 2400.0, 2800.0, 85),
        supplier(2, "EverLeaf Paper Mills", "Paper Industry", true, "Karnal", "Haryana", 100, 3000.0, 3500.0, 92),
        supplier(3, "Eco-Brick Solutions", "Construction", false, "Meerut", "Uttar Pradesh", 20, 2000.0, 2200.0, 65),
        supplier(4, "AgroFuel Ltd.", "Ethanol Plant", true, "Bikaner", "Rajasthan", 200, 2600.0, 3100.0, 78),
        supplier(5, "Sustaina-Box Co.", "Packaging", true, "Ambala", "Haryana", 10, 3200.0, 3600.0, 88),
        supplier(6, "BioHarvest India", "Power Plant", true, "Amritsar", "Punjab", 75, 2100.0, 2500.0, 71),
    ]
}

struct ProductSeed {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    product_type: &'static str,
    price: f64,
    bulk_price: f64,
    image: &'static str,
    size: Option<&'static str>,
    badge: Option<&'static str>,
    eco_score: u32,
}

const PRODUCT_SEEDS: &[ProductSeed] = &[
    ProductSeed { id: "1", name: "Classic Rice Straw Dinner Plate", category: "PLATES", product_type: "Plates", price: 24.0, bulk_price: 18.5, image: "plates", size: Some("10-inch"), badge: Some("Best Seller"), eco_score: 94 },
    ProductSeed { id: "2", name: "Deep Harvest Cereal Bowl", category: "BOWLS", product_type: "Bowls", price: 18.0, bulk_price: 14.0, image: "bowls", size: Some("16oz"), badge: None, eco_score: 88 },
    ProductSeed { id: "3", name: "Rectangle Serving Tray XL", category: "TRAYS", product_type: "Trays", price: 32.0, bulk_price: 26.0, image: "tray", size: Some("14x10 inch"), badge: None, eco_score: 91 },
    ProductSeed { id: "4", name: "Eco-Party Combo Pack (50pcs)", category: "COMBO PACKS", product_type: "Combo Packs", price: 85.0, bulk_price: 72.0, image: "combo", size: None, badge: Some("Best Value"), eco_score: 96 },
    ProductSeed { id: "5", name: "Square Tapas Plate Set", category: "PLATES", product_type: "Plates", price: 22.0, bulk_price: 18.0, image: "plates", size: Some("6-inch"), badge: None, eco_score: 90 },
    ProductSeed { id: "6", name: "Minimalist Soup Bowl", category: "BOWLS", product_type: "Bowls", price: 15.0, bulk_price: 11.5, image: "bowls", size: Some("12oz"), badge: None, eco_score: 87 },
    ProductSeed { id: "7", name: "Biodegradable Cutlery Set", category: "CUTLERY", product_type: "Cutlery", price: 18.0, bulk_price: 14.0, image: "cutlery", size: None, badge: None, eco_score: 93 },
    ProductSeed { id: "8", name: "Compostable Straws - Natural Finish", category: "CUTLERY", product_type: "Cutlery", price: 12.0, bulk_price: 9.0, image: "straws", size: None, badge: None, eco_score: 95 },
    ProductSeed { id: "9", name: "Rice Straw Dinner Plates (Set of 25)", category: "PLATES", product_type: "Plates", price: 29.0, bulk_price: 24.0, image: "plates", size: Some("10-inch"), badge: Some("Sustainable Choice"), eco_score: 94 },
];

/// The starter catalog used when the backend is unreachable.
pub fn products() -> Vec<Product> {
    PRODUCT_SEEDS
        .iter()
        .map(|s| Product {
            id: s.id.to_string(),
            name: s.name.to_string(),
            category: s.category.to_string(),
            price: s.price,
            bulk_price: Some(s.bulk_price),
            image: s.image.to_string(),
            size: s.size.map(|v| v.to_string()),
            badge: s.badge.map(|v| v.to_string()),
            eco_score: Some(s.eco_score),
            product_type: Some(s.product_type.to_string()),
            stock: None,
            tiers: SmallVec::new(),
            metrics: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #[test]
    fn listings_are_populated() {
        let sup = super::suppliers();
        assert_eq!(sup.len(), 6);
        assert!(sup.iter().any(|s| !s.verified));
        let prods = super::products();
        assert_eq!(prods.len(), 9);
        assert!(prods.iter().all(|p| !p.id.is_empty() && p.price > 0.0));
    }
}
