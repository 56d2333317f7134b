#![forbid(unsafe_code)]

use std::sync::Arc;

use zestraw_cart::{load_items, save_items, CartEngine};
use zestraw_core::NewLineItem;
use zestraw_persist::{MemoryStore, Store, CART_SLOT};

fn item(id: &str, variant: Option<&str>, price: f64) -> NewLineItem {
    NewLineItem {
        product_id: id.to_string(),
        variant: variant.map(|s| s.to_string()),
        name: format!("Product {}", id),
        unit_price: price,
        image: "plates".to_string(),
        category: "PLATES".to_string(),
        metrics: None,
    }
}

#[test]
fn restart_roundtrip_preserves_entries() {
    let store = Arc::new(MemoryStore::new());

    let mut engine = CartEngine::open(store.clone());
    engine.add_item(item("P1", None, 24.0), 2).unwrap();
    engine.add_item(item("P1", Some("6-inch"), 22.0), 1).unwrap();
    engine.add_item(item("P2", None, 18.0), 3).unwrap();
    engine.update_quantity("P2", 4, None).unwrap();
    let before: Vec<_> = engine.items().to_vec();
    drop(engine);

    // Simulated restart: hydrate a fresh engine from the same store.
    let engine = CartEngine::open(store);
    assert_eq!(engine.items(), before.as_slice());
    assert_eq!(engine.total_items(), 7);
    assert_eq!(engine.subtotal(), 24.0 * 2.0 + 22.0 + 18.0 * 4.0);
}

#[test]
fn hydration_treats_garbage_as_empty() {
    let store = Arc::new(MemoryStore::new());
    store.save(CART_SLOT, b"{{{ definitely not a cart").unwrap();
    let engine = CartEngine::open(store);
    assert!(engine.items().is_empty());
    assert_eq!(engine.total_items(), 0);
}

#[test]
fn save_load_pair_is_lossless() {
    let mut items = Vec::new();
    for (id, qty) in [("P1", 1u32), ("P2", 9)] {
        let mut line = zestraw_core::CartLineItem::new(item(id, Some("10-inch"), 29.0), qty);
        line.metrics.plastic_avoided = 0.8;
        items.push(line);
    }
    let restored = load_items(&save_items(&items));
    assert_eq!(restored, items);
}

struct FailingStore;

impl Store for FailingStore {
    fn save(&self, _slot: &str, _body: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("quota exceeded")
    }

    fn load(&self, _slot: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

#[test]
fn store_failure_surfaces_but_memory_stands() {
    let mut engine = CartEngine::open(Arc::new(FailingStore));
    let err = engine.add_item(item("P1", None, 24.0), 2).unwrap_err();
    assert!(err.to_string().contains("quota"));
    // The in-memory mutation and the published snapshot both took effect.
    assert_eq!(engine.total_items(), 2);
    let snap = engine.handle().current();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].quantity, 2);
}

#[test]
fn snapshots_and_epochs_track_mutations() {
    let mut engine = CartEngine::open(Arc::new(MemoryStore::new()));
    let handle = engine.handle();
    assert_eq!(handle.current().epoch, 0);

    engine.add_item(item("P1", None, 10.0), 1).unwrap();
    engine.add_item(item("P2", None, 5.0), 2).unwrap();
    let snap = handle.current();
    assert_eq!(snap.epoch, 2);
    assert_eq!(snap.total_items(), 3);
    assert_eq!(snap.subtotal(), 20.0);
    assert_eq!(*handle.subscribe_epoch().borrow(), 2);

    engine.clear().unwrap();
    let snap = handle.current();
    assert_eq!(snap.epoch, 3);
    assert!(snap.items.is_empty());
}

#[test]
fn non_positive_add_quantity_is_clamped_at_boundary() {
    let mut engine = CartEngine::open(Arc::new(MemoryStore::new()));
    engine.add_item(item("P1", None, 10.0), 0).unwrap();
    assert_eq!(engine.items()[0].quantity, 1);
}
