//! Zestraw cart: the client-side "what the user intends to buy" state.
//!
//! `Cart` is the pure collection (ordered, at most one row per
//! `(product_id, variant)` key). `CartEngine` wraps it as the single
//! writer: every mutation commits in memory, publishes an immutable
//! snapshot for readers, then writes through to the local store. A store
//! failure is reported to the caller but never rolls the memory back.

#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use zestraw_core::{CartLineItem, NewLineItem};
use zestraw_persist::{Store, CART_SLOT};

/// Ordered line-item collection. Insertion order is kept for display and
/// carries no other meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge rule: an existing row with the same key takes the incoming
    /// descriptor fields (metadata correction) and the summed quantity;
    /// otherwise the item is appended. Assumes `quantity >= 1`.
    pub fn add(&mut self, item: NewLineItem, quantity: u32) {
        let variant = item.variant.as_deref();
        if let Some(idx) = self
            .items
            .iter()
            .position(|i| i.matches(&item.product_id, variant))
        {
            let existing = &mut self.items[idx];
            let quantity = existing.quantity.saturating_add(quantity);
            existing.refresh(item);
            existing.quantity = quantity;
        } else {
            self.items.push(CartLineItem::new(item, quantity));
        }
    }

    /// No-op when no row matches the key.
    pub fn remove(&mut self, product_id: &str, variant: Option<&str>) {
        self.items.retain(|i| !i.matches(product_id, variant));
    }

    /// `quantity == 0` removes the row; a zero-quantity row never remains.
    /// No-op when no row matches the key.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32, variant: Option<&str>) {
        if quantity == 0 {
            self.remove(product_id, variant);
            return;
        }
        if let Some(i) = self.items.iter_mut().find(|i| i.matches(product_id, variant)) {
            i.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of quantities, recomputed on every access.
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of `unit_price * quantity`, recomputed on every access.
    pub fn subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.unit_price * f64::from(i.quantity))
            .sum()
    }
}

/// Immutable view published after every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub epoch: u64,
    pub items: Vec<CartLineItem>,
}

impl CartSnapshot {
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.unit_price * f64::from(i.quantity))
            .sum()
    }
}

/// Serialize a cart for storage.
pub fn save_items(items: &[CartLineItem]) -> Vec<u8> {
    serde_json::to_vec(items).unwrap_or_else(|_| b"[]".to_vec())
}

/// Deserialize a stored cart. Malformed content yields an empty cart,
/// never an error.
pub fn load_items(bytes: &[u8]) -> Vec<CartLineItem> {
    match serde_json::from_slice(bytes) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "stored cart unreadable; starting empty");
            Vec::new()
        }
    }
}

/// Handle for readers: lock-free snapshot access plus epoch notifications.
#[derive(Clone)]
pub struct CartHandle {
    snap: Arc<ArcSwap<CartSnapshot>>,
    epoch_rx: watch::Receiver<u64>,
}

impl CartHandle {
    pub fn current(&self) -> Arc<CartSnapshot> {
        self.snap.load_full()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch_rx.clone()
    }
}

/// Single-writer cart container with write-through persistence.
pub struct CartEngine {
    cart: Cart,
    epoch: u64,
    snap: Arc<ArcSwap<CartSnapshot>>,
    epoch_tx: watch::Sender<u64>,
    epoch_rx: watch::Receiver<u64>,
    store: Arc<dyn Store>,
}

impl CartEngine {
    /// Hydrate from the store. Missing, unreadable, or malformed content
    /// starts an empty cart; hydration never fails.
    pub fn open(store: Arc<dyn Store>) -> Self {
        let items = match store.load(CART_SLOT) {
            Ok(Some(bytes)) => load_items(&bytes),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "cart store unreadable; starting empty");
                Vec::new()
            }
        };
        debug!(items = items.len(), "cart hydrated");
        let cart = Cart::from_items(items);
        let snap = Arc::new(ArcSwap::from_pointee(CartSnapshot {
            epoch: 0,
            items: cart.items().to_vec(),
        }));
        let (epoch_tx, epoch_rx) = watch::channel(0u64);
        metrics::gauge!("cart_items", cart.total_items() as f64);
        Self { cart, epoch: 0, snap, epoch_tx, epoch_rx, store }
    }

    pub fn handle(&self) -> CartHandle {
        CartHandle { snap: Arc::clone(&self.snap), epoch_rx: self.epoch_rx.clone() }
    }

    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        self.snap.load_full()
    }

    /// Add `quantity` of an item; non-positive input is clamped to 1 here,
    /// at the call boundary, so the merge rule itself stays simple.
    pub fn add_item(&mut self, item: NewLineItem, quantity: u32) -> Result<()> {
        let quantity = quantity.max(1);
        self.cart.add(item, quantity);
        self.commit("add")
    }

    pub fn remove_item(&mut self, product_id: &str, variant: Option<&str>) -> Result<()> {
        self.cart.remove(product_id, variant);
        self.commit("remove")
    }

    pub fn update_quantity(
        &mut self,
        product_id: &str,
        quantity: u32,
        variant: Option<&str>,
    ) -> Result<()> {
        self.cart.set_quantity(product_id, quantity, variant);
        self.commit("update")
    }

    pub fn clear(&mut self) -> Result<()> {
        self.cart.clear();
        self.commit("clear")
    }

    pub fn total_items(&self) -> u64 {
        self.cart.total_items()
    }

    pub fn subtotal(&self) -> f64 {
        self.cart.subtotal()
    }

    pub fn items(&self) -> &[CartLineItem] {
        self.cart.items()
    }

    /// Publish the new snapshot, then write through. The memory commit is
    /// already done; a store error only tells the caller storage lags.
    fn commit(&mut self, op: &'static str) -> Result<()> {
        self.epoch = self.epoch.saturating_add(1);
        self.snap.store(Arc::new(CartSnapshot {
            epoch: self.epoch,
            items: self.cart.items().to_vec(),
        }));
        let _ = self.epoch_tx.send(self.epoch);
        metrics::counter!("cart_mutations_total", 1u64, "op" => op);
        metrics::gauge!("cart_items", self.cart.total_items() as f64);
        debug!(op, epoch = self.epoch, items = self.cart.len(), "cart committed");
        self.store.save(CART_SLOT, &save_items(self.cart.items()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zestraw_core::SustainabilityMetrics;

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
    fn add_merges_by_key_and_sums_quantity() {
        let mut cart = Cart::new();
        cart.add(item("P1", None, 24.0), 2);
        cart.add(item("P1", None, 24.0), 3);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn variants_occupy_distinct_rows() {
        let mut cart = Cart::new();
        cart.add(item("P1", Some("A"), 24.0), 1);
        cart.add(item("P1", Some("B"), 24.0), 1);
        cart.add(item("P1", None, 24.0), 1);
        assert_eq!(cart.len(), 3);
    }

    #[test]
    fn merge_refreshes_descriptor_fields() {
        let mut cart = Cart::new();
        cart.add(item("P1", None, 24.0), 1);
        let mut updated = item("P1", None, 19.5);
        updated.name = "Renamed Plate".to_string();
        updated.metrics = Some(SustainabilityMetrics {
            carbon_footprint: 0.4,
            plastic_use: 0.0,
            plastic_avoided: 1.2,
        });
        cart.add(updated, 1);
        let row = &cart.items()[0];
        assert_eq!(row.quantity, 2);
        assert_eq!(row.name, "Renamed Plate");
        assert_eq!(row.unit_price, 19.5);
        assert_eq!(row.metrics.plastic_avoided, 1.2);
    }

    #[test]
    fn set_quantity_zero_removes_row() {
        let mut cart = Cart::new();
        cart.add(item("P1", None, 24.0), 2);
        cart.set_quantity("P1", 0, None);
        assert!(cart.is_empty());
        // absent key: no-op
        cart.set_quantity("P1", 4, None);
        assert!(cart.is_empty());
    }

    #[test]
    fn derived_totals() {
        let mut cart = Cart::new();
        cart.add(item("P1", None, 10.0), 2);
        cart.add(item("P2", None, 5.0), 3);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.subtotal(), 35.0);
        cart.set_quantity("P2", 1, None);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.subtotal(), 25.0);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut cart = Cart::new();
        cart.add(item("P1", None, 10.0), 1);
        cart.remove("P1", None);
        let before = cart.clone();
        cart.remove("P1", None);
        assert_eq!(cart, before);
    }

    #[test]
    fn remove_matches_exact_variant_only() {
        let mut cart = Cart::new();
        cart.add(item("P1", Some("A"), 10.0), 1);
        cart.add(item("P1", None, 10.0), 1);
        cart.remove("P1", None);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].variant.as_deref(), Some("A"));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut cart = Cart::new();
        cart.add(item("P2", None, 1.0), 1);
        cart.add(item("P1", None, 1.0), 1);
        cart.add(item("P3", None, 1.0), 1);
        cart.add(item("P1", None, 1.0), 1);
        let ids: Vec<&str> = cart.items().iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, ["P2", "P1", "P3"]);
    }

    #[test]
    fn load_items_tolerates_garbage() {
        assert!(load_items(b"not json at all").is_empty());
        assert!(load_items(b"{\"wrong\":\"shape\"}").is_empty());
        assert!(load_items(b"[]").is_empty());
    }
}
