//! Zestraw public API façade (in-process).
//!
//! This crate defines the stable trait and error taxonomy frontends depend
//! on, plus the in-process `Storefront` implementation wiring the cart and
//! catalog engines to the remote backend. The remote side sits behind the
//! `RemoteBackend` seam so tests can swap in a mock.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use zestraw_cart::{CartEngine, CartHandle, CartSnapshot};
use zestraw_catalog::{FilterDebugInfo, FilterState, ListingPage};
use zestraw_core::{NewLineItem, Product, Supplier};
use zestraw_persist::Store;

pub use zestraw_client::{
    Order, OrderDraft, RegisterRequest, Session, ShippingAddress, UserProfile,
};

/// API errors suitable for transport to a frontend.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum StorefrontError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ZestrawResult<T> = Result<T, StorefrontError>;

/// Runtime configuration exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Stats {
    pub base_url: String,
    pub db_path: Option<String>,
    pub http_timeout_secs: u64,
    pub page_size: usize,
    pub metrics_addr: Option<String>,
}

/// The remote storefront service, seen from in-process code. One
/// implementation speaks HTTP; tests use `MockBackend`.
#[async_trait::async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn products(&self) -> anyhow::Result<Vec<Product>>;
    async fn product(&self, product_id: &str) -> anyhow::Result<Product>;
    async fn create_order(&self, token: &str, draft: &OrderDraft) -> anyhow::Result<Order>;
    async fn my_orders(&self, token: &str) -> anyhow::Result<Vec<Order>>;
    async fn login(&self, email: &str, password: &str) -> anyhow::Result<Session>;
    async fn register(&self, req: &RegisterRequest) -> anyhow::Result<Session>;
    async fn phone_auth(&self, phone: &str, code: Option<&str>) -> anyhow::Result<Session>;
}

/// HTTP-backed implementation delegating to `zestraw-client`.
pub struct HttpBackend;

impl HttpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RemoteBackend for HttpBackend {
    async fn products(&self) -> anyhow::Result<Vec<Product>> {
        zestraw_client::get_products().await
    }

    async fn product(&self, product_id: &str) -> anyhow::Result<Product> {
        zestraw_client::get_product(product_id).await
    }

    async fn create_order(&self, token: &str, draft: &OrderDraft) -> anyhow::Result<Order> {
        zestraw_client::create_order(token, draft).await
    }

    async fn my_orders(&self, token: &str) -> anyhow::Result<Vec<Order>> {
        zestraw_client::my_orders(token).await
    }

    async fn login(&self, email: &str, password: &str) -> anyhow::Result<Session> {
        zestraw_client::login(email, password).await
    }

    async fn register(&self, req: &RegisterRequest) -> anyhow::Result<Session> {
        zestraw_client::register(req).await
    }

    async fn phone_auth(&self, phone: &str, code: Option<&str>) -> anyhow::Result<Session> {
        zestraw_client::phone_auth(phone, code).await
    }
}

/// Declarative storefront surface.
#[async_trait::async_trait]
pub trait ZestrawApi: Send + Sync {
    async fn products(&self) -> ZestrawResult<Vec<Product>>;
    async fn product(&self, product_id: &str) -> ZestrawResult<Product>;

    /// Run the marketplace pipeline against the local supplier listing.
    fn suppliers(&self, filter: &FilterState) -> (ListingPage, FilterDebugInfo);
    fn location_facets(&self) -> Vec<String>;

    fn cart(&self) -> Arc<CartSnapshot>;
    fn add_to_cart(&self, item: NewLineItem, quantity: u32) -> ZestrawResult<Arc<CartSnapshot>>;
    fn remove_from_cart(&self, product_id: &str, variant: Option<&str>)
        -> ZestrawResult<Arc<CartSnapshot>>;
    fn update_cart_quantity(
        &self,
        product_id: &str,
        quantity: u32,
        variant: Option<&str>,
    ) -> ZestrawResult<Arc<CartSnapshot>>;
    fn clear_cart(&self) -> ZestrawResult<Arc<CartSnapshot>>;

    /// Submit the current cart as an order. The cart is cleared only after
    /// the backend confirms; any failure leaves it untouched.
    async fn checkout(
        &self,
        token: &str,
        address: ShippingAddress,
        payment_method: &str,
    ) -> ZestrawResult<Order>;

    async fn orders(&self, token: &str) -> ZestrawResult<Vec<Order>>;
    async fn login(&self, email: &str, password: &str) -> ZestrawResult<Session>;
    async fn register(&self, req: RegisterRequest) -> ZestrawResult<Session>;
    async fn phone_auth(&self, phone: &str, code: Option<&str>) -> ZestrawResult<Session>;

    fn stats(&self) -> Stats;
}

/// In-process implementation: cart engine + local supplier listing +
/// remote backend.
pub struct Storefront {
    cart: Mutex<CartEngine>,
    suppliers: Vec<Supplier>,
    backend: Arc<dyn RemoteBackend>,
}

impl Storefront {
    pub fn new(store: Arc<dyn Store>, backend: Arc<dyn RemoteBackend>) -> Self {
        Self::with_suppliers(store, backend, zestraw_core::builtin::suppliers())
    }

    pub fn with_suppliers(
        store: Arc<dyn Store>,
        backend: Arc<dyn RemoteBackend>,
        suppliers: Vec<Supplier>,
    ) -> Self {
        Self { cart: Mutex::new(CartEngine::open(store)), suppliers, backend }
    }

    /// Read-side cart handle for frontends that subscribe to changes.
    pub fn cart_handle(&self) -> CartHandle {
        self.cart.lock().unwrap().handle()
    }

    fn upstream(e: anyhow::Error) -> StorefrontError {
        StorefrontError::Upstream(e.to_string())
    }

    fn persist_lag(e: anyhow::Error) -> StorefrontError {
        StorefrontError::Internal(format!("cart storage lagging: {}", e))
    }
}

#[async_trait::async_trait]
impl ZestrawApi for Storefront {
    async fn products(&self) -> ZestrawResult<Vec<Product>> {
        let t0 = Instant::now();
        info!("api: products start");
        let out = self.backend.products().await.map_err(Self::upstream)?;
        info!(count = out.len(), took_ms = %t0.elapsed().as_millis(), "api: products ok");
        Ok(out)
    }

    async fn product(&self, product_id: &str) -> ZestrawResult<Product> {
        self.backend
            .product(product_id)
            .await
            .map_err(|e| StorefrontError::NotFound(format!("product {}: {}", product_id, e)))
    }

    fn suppliers(&self, filter: &FilterState) -> (ListingPage, FilterDebugInfo) {
        zestraw_catalog::query(&self.suppliers, filter)
    }

    fn location_facets(&self) -> Vec<String> {
        zestraw_catalog::location_facets(&self.suppliers)
    }

    fn cart(&self) -> Arc<CartSnapshot> {
        self.cart.lock().unwrap().snapshot()
    }

    fn add_to_cart(&self, item: NewLineItem, quantity: u32) -> ZestrawResult<Arc<CartSnapshot>> {
        let mut cart = self.cart.lock().unwrap();
        cart.add_item(item, quantity).map_err(Self::persist_lag)?;
        Ok(cart.snapshot())
    }

    fn remove_from_cart(
        &self,
        product_id: &str,
        variant: Option<&str>,
    ) -> ZestrawResult<Arc<CartSnapshot>> {
        let mut cart = self.cart.lock().unwrap();
        cart.remove_item(product_id, variant).map_err(Self::persist_lag)?;
        Ok(cart.snapshot())
    }

    fn update_cart_quantity(
        &self,
        product_id: &str,
        quantity: u32,
        variant: Option<&str>,
    ) -> ZestrawResult<Arc<CartSnapshot>> {
        let mut cart = self.cart.lock().unwrap();
        cart.update_quantity(product_id, quantity, variant).map_err(Self::persist_lag)?;
        Ok(cart.snapshot())
    }

    fn clear_cart(&self) -> ZestrawResult<Arc<CartSnapshot>> {
        let mut cart = self.cart.lock().unwrap();
        cart.clear().map_err(Self::persist_lag)?;
        Ok(cart.snapshot())
    }

    async fn checkout(
        &self,
        token: &str,
        address: ShippingAddress,
        payment_method: &str,
    ) -> ZestrawResult<Order> {
        let t0 = Instant::now();
        let (order_items, total_amount) = {
            let cart = self.cart.lock().unwrap();
            (cart.items().to_vec(), cart.subtotal())
        };
        if order_items.is_empty() {
            return Err(StorefrontError::Validation("cart is empty".into()));
        }
        info!(items = order_items.len(), "api: checkout start");
        let draft = OrderDraft {
            order_items,
            shipping_address: address,
            payment_method: payment_method.to_string(),
            total_amount,
        };
        let order = self.backend.create_order(token, &draft).await.map_err(Self::upstream)?;
        // Backend confirmed; the cart may now be emptied. A lagging store
        // is reported but does not undo the order.
        if let Err(e) = self.cart.lock().unwrap().clear() {
            warn!(error = %e, "api: cart cleared in memory, storage write failed");
        }
        info!(order_id = %order.id, took_ms = %t0.elapsed().as_millis(), "api: checkout ok");
        Ok(order)
    }

    async fn orders(&self, token: &str) -> ZestrawResult<Vec<Order>> {
        self.backend.my_orders(token).await.map_err(Self::upstream)
    }

    async fn login(&self, email: &str, password: &str) -> ZestrawResult<Session> {
        self.backend
            .login(email, password)
            .await
            .map_err(|e| StorefrontError::Unauthorized(e.to_string()))
    }

    async fn register(&self, req: RegisterRequest) -> ZestrawResult<Session> {
        self.backend.register(&req).await.map_err(Self::upstream)
    }

    async fn phone_auth(&self, phone: &str, code: Option<&str>) -> ZestrawResult<Session> {
        self.backend
            .phone_auth(phone, code)
            .await
            .map_err(|e| StorefrontError::Unauthorized(e.to_string()))
    }

    fn stats(&self) -> Stats {
        Stats {
            base_url: zestraw_client::base_url(),
            db_path: std::env::var("ZESTRAW_DB_PATH").ok(),
            http_timeout_secs: zestraw_client::http_timeout_secs(),
            page_size: zestraw_catalog::PAGE_SIZE,
            metrics_addr: std::env::var("ZESTRAW_METRICS_ADDR").ok(),
        }
    }
}

// ----------------- Mock backend -----------------

/// Configurable in-memory backend for tests.
pub struct MockBackend {
    pub products: Vec<Product>,
    pub fail_orders: bool,
    pub session: Option<Session>,
    pub orders_placed: Mutex<Vec<OrderDraft>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            products: zestraw_core::builtin::products(),
            fail_orders: false,
            session: None,
            orders_placed: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RemoteBackend for MockBackend {
    async fn products(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.products.clone())
    }

    async fn product(&self, product_id: &str) -> anyhow::Result<Product> {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such product"))
    }

    async fn create_order(&self, _token: &str, draft: &OrderDraft) -> anyhow::Result<Order> {
        if self.fail_orders {
            anyhow::bail!("payment declined");
        }
        self.orders_placed.lock().unwrap().push(draft.clone());
        Ok(Order {
            id: format!("ord-{}", self.orders_placed.lock().unwrap().len()),
            order_items: draft.order_items.clone(),
            shipping_address: draft.shipping_address.clone(),
            payment_method: draft.payment_method.clone(),
            total_amount: draft.total_amount,
            status: "Processing".to_string(),
            created_at: None,
        })
    }

    async fn my_orders(&self, _token: &str) -> anyhow::Result<Vec<Order>> {
        Ok(Vec::new())
    }

    async fn login(&self, _email: &str, _password: &str) -> anyhow::Result<Session> {
        self.session.clone().ok_or_else(|| anyhow::anyhow!("no session configured"))
    }

    async fn register(&self, _req: &RegisterRequest) -> anyhow::Result<Session> {
        self.session.clone().ok_or_else(|| anyhow::anyhow!("no session configured"))
    }

    async fn phone_auth(&self, _phone: &str, _code: Option<&str>) -> anyhow::Result<Session> {
        self.session.clone().ok_or_else(|| anyhow::anyhow!("no session configured"))
    }
}
