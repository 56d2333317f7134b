//! Zestraw client: HTTP wrappers for the remote catalog/order/auth service.
//!
//! This is the network boundary: every endpoint returns a `{success, data,
//! error}` envelope, and product rows are normalized into the canonical
//! shape right here so the engines never see raw backend JSON.

#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use zestraw_core::{normalize_product, CartLineItem, Product};

const DEFAULT_BASE_URL: &str = "http://localhost:4000/api/v1";

pub fn base_url() -> String {
    std::env::var("ZESTRAW_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

pub fn http_timeout_secs() -> u64 {
    std::env::var("ZESTRAW_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20)
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(http_timeout_secs()))
        .build()
        .context("building http client")
}

/// Backend response envelope. `success = false` carries the error text.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

fn unwrap_envelope<T>(env: ApiEnvelope<T>, what: &str) -> Result<T> {
    if !env.success {
        return Err(anyhow!(
            env.error.unwrap_or_else(|| format!("{} failed", what))
        ));
    }
    env.data.ok_or_else(|| anyhow!("{}: empty response body", what))
}

async fn get_json<T: serde::de::DeserializeOwned>(
    path: &str,
    token: Option<&str>,
    what: &str,
) -> Result<T> {
    let url = format!("{}{}", base_url(), path);
    let mut req = http_client()?.get(&url);
    if let Some(t) = token {
        req = req.bearer_auth(t);
    }
    let env: ApiEnvelope<T> = req
        .send()
        .await
        .with_context(|| format!("{}: request to {}", what, url))?
        .json()
        .await
        .with_context(|| format!("{}: decoding response", what))?;
    unwrap_envelope(env, what)
}

async fn send_json<B: Serialize, T: serde::de::DeserializeOwned>(
    method: reqwest::Method,
    path: &str,
    body: &B,
    token: Option<&str>,
    what: &str,
) -> Result<T> {
    let url = format!("{}{}", base_url(), path);
    let mut req = http_client()?.request(method, &url).json(body);
    if let Some(t) = token {
        req = req.bearer_auth(t);
    }
    let env: ApiEnvelope<T> = req
        .send()
        .await
        .with_context(|| format!("{}: request to {}", what, url))?
        .json()
        .await
        .with_context(|| format!("{}: decoding response", what))?;
    unwrap_envelope(env, what)
}

// ---- Products ----

/// Fetch and normalize the product listing. Rows the normalizer rejects
/// are dropped, not fatal.
pub async fn get_products() -> Result<Vec<Product>> {
    let t0 = std::time::Instant::now();
    info!("client: products fetch start");
    let rows: Vec<serde_json::Value> = get_json("/products", None, "products").await?;
    let products = zestraw_core::normalize_products(&rows);
    if products.len() < rows.len() {
        warn!(dropped = rows.len() - products.len(), "client: unparseable product rows dropped");
    }
    info!(count = products.len(), took_ms = %t0.elapsed().as_millis(), "client: products ok");
    Ok(products)
}

pub async fn get_product(product_id: &str) -> Result<Product> {
    let t0 = std::time::Instant::now();
    info!(product_id, "client: product fetch start");
    let raw: serde_json::Value =
        get_json(&format!("/products/{}", product_id), None, "product").await?;
    let p = normalize_product(&raw)
        .ok_or_else(|| anyhow!("product {}: unrecognized shape", product_id))?;
    info!(took_ms = %t0.elapsed().as_millis(), "client: product ok");
    Ok(p)
}

// ---- Orders ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Order submission payload: a snapshot of the cart plus shipping and a
/// payment-method tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub order_items: Vec<CartLineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub order_items: Vec<CartLineItem>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Order {
    /// Parsed placement time, when the backend sent one.
    pub fn placed_at(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        self.created_at
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
    }
}

pub async fn create_order(token: &str, draft: &OrderDraft) -> Result<Order> {
    let t0 = std::time::Instant::now();
    info!(items = draft.order_items.len(), "client: order create start");
    let order: Order =
        send_json(reqwest::Method::POST, "/orders", draft, Some(token), "order create").await?;
    info!(order_id = %order.id, took_ms = %t0.elapsed().as_millis(), "client: order create ok");
    Ok(order)
}

pub async fn my_orders(token: &str) -> Result<Vec<Order>> {
    let t0 = std::time::Instant::now();
    let orders: Vec<Order> = get_json("/orders/myorders", Some(token), "orders").await?;
    info!(count = orders.len(), took_ms = %t0.elapsed().as_millis(), "client: orders ok");
    Ok(orders)
}

// ---- Auth ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

/// Bearer token plus the profile it belongs to. Both fields are defaulted
/// so partial auth responses (e.g. "code sent") still decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

pub async fn register(req: &RegisterRequest) -> Result<Session> {
    info!(email = %req.email, "client: register start");
    send_json(reqwest::Method::POST, "/auth/register", req, None, "register").await
}

pub async fn login(email: &str, password: &str) -> Result<Session> {
    info!(email, "client: login start");
    let body = serde_json::json!({ "email": email, "password": password });
    send_json(reqwest::Method::POST, "/auth/login", &body, None, "login").await
}

pub async fn forgot_password(email: &str) -> Result<()> {
    let body = serde_json::json!({ "email": email });
    let _: serde_json::Value =
        send_json(reqwest::Method::POST, "/auth/forgot-password", &body, None, "forgot password")
            .await?;
    Ok(())
}

pub async fn reset_password(reset_token: &str, password: &str) -> Result<()> {
    let body = serde_json::json!({ "token": reset_token, "password": password });
    let _: serde_json::Value =
        send_json(reqwest::Method::POST, "/auth/reset-password", &body, None, "reset password")
            .await?;
    Ok(())
}

pub async fn me(token: &str) -> Result<UserProfile> {
    get_json("/auth/me", Some(token), "user details").await
}

pub async fn update_address(token: &str, address: &ShippingAddress) -> Result<UserProfile> {
    let body = serde_json::json!({ "shippingAddress": address });
    send_json(reqwest::Method::PUT, "/auth/update-address", &body, Some(token), "address update")
        .await
}

pub async fn update_profile(token: &str, profile: &UserProfile) -> Result<UserProfile> {
    send_json(reqwest::Method::PUT, "/auth/update-profile", profile, Some(token), "profile update")
        .await
}

pub async fn update_password(token: &str, current: &str, new_password: &str) -> Result<()> {
    let body = serde_json::json!({ "currentPassword": current, "newPassword": new_password });
    let _: serde_json::Value = send_json(
        reqwest::Method::PUT,
        "/auth/update-password",
        &body,
        Some(token),
        "password update",
    )
    .await?;
    Ok(())
}

/// Phone OTP pass-through. The provider behind this endpoint is external;
/// with no code this requests one, with a code it verifies.
pub async fn phone_auth(phone: &str, code: Option<&str>) -> Result<Session> {
    debug!(phone, verifying = code.is_some(), "client: phone auth");
    let body = match code {
        Some(c) => serde_json::json!({ "phone": phone, "code": c }),
        None => serde_json::json!({ "phone": phone }),
    };
    send_json(reqwest::Method::POST, "/auth/phone", &body, None, "phone auth").await
}
