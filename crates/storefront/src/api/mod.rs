//! Remote store API client.
//!
//! # Architecture
//!
//! - The remote store is the source of truth - NO local persistence,
//!   direct API calls only
//! - [`RemoteStore`] is the seam the engine components depend on;
//!   [`HttpStoreClient`] implements it over `reqwest`
//! - Cart reads/writes are never cached - mutable state
//!
//! # Endpoints
//!
//! - `GET /shoppingCart/client/{clientId}` - canonical cart
//! - `POST /shoppingCart/client/{clientId}/items` - add line
//! - `PUT /shoppingCart/client/{clientId}/items/{itemId}` - set quantity
//! - `DELETE /shoppingCart/client/{clientId}/items/{itemId}` - remove line
//! - `DELETE /shoppingCart/client/{clientId}` - clear cart
//! - `POST /clients/{clientId}/validateCode` - promo code validation
//! - `POST /sales` - multipart order submission

mod http;
pub mod types;

pub use http::HttpStoreClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use petalpost_core::{CartItemId, ClientId, PromoCode};

/// Errors from the remote store transport layer.
///
/// `Timeout` and `NetworkUnavailable` are retryable; `ServerRejected`
/// means the store received the request and explicitly refused it.
/// None of these are fatal - callers keep their local state and the
/// user can retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The client-side timeout fired before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure; no response was received.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The store responded with `success: false`.
    #[error("store rejected the request: {0}")]
    ServerRejected(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON parsing failed.
    #[error("invalid response from store: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response reported success but is missing the expected payload.
    #[error("malformed response from store: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkUnavailable(err.to_string())
        }
    }
}

/// Async interface to the remote store.
///
/// Implemented over HTTP by [`HttpStoreClient`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the canonical cart for a client.
    async fn fetch_cart(&self, client: &ClientId) -> Result<RemoteCart, StoreError>;

    /// Add a line item; returns the updated canonical cart.
    async fn add_item(
        &self,
        client: &ClientId,
        request: AddItemRequest,
    ) -> Result<RemoteCart, StoreError>;

    /// Set the quantity of an existing line item.
    async fn update_item_quantity(
        &self,
        client: &ClientId,
        item: &CartItemId,
        quantity: u32,
    ) -> Result<(), StoreError>;

    /// Remove a line item.
    async fn remove_item(&self, client: &ClientId, item: &CartItemId) -> Result<(), StoreError>;

    /// Clear the client's cart.
    async fn clear_cart(&self, client: &ClientId) -> Result<(), StoreError>;

    /// Validate a promotional code.
    async fn validate_code(
        &self,
        client: &ClientId,
        code: &PromoCode,
    ) -> Result<DiscountData, StoreError>;

    /// Submit a completed order as a multipart request.
    async fn submit_sale(&self, request: SaleRequest) -> Result<SaleRecord, StoreError>;
}
