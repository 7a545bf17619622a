//! HTTP implementation of [`RemoteStore`] over `reqwest`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use petalpost_core::{CartItemId, ClientId, PromoCode};

use crate::config::StorefrontConfig;
use crate::surfaces::SessionProvider;

use super::types::{
    Ack, AddItemRequest, CartResponse, DiscountData, RemoteCart, SaleRecord, SaleRequest,
    SaleResponse, UpdateQuantityRequest, ValidateCodeRequest, ValidateCodeResponse,
};
use super::{RemoteStore, StoreError};

/// HTTP client for the remote store API.
///
/// Bearer credentials come from the injected [`SessionProvider`] at
/// request time, so a sign-in/sign-out mid-session is picked up
/// automatically.
#[derive(Clone)]
pub struct HttpStoreClient {
    client: reqwest::Client,
    base: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpStoreClient {
    /// Create a new remote store client.
    #[must_use]
    pub fn new(config: &StorefrontConfig, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: config.api_base_url.as_str().trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Build a request with the session's bearer credential attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{path}", self.base);
        let builder = self.client.request(method, url);
        match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and parse the JSON envelope.
    ///
    /// Reads the body as text first so parse failures can be logged with
    /// an excerpt of what the store actually sent.
    async fn send<R: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<R, StoreError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound("HTTP 404 from store".to_string()));
        }

        let body = response.text().await?;

        match serde_json::from_str::<R>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => {
                tracing::error!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "store returned non-success status without a JSON envelope"
                );
                Err(StoreError::ServerRejected(format!(
                    "HTTP {status}: {}",
                    body.chars().take(200).collect::<String>()
                )))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse store response"
                );
                Err(StoreError::Parse(e))
            }
        }
    }

    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<R, StoreError> {
        self.send(self.request(method, path).json(body)).await
    }

    /// Check a bare acknowledgement envelope.
    fn check_ack(ack: Ack) -> Result<(), StoreError> {
        if ack.success {
            Ok(())
        } else {
            Err(rejection(ack.message))
        }
    }
}

/// Map a failed envelope to `ServerRejected` with the store's reason.
fn rejection(message: Option<String>) -> StoreError {
    StoreError::ServerRejected(message.unwrap_or_else(|| "request rejected".to_string()))
}

#[async_trait]
impl RemoteStore for HttpStoreClient {
    #[instrument(skip(self), fields(client = %client))]
    async fn fetch_cart(&self, client: &ClientId) -> Result<RemoteCart, StoreError> {
        let path = format!("shoppingCart/client/{client}");
        let response: CartResponse = self.send(self.request(Method::GET, &path)).await?;
        if !response.success {
            return Err(rejection(response.message));
        }
        response
            .data
            .ok_or_else(|| StoreError::Malformed("cart response without data".to_string()))
    }

    #[instrument(skip(self, request), fields(client = %client, product = %request.product_ref))]
    async fn add_item(
        &self,
        client: &ClientId,
        request: AddItemRequest,
    ) -> Result<RemoteCart, StoreError> {
        let path = format!("shoppingCart/client/{client}/items");
        let response: CartResponse = self.send_json(Method::POST, &path, &request).await?;
        if !response.success {
            return Err(rejection(response.message));
        }
        response
            .data
            .ok_or_else(|| StoreError::Malformed("add response without cart".to_string()))
    }

    #[instrument(skip(self), fields(client = %client, item = %item, quantity))]
    async fn update_item_quantity(
        &self,
        client: &ClientId,
        item: &CartItemId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        let path = format!("shoppingCart/client/{client}/items/{item}");
        let ack: Ack = self
            .send_json(Method::PUT, &path, &UpdateQuantityRequest { quantity })
            .await?;
        Self::check_ack(ack)
    }

    #[instrument(skip(self), fields(client = %client, item = %item))]
    async fn remove_item(&self, client: &ClientId, item: &CartItemId) -> Result<(), StoreError> {
        let path = format!("shoppingCart/client/{client}/items/{item}");
        let ack: Ack = self.send(self.request(Method::DELETE, &path)).await?;
        Self::check_ack(ack)
    }

    #[instrument(skip(self), fields(client = %client))]
    async fn clear_cart(&self, client: &ClientId) -> Result<(), StoreError> {
        let path = format!("shoppingCart/client/{client}");
        let ack: Ack = self.send(self.request(Method::DELETE, &path)).await?;
        Self::check_ack(ack)
    }

    #[instrument(skip(self), fields(client = %client))]
    async fn validate_code(
        &self,
        client: &ClientId,
        code: &PromoCode,
    ) -> Result<DiscountData, StoreError> {
        let path = format!("clients/{client}/validateCode");
        let body = ValidateCodeRequest {
            code: code.as_str().to_string(),
        };
        let response: ValidateCodeResponse = self.send_json(Method::POST, &path, &body).await?;
        if !response.success {
            return Err(rejection(response.message));
        }
        response
            .discount_data
            .ok_or_else(|| StoreError::Malformed("validation response without discountData".to_string()))
    }

    #[instrument(skip(self, request), fields(cart = %request.shopping_cart_id))]
    async fn submit_sale(&self, request: SaleRequest) -> Result<SaleRecord, StoreError> {
        let mut form = Form::new()
            .text("paymentType", request.payment_type.to_string())
            .text("deliveryAddress", request.delivery_address)
            .text("receiverName", request.receiver_name)
            .text("receiverPhone", request.receiver_phone)
            .text("deliveryPoint", request.delivery_point)
            .text(
                "deliveryDate",
                request.delivery_date.format("%Y-%m-%d").to_string(),
            )
            .text("ShoppingCartId", request.shopping_cart_id.into_inner());

        if let Some(proof) = request.payment_proof {
            let part = Part::bytes(proof.bytes)
                .file_name(proof.file_name)
                .mime_str(&proof.mime_type)?;
            form = form.part("paymentProofImage", part);
        }

        let response: SaleResponse = self
            .send(self.request(Method::POST, "sales").multipart(form))
            .await?;
        if !response.success {
            return Err(rejection(response.message));
        }
        response
            .data
            .map(|data| data.sale)
            .ok_or_else(|| StoreError::Malformed("sale response without data".to_string()))
    }
}
