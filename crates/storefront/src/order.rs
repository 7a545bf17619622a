//! Terminal order submission.
//!
//! [`OrderSubmitter`] turns a completed order draft into one multipart
//! request, races it against a client-side timeout, and classifies the
//! outcome. Nothing here cancels the transport; a timeout only settles
//! the race on our side.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::instrument;

use petalpost_core::{Money, OrderId, PaymentType};

use crate::api::{RemoteStore, SaleRequest, StoreError};
use crate::cart::CartStore;
use crate::checkout::OrderDraft;
use crate::config::StorefrontConfig;
use crate::surfaces::{NoticeKind, NotificationSurface};

/// Errors from order submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The client-side timeout fired before any response arrived. The
    /// order may or may not have been created; the draft is preserved
    /// so the user can check and retry.
    #[error("order submission timed out")]
    Timeout,

    /// Transport-level failure, no response received. Retryable.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The store received the order and refused it; the reason is the
    /// store's own message.
    #[error("order rejected: {0}")]
    ServerRejected(String),

    /// The draft is missing shipping or payment data. The wizard gates
    /// commit on both, so reaching this means a caller bypassed it.
    #[error("order draft is incomplete")]
    IncompleteDraft,

    /// A response arrived but could not be used (parse failure, missing
    /// payload).
    #[error(transparent)]
    Remote(StoreError),
}

impl From<StoreError> for SubmitError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout => Self::Timeout,
            StoreError::NetworkUnavailable(reason) => Self::NetworkUnavailable(reason),
            StoreError::ServerRejected(reason) => Self::ServerRejected(reason),
            other => Self::Remote(other),
        }
    }
}

/// What the user gets back after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    /// Order ID assigned by the store.
    pub order_id: OrderId,
    /// Amount charged: `max(0, subtotal - discount)`.
    pub total: Money,
    /// How the order is paid.
    pub payment_type: PaymentType,
    /// Whether a promotional discount was applied.
    pub discount_applied: bool,
    /// The applied reduction, zero when none.
    pub discount_amount: Money,
}

/// Submits completed order drafts to the store.
///
/// Cheaply cloneable; holds shared handles only.
#[derive(Clone)]
pub struct OrderSubmitter {
    remote: Arc<dyn RemoteStore>,
    cart: CartStore,
    notify: Arc<dyn NotificationSurface>,
    submit_timeout: Duration,
}

impl OrderSubmitter {
    /// Create a new submitter bound to the cart it will consume.
    #[must_use]
    pub fn new(
        config: &StorefrontConfig,
        remote: Arc<dyn RemoteStore>,
        cart: CartStore,
        notify: Arc<dyn NotificationSurface>,
    ) -> Self {
        Self {
            remote,
            cart,
            notify,
            submit_timeout: config.submit_timeout,
        }
    }

    /// Submit the draft as a multipart sale request.
    ///
    /// The request races a client-side timeout; whichever settles first
    /// determines the outcome. On success the consumed cart is cleared
    /// (best-effort, a failed remote clear never rolls the order back).
    /// On any failure the draft is left untouched for retry.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Timeout`], [`SubmitError::NetworkUnavailable`]
    /// and [`SubmitError::ServerRejected`] per the classification
    /// above.
    #[instrument(skip(self, draft), fields(cart = %draft.cart_snapshot.cart_id))]
    pub async fn submit(&self, draft: &OrderDraft) -> Result<OrderReceipt, SubmitError> {
        let shipping = draft.shipping.as_ref().ok_or(SubmitError::IncompleteDraft)?;
        let payment = draft.payment.as_ref().ok_or(SubmitError::IncompleteDraft)?;

        let discount_amount = draft
            .discount
            .as_ref()
            .map_or(Money::ZERO, |discount| discount.amount);
        let total = draft.cart_snapshot.subtotal.saturating_sub(discount_amount);

        let request = SaleRequest {
            payment_type: payment.payment_type,
            delivery_address: shipping.delivery_address.clone(),
            receiver_name: shipping.receiver_name.clone(),
            receiver_phone: shipping.receiver_phone.clone(),
            delivery_point: shipping.delivery_point.clone(),
            delivery_date: shipping.delivery_date,
            shopping_cart_id: draft.cart_snapshot.cart_id.clone(),
            payment_proof: payment.proof.clone(),
        };

        let sale = match tokio::time::timeout(
            self.submit_timeout,
            self.remote.submit_sale(request),
        )
        .await
        {
            Err(_) => {
                tracing::warn!(timeout = ?self.submit_timeout, "order submission timed out");
                return Err(self.surface(SubmitError::Timeout));
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "order submission failed");
                return Err(self.surface(e.into()));
            }
            Ok(Ok(sale)) => sale,
        };

        tracing::info!(order = %sale.id, %total, "order placed");
        self.notify
            .notify("Your order has been placed!", NoticeKind::Success);

        // The cart is consumed by the order; the clear itself is
        // best-effort and logs its own failures.
        self.cart.clear().await;

        Ok(OrderReceipt {
            order_id: sale.id,
            total,
            payment_type: sale.payment_type,
            discount_applied: draft.discount.is_some(),
            discount_amount,
        })
    }

    fn surface(&self, error: SubmitError) -> SubmitError {
        let message = match &error {
            SubmitError::Timeout => "The order is taking too long, please try again".to_string(),
            SubmitError::NetworkUnavailable(_) => {
                "No connection, check your network and retry".to_string()
            }
            SubmitError::ServerRejected(reason) => reason.clone(),
            other => format!("Could not place the order: {other}"),
        };
        self.notify.notify(&message, NoticeKind::Error);
        error
    }
}
