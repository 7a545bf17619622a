//! Promotional discount validation and lifetime management.
//!
//! [`DiscountEngine`] is the single point of truth for whether a
//! discount is currently applied and for how much. The amount is
//! computed once, at validation time, against the subtotal current at
//! that moment - it is deliberately NOT recomputed when the cart
//! changes afterward (lock-in pricing). A discount cannot outlive the
//! cart that earned it: when the cart empties, the engine clears it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use thiserror::Error;

use petalpost_core::{Money, PromoCode};

use crate::api::{RemoteStore, StoreError};
use crate::cart::CartStore;
use crate::surfaces::SessionProvider;

/// A validated, applied discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    /// The validated code.
    pub code: PromoCode,
    /// Display name of the promotion.
    pub display_name: String,
    /// Discount percentage (e.g., `10` for 10%).
    pub percentage: Decimal,
    /// Monetary reduction, rounded once at application time.
    pub amount: Money,
}

/// Errors from discount validation.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// No signed-in session.
    #[error("no active session")]
    NotSignedIn,

    /// Another validation is still in flight; validations are serialized.
    #[error("a code is already being validated")]
    ValidationInProgress,

    /// The store refused the code; the message is user-facing.
    #[error("{0}")]
    Rejected(String),

    /// Transport-level failure; any previously applied discount is kept.
    #[error(transparent)]
    Remote(StoreError),
}

impl DiscountError {
    /// User-facing reason string for the notification surface.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotSignedIn => "Sign in to use a promotional code".to_string(),
            Self::ValidationInProgress => "Hold on, still checking your code".to_string(),
            Self::Rejected(reason) => reason.clone(),
            Self::Remote(_) => "Could not validate the code right now, try again".to_string(),
        }
    }
}

#[derive(Default)]
struct DiscountState {
    current: Option<Discount>,
    validating: bool,
}

struct DiscountEngineInner {
    remote: Arc<dyn RemoteStore>,
    session: Arc<dyn SessionProvider>,
    cart: CartStore,
    state: Mutex<DiscountState>,
}

impl DiscountEngineInner {
    fn lock_state(&self) -> MutexGuard<'_, DiscountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the discount if the cart that earned it has emptied.
    fn reconcile_with_cart(&self) {
        if self.cart.item_count() == 0 {
            let mut state = self.lock_state();
            if state.current.take().is_some() {
                tracing::debug!("cart emptied, discount invalidated");
            }
        }
    }
}

/// Resets the `validating` flag on every exit path.
struct ValidatingGuard {
    inner: Arc<DiscountEngineInner>,
}

impl Drop for ValidatingGuard {
    fn drop(&mut self) {
        self.inner.lock_state().validating = false;
    }
}

/// Owns the applied [`Discount`], if any.
///
/// Cheaply cloneable; all clones share the same state.
#[derive(Clone)]
pub struct DiscountEngine {
    inner: Arc<DiscountEngineInner>,
}

impl DiscountEngine {
    /// Create a new discount engine bound to a cart.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        session: Arc<dyn SessionProvider>,
        cart: CartStore,
    ) -> Self {
        Self {
            inner: Arc::new(DiscountEngineInner {
                remote,
                session,
                cart,
                state: Mutex::new(DiscountState::default()),
            }),
        }
    }

    /// Validate a promotional code against the store and apply it.
    ///
    /// One validation at a time: a second call while one is outstanding
    /// gets `ValidationInProgress` without reaching the transport. The
    /// amount is `round2(subtotal * pct / 100)` against the subtotal at
    /// this moment. A success supersedes any previously applied
    /// discount; a failure leaves it untouched.
    ///
    /// # Errors
    ///
    /// `Rejected` with the store's reason for refused codes; `Remote`
    /// for transport failures.
    pub async fn validate(&self, code: PromoCode) -> Result<Discount, DiscountError> {
        let client = self
            .inner
            .session
            .current_client_id()
            .ok_or(DiscountError::NotSignedIn)?;

        {
            let mut state = self.inner.lock_state();
            if state.validating {
                return Err(DiscountError::ValidationInProgress);
            }
            state.validating = true;
        }
        let _guard = ValidatingGuard {
            inner: Arc::clone(&self.inner),
        };

        match self.inner.remote.validate_code(&client, &code).await {
            Ok(data) => {
                let percentage = data
                    .percentage()
                    .map_err(|e| DiscountError::Rejected(format!("Invalid discount data: {e}")))?;
                let subtotal = self.inner.cart.subtotal();
                let discount = Discount {
                    code: PromoCode::new(data.code),
                    display_name: data.name,
                    percentage,
                    amount: subtotal.percentage(percentage),
                };
                tracing::debug!(
                    code = %discount.code,
                    amount = %discount.amount,
                    "discount applied"
                );
                self.inner.lock_state().current = Some(discount.clone());
                Ok(discount)
            }
            Err(StoreError::ServerRejected(reason)) => Err(DiscountError::Rejected(reason)),
            Err(e) => Err(DiscountError::Remote(e)),
        }
    }

    /// Explicitly remove the applied discount.
    pub fn remove(&self) {
        self.inner.lock_state().current = None;
    }

    /// The currently applied discount, if any.
    ///
    /// Reads reconcile against the cart first, so a discount is never
    /// observed outliving an emptied cart.
    #[must_use]
    pub fn current(&self) -> Option<Discount> {
        self.inner.reconcile_with_cart();
        self.inner.lock_state().current.clone()
    }

    /// Applied discount amount, zero when none.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.inner.reconcile_with_cart();
        self.inner
            .lock_state()
            .current
            .as_ref()
            .map_or(Money::ZERO, |discount| discount.amount)
    }

    /// Order total: `max(0, subtotal - amount)` against the live cart.
    #[must_use]
    pub fn total(&self) -> Money {
        self.inner.cart.subtotal().saturating_sub(self.amount())
    }

    /// Eagerly reconcile the discount with the cart after a mutation
    /// completed.
    ///
    /// Every read already reconciles lazily; this hook exists so the
    /// owning screen can invalidate (and re-render) right away instead
    /// of on the next read.
    pub fn on_cart_changed(&self) {
        self.inner.reconcile_with_cart();
    }
}
