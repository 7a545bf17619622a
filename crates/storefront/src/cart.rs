//! Local cart mirror with serialized per-item mutations.
//!
//! [`CartStore`] holds the authoritative local view of the cart and
//! pushes every mutation to the remote store. The consistency rules:
//!
//! - at most one in-flight remote mutation per line item, enforced by
//!   the mutation-lock set (a second call on a locked item is rejected
//!   synchronously, before any transport work)
//! - full-cart refreshes are tagged with a monotonically increasing
//!   generation; a response from a superseded generation is discarded
//!   so an old refresh can never clobber a newer mutation's effect
//! - after a successful mutation a deferred full refresh reconciles
//!   server-side side effects (price changes); the task handle is
//!   aborted when replaced or when the store is dropped
//!
//! The subtotal is always derived from the line items, never cached.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::task::AbortHandle;

use petalpost_core::{CartId, CartItemId, ClientId, ItemType, Money, ProductId};

use crate::api::{AddItemRequest, RemoteCart, RemoteCartItem, RemoteStore, StoreError};
use crate::config::StorefrontConfig;
use crate::surfaces::{ConfirmationSurface, NotificationSurface, NoticeKind, SessionProvider};

/// Minimum quantity for a cart line.
pub const MIN_QUANTITY: u32 = 1;
/// Maximum quantity for a cart line.
pub const MAX_QUANTITY: u32 = 99;

/// A line item in the local cart mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    /// Line item ID issued by the store.
    pub id: CartItemId,
    /// Product reference.
    pub product_ref: ProductId,
    /// Display name.
    pub name: String,
    /// Quantity, always within `[1, 99]`.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
    /// Catalog product or customized arrangement.
    pub item_type: ItemType,
    /// Customization note for `custom` items.
    pub customization: Option<String>,
}

impl CartItem {
    /// Line total: `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

impl From<RemoteCartItem> for CartItem {
    fn from(item: RemoteCartItem) -> Self {
        Self {
            id: item.id,
            product_ref: item.product_ref,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            item_type: item.item_type,
            customization: item.customization,
        }
    }
}

/// Immutable view of the cart at a point in time.
///
/// Checkout captures one of these when the wizard starts; the draft is
/// built against the snapshot, not the live store.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    /// Cart ID at the remote store.
    pub cart_id: CartId,
    /// Line items.
    pub items: Vec<CartItem>,
    /// Derived subtotal at snapshot time.
    pub subtotal: Money,
}

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No signed-in session; cart operations need a client id.
    #[error("no active session")]
    NotSignedIn,

    /// The item already has an outstanding remote mutation.
    ///
    /// Silent no-op by policy: the UI ignores it rather than surfacing
    /// a failure.
    #[error("item already has a mutation in flight")]
    ConcurrencyRejected,

    /// The resulting quantity would leave `[1, 99]`, or the clamped
    /// delta is zero. Silent no-op; no remote call is made.
    #[error("quantity must stay between {MIN_QUANTITY} and {MAX_QUANTITY}")]
    QuantityOutOfRange,

    /// The item is not in the local cart mirror.
    #[error("item not found in cart: {0}")]
    UnknownItem(CartItemId),

    /// Remote store failure; local state was left untouched.
    #[error(transparent)]
    Remote(#[from] StoreError),
}

#[derive(Default)]
struct CartState {
    cart_id: Option<CartId>,
    items: Vec<CartItem>,
    /// Ids of items with an outstanding remote mutation.
    locked: HashSet<CartItemId>,
    /// Latest issued refresh generation; stale responses are discarded.
    refresh_gen: u64,
}

struct CartStoreInner {
    remote: Arc<dyn RemoteStore>,
    session: Arc<dyn SessionProvider>,
    confirm: Arc<dyn ConfirmationSurface>,
    notify: Arc<dyn NotificationSurface>,
    reconcile_delay: Duration,
    state: Mutex<CartState>,
    reconcile_task: Mutex<Option<AbortHandle>>,
}

impl CartStoreInner {
    /// Lock the cart state. Poisoning is not fatal here: state is a
    /// plain mirror and every invariant is re-established on the next
    /// refresh.
    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_reconcile(&self) {
        if let Some(handle) = self
            .reconcile_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for CartStoreInner {
    fn drop(&mut self) {
        self.cancel_reconcile();
    }
}

/// Unlocks a cart item when dropped, so the mutation lock is released
/// on every exit path, including cancellation.
struct MutationGuard {
    inner: Arc<CartStoreInner>,
    item_id: CartItemId,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        self.inner.lock_state().locked.remove(&self.item_id);
    }
}

/// The authoritative local view of the shopping cart.
///
/// Cheaply cloneable; all clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

impl CartStore {
    /// Create a new cart store.
    #[must_use]
    pub fn new(
        config: &StorefrontConfig,
        remote: Arc<dyn RemoteStore>,
        session: Arc<dyn SessionProvider>,
        confirm: Arc<dyn ConfirmationSurface>,
        notify: Arc<dyn NotificationSurface>,
    ) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                remote,
                session,
                confirm,
                notify,
                reconcile_delay: config.reconcile_delay,
                state: Mutex::new(CartState::default()),
                reconcile_task: Mutex::new(None),
            }),
        }
    }

    // =========================================================================
    // Read API
    // =========================================================================

    /// Current line items (cloned out of the mirror).
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.lock_state().items.clone()
    }

    /// Number of line items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.inner.lock_state().items.len()
    }

    /// Derived subtotal: sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.inner
            .lock_state()
            .items
            .iter()
            .fold(Money::ZERO, |acc, item| acc + item.line_total())
    }

    /// Remote cart id, if a cart has been fetched or created.
    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        self.inner.lock_state().cart_id.clone()
    }

    /// Whether an item currently has a mutation in flight.
    #[must_use]
    pub fn is_item_locked(&self, item_id: &CartItemId) -> bool {
        self.inner.lock_state().locked.contains(item_id)
    }

    /// Capture a snapshot for checkout. `None` if the cart is empty or
    /// has never been fetched.
    #[must_use]
    pub fn snapshot(&self) -> Option<CartSnapshot> {
        let state = self.inner.lock_state();
        let cart_id = state.cart_id.clone()?;
        if state.items.is_empty() {
            return None;
        }
        let subtotal = state
            .items
            .iter()
            .fold(Money::ZERO, |acc, item| acc + item.line_total());
        Some(CartSnapshot {
            cart_id,
            items: state.items.clone(),
            subtotal,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a product to the cart (or merge into an existing line; the
    /// store owns the merge rule and returns the canonical cart).
    ///
    /// # Errors
    ///
    /// `Remote(ServerRejected)` if stock is insufficient; transport
    /// errors otherwise. Local state is untouched on failure.
    pub async fn add_item(
        &self,
        product_ref: ProductId,
        quantity: u32,
        item_type: ItemType,
        customization: Option<String>,
    ) -> Result<(), CartError> {
        let client = self.client_id()?;
        let request = AddItemRequest {
            product_ref,
            quantity: quantity.clamp(MIN_QUANTITY, MAX_QUANTITY),
            item_type,
            customization,
        };

        match self.inner.remote.add_item(&client, request).await {
            Ok(cart) => {
                self.apply_remote_cart(cart);
                Ok(())
            }
            Err(e) => {
                self.report_failure("Could not add the item to your cart", &e);
                Err(e.into())
            }
        }
    }

    /// Change a line item's quantity by `delta`.
    ///
    /// Rejected synchronously (no remote call) when the item is locked,
    /// when the resulting quantity would leave `[1, 99]`, or when the
    /// clamped delta is zero. On success the local quantity is updated
    /// and a deferred full refresh is scheduled to reconcile any
    /// server-side side effects.
    ///
    /// # Errors
    ///
    /// `ConcurrencyRejected` / `QuantityOutOfRange` for the synchronous
    /// no-ops; `Remote` when the store refuses the mutation (the
    /// pre-mutation quantity is kept).
    pub async fn update_quantity(
        &self,
        item_id: &CartItemId,
        delta: i32,
    ) -> Result<(), CartError> {
        let client = self.client_id()?;

        // Synchronous checks and lock acquisition happen under a single
        // state lock so two interleaved calls cannot both pass.
        let (target, _guard) = {
            let mut state = self.inner.lock_state();
            if state.locked.contains(item_id) {
                return Err(CartError::ConcurrencyRejected);
            }
            let item = state
                .items
                .iter()
                .find(|item| &item.id == item_id)
                .ok_or_else(|| CartError::UnknownItem(item_id.clone()))?;
            let current = i64::from(item.quantity);
            let target = (current + i64::from(delta))
                .clamp(i64::from(MIN_QUANTITY), i64::from(MAX_QUANTITY));
            if target == current {
                return Err(CartError::QuantityOutOfRange);
            }
            state.locked.insert(item_id.clone());
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let target = target as u32;
            (
                target,
                MutationGuard {
                    inner: Arc::clone(&self.inner),
                    item_id: item_id.clone(),
                },
            )
        };

        let result = self
            .inner
            .remote
            .update_item_quantity(&client, item_id, target)
            .await;

        match result {
            Ok(()) => {
                {
                    let mut state = self.inner.lock_state();
                    if let Some(item) = state.items.iter_mut().find(|item| &item.id == item_id) {
                        item.quantity = target;
                    }
                    // Older in-flight refreshes must not clobber this.
                    state.refresh_gen += 1;
                }
                self.schedule_reconcile();
                Ok(())
            }
            Err(e) => {
                self.report_failure("Could not update the quantity", &e);
                Err(e.into())
            }
        }
    }

    /// Remove a line item after the user confirms.
    ///
    /// Returns `Ok(false)` if the user declined (nothing was sent).
    ///
    /// # Errors
    ///
    /// Same locking discipline and failure semantics as
    /// [`Self::update_quantity`].
    pub async fn remove_item(&self, item_id: &CartItemId) -> Result<bool, CartError> {
        let client = self.client_id()?;

        let item_name = {
            let state = self.inner.lock_state();
            state
                .items
                .iter()
                .find(|item| &item.id == item_id)
                .map(|item| item.name.clone())
                .ok_or_else(|| CartError::UnknownItem(item_id.clone()))?
        };

        let confirmed = self
            .inner
            .confirm
            .confirm(&format!("Remove \"{item_name}\" from your cart?"))
            .await;
        if !confirmed {
            return Ok(false);
        }

        let _guard = {
            let mut state = self.inner.lock_state();
            if state.locked.contains(item_id) {
                return Err(CartError::ConcurrencyRejected);
            }
            if !state.items.iter().any(|item| &item.id == item_id) {
                // Removed by a concurrent mutation while the dialog was open.
                return Err(CartError::UnknownItem(item_id.clone()));
            }
            state.locked.insert(item_id.clone());
            MutationGuard {
                inner: Arc::clone(&self.inner),
                item_id: item_id.clone(),
            }
        };

        match self.inner.remote.remove_item(&client, item_id).await {
            Ok(()) => {
                {
                    let mut state = self.inner.lock_state();
                    state.items.retain(|item| &item.id != item_id);
                    // Older in-flight refreshes must not clobber this.
                    state.refresh_gen += 1;
                }
                self.schedule_reconcile();
                Ok(true)
            }
            Err(e) => {
                self.report_failure("Could not remove the item", &e);
                Err(e.into())
            }
        }
    }

    /// Fetch the canonical cart state from the store.
    ///
    /// With `force = false` this is a no-op once a cart has been
    /// mirrored. Safe to interleave with in-flight per-item mutations:
    /// the mutation-lock set is never touched, and a response from a
    /// superseded generation is discarded on arrival.
    ///
    /// # Errors
    ///
    /// `Remote` on transport or store failure; the mirror keeps its
    /// previous contents.
    pub async fn refresh(&self, force: bool) -> Result<(), CartError> {
        let client = self.client_id()?;

        let my_gen = {
            let mut state = self.inner.lock_state();
            if !force && state.cart_id.is_some() {
                return Ok(());
            }
            state.refresh_gen += 1;
            state.refresh_gen
        };

        let cart = self.inner.remote.fetch_cart(&client).await?;

        let mut state = self.inner.lock_state();
        if state.refresh_gen != my_gen {
            tracing::debug!(
                generation = my_gen,
                latest = state.refresh_gen,
                "discarding stale refresh response"
            );
            return Ok(());
        }
        state.cart_id = Some(cart.id);
        state.items = cart.items.into_iter().map(CartItem::from).collect();
        Ok(())
    }

    /// Clear the cart after an order consumed it.
    ///
    /// The remote clear is best-effort: a failure is logged and the
    /// local mirror is emptied regardless, because the order that
    /// consumed the cart already succeeded.
    pub async fn clear(&self) {
        if let Ok(client) = self.client_id() {
            if let Err(e) = self.inner.remote.clear_cart(&client).await {
                tracing::warn!(error = %e, "best-effort remote cart clear failed");
            }
        }

        self.inner.cancel_reconcile();
        let mut state = self.inner.lock_state();
        state.items.clear();
        state.cart_id = None;
        // Invalidate any refresh still in flight.
        state.refresh_gen += 1;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn client_id(&self) -> Result<ClientId, CartError> {
        self.inner
            .session
            .current_client_id()
            .ok_or(CartError::NotSignedIn)
    }

    /// Apply an authoritative cart returned by a mutation.
    fn apply_remote_cart(&self, cart: RemoteCart) {
        let mut state = self.inner.lock_state();
        state.cart_id = Some(cart.id);
        state.items = cart.items.into_iter().map(CartItem::from).collect();
        // Older in-flight refreshes must not clobber this.
        state.refresh_gen += 1;
    }

    /// Schedule the deferred post-mutation refresh, replacing (and
    /// aborting) any refresh already pending. The task holds only a
    /// weak reference, so dropping the store cancels it.
    fn schedule_reconcile(&self) {
        let weak: Weak<CartStoreInner> = Arc::downgrade(&self.inner);
        let delay = self.inner.reconcile_delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let store = Self { inner };
            if let Err(e) = store.refresh(true).await {
                tracing::warn!(error = %e, "deferred cart reconciliation failed");
            }
        })
        .abort_handle();

        let mut slot = self
            .inner
            .reconcile_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn report_failure(&self, context: &str, error: &StoreError) {
        tracing::warn!(error = %error, "{context}");
        self.inner
            .notify
            .notify(&format!("{context}: {error}"), NoticeKind::Error);
    }
}
