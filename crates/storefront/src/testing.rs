//! Hand-written fakes for the engine's seams, shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::Semaphore;

use petalpost_core::{CartItemId, ClientId, ItemType, Money, OrderId, PromoCode, ProductId};

use crate::api::{
    AddItemRequest, DiscountData, RemoteCart, RemoteCartItem, RemoteStore, SaleRecord,
    SaleRequest, StoreError,
};
use crate::surfaces::{ConfirmationSurface, NotificationSurface, NoticeKind, SessionProvider};

// =============================================================================
// Builders
// =============================================================================

pub fn remote_item(
    id: &str,
    product: &str,
    name: &str,
    quantity: u32,
    unit_price: &str,
) -> RemoteCartItem {
    RemoteCartItem {
        id: CartItemId::new(id),
        product_ref: ProductId::new(product),
        name: name.to_string(),
        quantity,
        unit_price: Money::new(unit_price.parse().unwrap()),
        item_type: ItemType::Product,
        customization: None,
    }
}

pub fn remote_cart(id: &str, items: Vec<RemoteCartItem>) -> RemoteCart {
    RemoteCart {
        id: id.into(),
        items,
    }
}

// =============================================================================
// MockStore
// =============================================================================

/// Lets a test hold a specific remote call in flight and resolve it later.
pub struct CallGate {
    sem: Arc<Semaphore>,
}

impl CallGate {
    pub fn release(&self) {
        self.sem.add_permits(1);
    }
}

#[derive(Default)]
struct MockStoreState {
    cart: Option<RemoteCart>,
    /// Queued (response, gate) pairs consumed by fetches in call order.
    fetch_queue: VecDeque<(RemoteCart, Option<Arc<Semaphore>>)>,
    update_gate: Option<Arc<Semaphore>>,
    validate_gate: Option<Arc<Semaphore>>,
    fail_update: Option<String>,
    fail_clear: Option<String>,
    discount: Option<DiscountData>,
    fail_validate: Option<String>,
    sale: Option<SaleRecord>,
    fail_submit: Option<String>,
    hang_submit: bool,
    last_sale: Option<SaleRequest>,
}

/// Scriptable in-memory [`RemoteStore`].
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockStoreState>,
    pub fetch_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
}

impl MockStore {
    pub fn with_cart(cart: RemoteCart) -> Self {
        let store = Self::default();
        store.lock().cart = Some(cart);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockStoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_cart(&self, cart: RemoteCart) {
        self.lock().cart = Some(cart);
    }

    /// Queue a fetch response held behind a gate the test releases.
    pub fn queue_fetch_gated(&self, cart: RemoteCart) -> CallGate {
        let sem = Arc::new(Semaphore::new(0));
        self.lock().fetch_queue.push_back((cart, Some(Arc::clone(&sem))));
        CallGate { sem }
    }

    /// Hold the next quantity update in flight until released.
    pub fn gate_next_update(&self) -> CallGate {
        let sem = Arc::new(Semaphore::new(0));
        self.lock().update_gate = Some(Arc::clone(&sem));
        CallGate { sem }
    }

    /// Hold the next code validation in flight until released.
    pub fn gate_next_validate(&self) -> CallGate {
        let sem = Arc::new(Semaphore::new(0));
        self.lock().validate_gate = Some(Arc::clone(&sem));
        CallGate { sem }
    }

    pub fn fail_next_update(&self, reason: &str) {
        self.lock().fail_update = Some(reason.to_string());
    }

    pub fn fail_next_clear(&self, reason: &str) {
        self.lock().fail_clear = Some(reason.to_string());
    }

    pub fn set_discount(&self, name: &str, code: &str, discount: &str) {
        self.lock().discount = Some(DiscountData {
            name: name.to_string(),
            code: code.to_string(),
            discount: discount.to_string(),
        });
    }

    pub fn fail_validate(&self, reason: &str) {
        self.lock().fail_validate = Some(reason.to_string());
    }

    pub fn set_sale(&self, order_id: &str, payment_type: petalpost_core::PaymentType) {
        self.lock().sale = Some(SaleRecord {
            id: OrderId::new(order_id),
            payment_type,
        });
    }

    pub fn fail_submit(&self, reason: &str) {
        self.lock().fail_submit = Some(reason.to_string());
    }

    /// Make `submit_sale` never resolve, for timeout tests.
    pub fn hang_submit(&self) {
        self.lock().hang_submit = true;
    }

    pub fn last_sale_request(&self) -> Option<SaleRequest> {
        self.lock().last_sale.clone()
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn fetch_cart(&self, _client: &ClientId) -> Result<RemoteCart, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.lock().fetch_queue.pop_front();
        if let Some((cart, gate)) = queued {
            if let Some(gate) = gate {
                let permit = gate.acquire().await.unwrap();
                permit.forget();
            }
            return Ok(cart);
        }
        self.lock()
            .cart
            .clone()
            .ok_or_else(|| StoreError::NotFound("no cart".to_string()))
    }

    async fn add_item(
        &self,
        _client: &ClientId,
        request: AddItemRequest,
    ) -> Result<RemoteCart, StoreError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        let cart = state.cart.as_mut().expect("mock cart not seeded");
        // Store rule: an already-present product merges into its line,
        // clamped at 99.
        if let Some(line) = cart.items.iter_mut().find(|line| {
            line.product_ref == request.product_ref && line.item_type == request.item_type
        }) {
            line.quantity = (line.quantity + request.quantity).min(99);
        } else {
            let next_id = format!("item-{}", cart.items.len() + 1);
            cart.items.push(RemoteCartItem {
                id: CartItemId::new(next_id),
                product_ref: request.product_ref,
                name: "Added item".to_string(),
                quantity: request.quantity,
                unit_price: Money::from_major(10),
                item_type: request.item_type,
                customization: request.customization,
            });
        }
        Ok(cart.clone())
    }

    async fn update_item_quantity(
        &self,
        _client: &ClientId,
        item: &CartItemId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.lock().update_gate.take();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.unwrap();
            permit.forget();
        }
        if let Some(reason) = self.lock().fail_update.take() {
            return Err(StoreError::ServerRejected(reason));
        }
        let mut state = self.lock();
        if let Some(cart) = state.cart.as_mut() {
            if let Some(line) = cart.items.iter_mut().find(|line| &line.id == item) {
                line.quantity = quantity;
            }
        }
        Ok(())
    }

    async fn remove_item(&self, _client: &ClientId, item: &CartItemId) -> Result<(), StoreError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        if let Some(cart) = state.cart.as_mut() {
            cart.items.retain(|line| &line.id != item);
        }
        Ok(())
    }

    async fn clear_cart(&self, _client: &ClientId) -> Result<(), StoreError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.lock().fail_clear.take() {
            return Err(StoreError::ServerRejected(reason));
        }
        if let Some(cart) = self.lock().cart.as_mut() {
            cart.items.clear();
        }
        Ok(())
    }

    async fn validate_code(
        &self,
        _client: &ClientId,
        _code: &PromoCode,
    ) -> Result<DiscountData, StoreError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.lock().validate_gate.take();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.unwrap();
            permit.forget();
        }
        if let Some(reason) = self.lock().fail_validate.take() {
            return Err(StoreError::ServerRejected(reason));
        }
        self.lock()
            .discount
            .clone()
            .ok_or_else(|| StoreError::ServerRejected("invalid code".to_string()))
    }

    async fn submit_sale(&self, request: SaleRequest) -> Result<SaleRecord, StoreError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let hang = self.lock().hang_submit;
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(reason) = self.lock().fail_submit.take() {
            return Err(StoreError::ServerRejected(reason));
        }
        let sale = self.lock().sale.clone();
        self.lock().last_sale = Some(request);
        sale.ok_or_else(|| StoreError::ServerRejected("order refused".to_string()))
    }
}

// =============================================================================
// Mock surfaces
// =============================================================================

/// Session provider with a fixed client id.
pub struct MockSession {
    client: Option<ClientId>,
}

impl MockSession {
    pub fn signed_in(client: &str) -> Self {
        Self {
            client: Some(ClientId::new(client)),
        }
    }

    pub const fn signed_out() -> Self {
        Self { client: None }
    }
}

impl SessionProvider for MockSession {
    fn current_client_id(&self) -> Option<ClientId> {
        self.client.clone()
    }

    fn bearer_token(&self) -> Option<SecretString> {
        self.client
            .as_ref()
            .map(|_| SecretString::from("test-token"))
    }
}

/// Confirmation dialog with a scripted answer.
pub struct MockConfirm {
    answer: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfirmationSurface for MockConfirm {
    async fn confirm(&self, _message: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}

/// Notification sink that records what the engine surfaced.
#[derive(Default)]
pub struct MockNotify {
    notices: Mutex<Vec<(String, NoticeKind)>>,
}

impl MockNotify {
    pub fn error_count(&self) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, kind)| *kind == NoticeKind::Error)
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }
}

impl NotificationSurface for MockNotify {
    fn notify(&self, message: &str, kind: NoticeKind) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((message.to_string(), kind));
    }
}
