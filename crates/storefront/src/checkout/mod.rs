//! The three-step checkout wizard.
//!
//! [`CheckoutWizard`] owns the [`OrderDraft`] and the
//! `Shipping -> Payment -> Review` state machine. Advancing a step is
//! gated on that step's validator; retreating always succeeds and never
//! clears anything the user typed. `Submitted` and `Cancelled` are
//! terminal.

mod validate;

pub use validate::{
    FieldError, PaymentForm, PaymentInfo, ShippingForm, ShippingInfo, validate_payment,
    validate_shipping,
};

use chrono::Local;
use thiserror::Error;

use crate::cart::{CartSnapshot, CartStore};
use crate::discount::{Discount, DiscountEngine};
use crate::order::{OrderReceipt, OrderSubmitter, SubmitError};

/// Where the wizard currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Shipping,
    Payment,
    Review,
    /// Terminal: the order was placed.
    Submitted,
    /// Terminal: the user abandoned checkout.
    Cancelled,
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Review => "review",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl WizardStep {
    /// Whether the wizard can still move.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Cancelled)
    }
}

/// The accumulating, not-yet-submitted order.
///
/// Built against the cart snapshot captured when checkout started, not
/// the live store; preserved unchanged when a submission fails.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Cart contents at checkout start.
    pub cart_snapshot: CartSnapshot,
    /// Populated when the shipping step validates.
    pub shipping: Option<ShippingInfo>,
    /// Populated when the payment step validates.
    pub payment: Option<PaymentInfo>,
    /// Discount applied at checkout start, if any.
    pub discount: Option<Discount>,
}

/// Errors from wizard transitions.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout cannot start on an empty or never-fetched cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The current step's validator found problems; the wizard did not
    /// move.
    #[error("{} field(s) failed validation", .0.len())]
    Validation(Vec<FieldError>),

    /// The requested transition does not exist from this step.
    #[error("cannot {action} from the {step} step")]
    InvalidTransition {
        step: WizardStep,
        action: &'static str,
    },

    /// Submission failed; the wizard stays on Review with the draft
    /// intact.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// The order-draft state machine.
///
/// Owned exclusively by the checkout screen; the draft is mutated only
/// through these operations.
pub struct CheckoutWizard {
    step: WizardStep,
    draft: OrderDraft,
    shipping_form: ShippingForm,
    payment_form: PaymentForm,
    submitter: OrderSubmitter,
}

impl CheckoutWizard {
    /// Start checkout: capture the cart snapshot and any applied
    /// discount.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] when there is nothing to buy.
    pub fn start(
        cart: &CartStore,
        discounts: &DiscountEngine,
        submitter: OrderSubmitter,
    ) -> Result<Self, CheckoutError> {
        let cart_snapshot = cart.snapshot().ok_or(CheckoutError::EmptyCart)?;
        tracing::debug!(
            cart = %cart_snapshot.cart_id,
            items = cart_snapshot.items.len(),
            "checkout started"
        );
        Ok(Self {
            step: WizardStep::Shipping,
            draft: OrderDraft {
                cart_snapshot,
                shipping: None,
                payment: None,
                discount: discounts.current(),
            },
            shipping_form: ShippingForm::default(),
            payment_form: PaymentForm::default(),
            submitter,
        })
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    /// The draft as accumulated so far.
    #[must_use]
    pub const fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    /// Shipping inputs, edited in place by the form bindings.
    pub fn shipping_form_mut(&mut self) -> &mut ShippingForm {
        &mut self.shipping_form
    }

    /// Payment inputs, edited in place by the form bindings.
    pub fn payment_form_mut(&mut self) -> &mut PaymentForm {
        &mut self.payment_form
    }

    /// Validate the current step and move forward.
    ///
    /// On success the step's data is merged into the draft. Review is
    /// only reachable once both shipping and payment validated, which
    /// the step order guarantees.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Validation`] with every failing field; the
    /// wizard does not move. Review and terminal steps cannot advance.
    pub fn advance(&mut self) -> Result<WizardStep, CheckoutError> {
        match self.step {
            WizardStep::Shipping => {
                let today = Local::now().date_naive();
                let info = validate_shipping(&self.shipping_form, today)
                    .map_err(CheckoutError::Validation)?;
                self.draft.shipping = Some(info);
                self.step = WizardStep::Payment;
            }
            WizardStep::Payment => {
                let info =
                    validate_payment(&self.payment_form).map_err(CheckoutError::Validation)?;
                self.draft.payment = Some(info);
                self.step = WizardStep::Review;
            }
            step => {
                return Err(CheckoutError::InvalidTransition {
                    step,
                    action: "advance",
                });
            }
        }
        Ok(self.step)
    }

    /// Go back one step. Always succeeds; nothing the user entered is
    /// cleared.
    pub fn retreat(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Review => WizardStep::Payment,
            WizardStep::Payment => WizardStep::Shipping,
            step => step,
        };
        self.step
    }

    /// Abandon checkout. Terminal steps stay where they are.
    pub fn cancel(&mut self) -> WizardStep {
        if !self.step.is_terminal() {
            self.step = WizardStep::Cancelled;
        }
        self.step
    }

    /// Submit the order. Only valid from Review.
    ///
    /// On success the wizard terminates in `Submitted`. On failure it
    /// stays on Review with the draft untouched, so the user retries
    /// without re-entering anything.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Submit`] carrying the classified submission
    /// failure.
    pub async fn commit(&mut self) -> Result<OrderReceipt, CheckoutError> {
        if self.step != WizardStep::Review {
            return Err(CheckoutError::InvalidTransition {
                step: self.step,
                action: "commit",
            });
        }
        let receipt = self.submitter.submit(&self.draft).await?;
        self.step = WizardStep::Submitted;
        Ok(receipt)
    }
}
