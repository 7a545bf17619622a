//! Per-step field validation for the checkout wizard.
//!
//! Validation is entirely client-side and field-scoped; nothing here
//! ever reaches the network layer. A validator either returns the
//! typed, normalized info struct or the full list of field errors so
//! the UI can mark every offending field at once.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use petalpost_core::PaymentType;

use crate::api::AttachmentRef;

/// Receiver phone format: `DDDD-DDDD`.
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern, checked by tests
    Regex::new(r"^\d{4}-\d{4}$").unwrap()
});

const NAME_MIN: usize = 12;
const TEXT_MIN: usize = 20;
const TEXT_MAX: usize = 200;

/// A validation failure scoped to one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field identifier, stable for UI mapping.
    pub field: &'static str,
    /// User-facing message.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Raw shipping inputs as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingForm {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub delivery_address: String,
    pub delivery_point: String,
    pub delivery_date: Option<NaiveDate>,
}

/// Validated, normalized shipping data merged into the order draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingInfo {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub delivery_address: String,
    pub delivery_point: String,
    pub delivery_date: NaiveDate,
}

/// Raw payment inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentForm {
    pub payment_type: Option<PaymentType>,
    pub proof: Option<AttachmentRef>,
}

/// Validated payment data merged into the order draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
    pub payment_type: PaymentType,
    /// Present iff the payment type requires proof.
    pub proof: Option<AttachmentRef>,
}

/// Validate the shipping step.
///
/// `today` is the local calendar date; the delivery-date check is
/// date-only so a late-evening order for tomorrow is never rejected by
/// a timezone offset.
///
/// # Errors
///
/// Every failing field is reported, not just the first.
pub fn validate_shipping(
    form: &ShippingForm,
    today: NaiveDate,
) -> Result<ShippingInfo, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = form.receiver_name.trim();
    if name.chars().count() < NAME_MIN {
        errors.push(FieldError::new(
            "receiver_name",
            "Receiver name must be at least 12 characters",
        ));
    } else if !name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        errors.push(FieldError::new(
            "receiver_name",
            "Receiver name may only contain letters and spaces",
        ));
    }

    let phone = form.receiver_phone.trim();
    if !PHONE_PATTERN.is_match(phone) {
        errors.push(FieldError::new(
            "receiver_phone",
            "Phone must match the format 0000-0000",
        ));
    }

    let address = form.delivery_address.trim();
    if !(TEXT_MIN..=TEXT_MAX).contains(&address.chars().count()) {
        errors.push(FieldError::new(
            "delivery_address",
            "Delivery address must be between 20 and 200 characters",
        ));
    }

    let point = form.delivery_point.trim();
    if !(TEXT_MIN..=TEXT_MAX).contains(&point.chars().count()) {
        errors.push(FieldError::new(
            "delivery_point",
            "Reference point must be between 20 and 200 characters",
        ));
    }

    let delivery_date = match form.delivery_date {
        Some(date) if date >= today => Some(date),
        Some(_) => {
            errors.push(FieldError::new(
                "delivery_date",
                "Delivery date cannot be in the past",
            ));
            None
        }
        None => {
            errors.push(FieldError::new("delivery_date", "Pick a delivery date"));
            None
        }
    };

    match delivery_date {
        Some(delivery_date) if errors.is_empty() => Ok(ShippingInfo {
            receiver_name: name.to_string(),
            receiver_phone: phone.to_string(),
            delivery_address: address.to_string(),
            delivery_point: point.to_string(),
            delivery_date,
        }),
        _ => Err(errors),
    }
}

/// Validate the payment step.
///
/// # Errors
///
/// Payment type is required; a proof attachment is required iff the
/// type is a bank transfer.
pub fn validate_payment(form: &PaymentForm) -> Result<PaymentInfo, Vec<FieldError>> {
    let Some(payment_type) = form.payment_type else {
        return Err(vec![FieldError::new(
            "payment_type",
            "Pick a payment method",
        )]);
    };

    if payment_type.requires_proof() && form.proof.is_none() {
        return Err(vec![FieldError::new(
            "proof",
            "Attach the transfer receipt to continue",
        )]);
    }

    Ok(PaymentInfo {
        payment_type,
        proof: form.proof.clone(),
    })
}
