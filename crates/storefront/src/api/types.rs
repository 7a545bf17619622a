//! Wire types for the remote store API.
//!
//! These mirror the store's JSON shapes (camelCase fields, Mongo-style
//! `_id` keys) and stay separate from the engine's domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use petalpost_core::{CartId, CartItemId, ItemType, Money, OrderId, PaymentType, ProductId};

use super::StoreError;

// =============================================================================
// Response Envelopes
// =============================================================================

/// Acknowledgement envelope for mutations without a payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable reason, present on failure.
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope for endpoints that return the canonical cart.
#[derive(Debug, Clone, Deserialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RemoteCart>,
}

/// Envelope for `POST /clients/{clientId}/validateCode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodeResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub discount_data: Option<DiscountData>,
}

/// Envelope for `POST /sales`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<SaleData>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Canonical cart as returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    /// Cart ID.
    #[serde(rename = "_id")]
    pub id: CartId,
    /// Line items.
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

/// A cart line item on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    /// Line item ID.
    #[serde(rename = "_id")]
    pub id: CartItemId,
    /// Product reference.
    pub product_ref: ProductId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Quantity (the store also enforces `[1, 99]`).
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
    /// Catalog product or customized arrangement.
    #[serde(default)]
    pub item_type: ItemType,
    /// Customization note for `custom` items.
    #[serde(default)]
    pub customization: Option<String>,
}

/// Request body for adding a line item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    /// Product to add.
    pub product_ref: ProductId,
    /// Quantity to add.
    pub quantity: u32,
    /// Catalog product or customized arrangement.
    pub item_type: ItemType,
    /// Customization note for `custom` items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization: Option<String>,
}

/// Request body for a quantity mutation.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityRequest {
    /// New absolute quantity.
    pub quantity: u32,
}

// =============================================================================
// Discount Types
// =============================================================================

/// Request body for promo code validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateCodeRequest {
    /// The promotional code as entered by the user.
    pub code: String,
}

/// Validated discount data from the store.
///
/// `discount` is a percentage-bearing string; the store is loose about
/// formatting (`"10"`, `"10%"`, `"10.5 %"` all occur).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountData {
    /// Display name of the promotion.
    pub name: String,
    /// The code that was validated.
    pub code: String,
    /// Percentage-bearing string.
    pub discount: String,
}

impl DiscountData {
    /// Parse the percentage out of the `discount` field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` if no usable number is present.
    pub fn percentage(&self) -> Result<Decimal, StoreError> {
        let trimmed = self.discount.trim().trim_end_matches('%').trim();
        trimmed.parse::<Decimal>().map_err(|_| {
            StoreError::Malformed(format!("unparseable discount percentage: {:?}", self.discount))
        })
    }
}

// =============================================================================
// Sale Types
// =============================================================================

/// Opaque attachment reference produced by the image picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Original file name.
    pub file_name: String,
    /// MIME type (e.g., `image/jpeg`).
    pub mime_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// A completed order ready for multipart submission to `POST /sales`.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    /// How the customer pays.
    pub payment_type: PaymentType,
    /// Street address for delivery.
    pub delivery_address: String,
    /// Who receives the flowers.
    pub receiver_name: String,
    /// Receiver contact phone.
    pub receiver_phone: String,
    /// Reference point near the delivery address.
    pub delivery_point: String,
    /// Requested delivery date.
    pub delivery_date: NaiveDate,
    /// The cart being consumed by this order.
    pub shopping_cart_id: CartId,
    /// Payment proof, required for bank transfers.
    pub payment_proof: Option<AttachmentRef>,
}

/// Sale payload wrapper in the submission response.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleData {
    /// The created sale.
    pub sale: SaleRecord,
}

/// The created sale as echoed back by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    /// Order ID assigned by the store.
    #[serde(rename = "_id")]
    pub id: OrderId,
    /// Payment type the store recorded.
    pub payment_type: PaymentType,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_percentage_formats() {
        for (raw, expected) in [("10", "10"), ("10%", "10"), (" 10.5 % ", "10.5"), ("7 %", "7")] {
            let data = DiscountData {
                name: "Spring".to_string(),
                code: "SPRING".to_string(),
                discount: raw.to_string(),
            };
            assert_eq!(
                data.percentage().unwrap(),
                expected.parse::<Decimal>().unwrap(),
                "raw input {raw:?}"
            );
        }
    }

    #[test]
    fn test_discount_percentage_garbage_is_malformed() {
        let data = DiscountData {
            name: "Bad".to_string(),
            code: "BAD".to_string(),
            discount: "ten percent".to_string(),
        };
        assert!(matches!(data.percentage(), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_remote_cart_deserializes_store_shape() {
        let json = r#"{
            "_id": "cart-1",
            "items": [{
                "_id": "item-1",
                "productRef": "prod-9",
                "name": "Tulip bouquet",
                "quantity": 2,
                "unitPrice": "25.00",
                "itemType": "product"
            }]
        }"#;
        let cart: RemoteCart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.id.as_str(), "cart-1");
        assert_eq!(cart.items.len(), 1);
        let item = &cart.items[0];
        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_price, Money::from_major(25));
        assert_eq!(item.item_type, ItemType::Product);
        assert!(item.customization.is_none());
    }
}
