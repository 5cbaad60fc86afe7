//! # Payment Contracts
//!
//! Request and response shapes exchanged with the two payment backends. The
//! HTTP side lives in `layerline-payments`; this module only builds payloads.
//!
//! ## Two Rails
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GATEWAY (redirect)                                                    │
//! │    PreferenceRequest ──► payment function ──► PreferenceResponse       │
//! │    { customer, items, subtotal, adjustment(+), total }  { redirectUrl }│
//! │                                                                         │
//! │  TRANSFER (manual)                                                     │
//! │    ProofFile ──► blob storage ──► UploadedProof { url }                │
//! │                                        │                                │
//! │                                        ▼                                │
//! │    PendingPaymentRequest { customer, amount, proofUrl, notes,          │
//! │                            metadata { items, deliveryMethod, ... } }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items carry the unadjusted prices. The rail adjustment is applied once, to
//! the total, and sent alongside.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLineItem;
use crate::checkout::Customer;
use crate::money::Money;
use crate::pricing::{line_breakdown, AccessoryLine, CheckoutTotals};
use crate::types::{DeliveryMethod, SelectedSection};
use crate::MAX_PROOF_BYTES;

// =============================================================================
// Line Items
// =============================================================================

/// One cart line as the payment backends see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    /// Product id.
    pub id: String,
    pub title: String,
    pub quantity: u32,

    /// Effective (tier-adjusted) unit price.
    pub unit_price: Money,

    /// Line total including accessories.
    pub line_total: Money,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SelectedSection>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessories: Vec<AccessoryLine>,
}

/// Packages cart lines for either rail.
pub fn payment_items(items: &[CartLineItem]) -> Vec<PaymentItem> {
    items
        .iter()
        .map(|line| {
            let breakdown = line_breakdown(line);
            PaymentItem {
                id: line.product.id.clone(),
                title: line.product.name.clone(),
                quantity: line.quantity,
                unit_price: breakdown.base_price,
                line_total: breakdown.total,
                colors: line.selected_colors.iter().map(|c| c.name.clone()).collect(),
                sections: line.selected_sections.clone(),
                accessories: breakdown.accessory_items,
            }
        })
        .collect()
}

// =============================================================================
// Gateway Rail
// =============================================================================

/// Body of the "create preference" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRequest {
    pub customer: Customer,
    pub delivery_method: DeliveryMethod,
    pub items: Vec<PaymentItem>,
    pub subtotal: Money,

    /// Gateway surcharge, already included in `total`.
    pub adjustment: Money,
    pub total: Money,
}

impl PreferenceRequest {
    pub fn new(
        customer: Customer,
        delivery_method: DeliveryMethod,
        items: &[CartLineItem],
        totals: CheckoutTotals,
    ) -> Self {
        PreferenceRequest {
            customer,
            delivery_method,
            items: payment_items(items),
            subtotal: totals.subtotal,
            adjustment: totals.adjustment,
            total: totals.total,
        }
    }
}

/// Successful "create preference" response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceResponse {
    /// Hosted checkout page the buyer is sent to.
    #[serde(alias = "initPoint", alias = "init_point")]
    pub redirect_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_id: Option<String>,
}

// =============================================================================
// Transfer Rail
// =============================================================================

/// A transfer receipt attached by the buyer.
#[derive(Clone, PartialEq, Eq)]
pub struct ProofFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ProofFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl ProofFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        ProofFile {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Checks type and size.
    ///
    /// ## Rules
    /// - An image (`image/*`) or a PDF
    /// - Not empty, at most [`MAX_PROOF_BYTES`]
    pub fn validate(&self) -> Result<(), String> {
        let content_type = self.content_type.trim().to_ascii_lowercase();
        if !(content_type.starts_with("image/") || content_type == "application/pdf") {
            return Err(format!(
                "{} is not an image or PDF ({})",
                self.file_name, self.content_type
            ));
        }

        if self.data.is_empty() {
            return Err(format!("{} is empty", self.file_name));
        }

        if self.data.len() > MAX_PROOF_BYTES {
            return Err(format!(
                "{} is larger than {} MiB",
                self.file_name,
                MAX_PROOF_BYTES / (1024 * 1024)
            ));
        }

        Ok(())
    }

    pub fn summary(&self) -> ProofSummary {
        ProofSummary {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            size: self.data.len(),
        }
    }
}

/// What the UI shows about an attached proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProofSummary {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

/// Storage object name for a proof: `proofs/<id>-<sanitized name>`.
///
/// ## Example
/// ```rust
/// use layerline_core::payment::proof_object_name;
///
/// assert_eq!(
///     proof_object_name("42", "Comprobante Nº 7.png"),
///     "proofs/42-Comprobante_N_7.png"
/// );
/// ```
pub fn proof_object_name(id: &str, file_name: &str) -> String {
    let sanitized: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // collapse runs of underscores left by spaces and symbols
    let mut collapsed = String::with_capacity(sanitized.len());
    for c in sanitized.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    let name = collapsed.trim_matches('_');
    let name = if name.is_empty() { "proof" } else { name };
    format!("proofs/{}-{}", id, name)
}

/// Where an uploaded proof can be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UploadedProof {
    pub url: String,
}

/// Order details stored with a pending transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    pub items: Vec<PaymentItem>,
    pub delivery_method: DeliveryMethod,
    pub subtotal: Money,

    /// Transfer discount (negative), already included in the amount.
    pub adjustment: Money,
}

/// Body of the "create pending payment" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentRequest {
    pub customer: Customer,

    /// Adjusted amount the buyer transferred.
    pub amount: Money,
    pub proof_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub metadata: PaymentMetadata,
}

/// Everything a transfer submission needs, minus the proof URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSubmission {
    pub proof: ProofFile,
    pub customer: Customer,
    pub delivery_method: DeliveryMethod,
    pub items: Vec<PaymentItem>,
    pub totals: CheckoutTotals,
    pub notes: Option<String>,
}

impl TransferSubmission {
    /// Builds the pending record once the proof is uploaded.
    pub fn pending_request(&self, proof_url: impl Into<String>) -> PendingPaymentRequest {
        PendingPaymentRequest {
            customer: self.customer.clone(),
            amount: self.totals.total,
            proof_url: proof_url.into(),
            notes: self.notes.clone(),
            metadata: PaymentMetadata {
                items: self.items.clone(),
                delivery_method: self.delivery_method,
                subtotal: self.totals.subtotal,
                adjustment: self.totals.adjustment,
            },
        }
    }
}

/// A checkout ready to hand to one of the backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Gateway(PreferenceRequest),
    Transfer(TransferSubmission),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::types::{ColorMode, ColorWithName, Product, SelectedAccessory};

    fn line() -> CartLineItem {
        CartLineItem {
            product: Product {
                id: "p1".into(),
                name: "Dragon".into(),
                price_cents: 100,
                original_price_cents: None,
                stock: 10,
                images: Vec::new(),
                available_colors: vec![ColorWithName::new("Red", "#ff0000")],
                color_mode: ColorMode::Default,
                color_sections: Vec::new(),
                accessories: Vec::new(),
                bulk_pricing_rules: Vec::new(),
            },
            quantity: 3,
            selected_colors: vec![ColorWithName::new("Red", "#ff0000")],
            selected_sections: Vec::new(),
            selected_accessories: vec![SelectedAccessory {
                name: "Stand".into(),
                color: Some("Black".into()),
                quantity: 2,
                price_cents: 20,
            }],
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_payment_items_carry_metadata() {
        let items = payment_items(&[line()]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price.cents(), 100);
        assert_eq!(items[0].line_total.cents(), 420);
        assert_eq!(items[0].colors, vec!["Red".to_string()]);
        assert_eq!(items[0].accessories[0].total.cents(), 120);
    }

    #[test]
    fn test_proof_validation() {
        assert!(ProofFile::new("r.png", "image/png", vec![1, 2, 3]).validate().is_ok());
        assert!(ProofFile::new("r.pdf", "application/pdf", vec![1]).validate().is_ok());

        assert!(ProofFile::new("r.txt", "text/plain", vec![1]).validate().is_err());
        assert!(ProofFile::new("r.png", "image/png", Vec::new()).validate().is_err());
        assert!(ProofFile::new("r.png", "image/png", vec![0; MAX_PROOF_BYTES + 1])
            .validate()
            .is_err());
    }

    #[test]
    fn test_proof_object_name() {
        assert_eq!(proof_object_name("a1", "receipt.pdf"), "proofs/a1-receipt.pdf");
        assert_eq!(proof_object_name("a1", "my  receipt!.jpg"), "proofs/a1-my_receipt_.jpg");
        assert_eq!(proof_object_name("a1", "???"), "proofs/a1-proof");
    }

    #[test]
    fn test_preference_response_accepts_gateway_field_names() {
        let response: PreferenceResponse =
            serde_json::from_str(r#"{"init_point":"https://pay.example.com/x"}"#).unwrap();
        assert_eq!(response.redirect_url, "https://pay.example.com/x");

        let response: PreferenceResponse =
            serde_json::from_str(r#"{"redirectUrl":"https://pay.example.com/y","preferenceId":"p"}"#)
                .unwrap();
        assert_eq!(response.preference_id.as_deref(), Some("p"));
    }
}
