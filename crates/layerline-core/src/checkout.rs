//! # Checkout State Machine
//!
//! Walks the buyer through delivery, contact details and payment, refusing
//! to move on until each stage is complete.
//!
//! ## Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────────┐  advance   ┌──────────┐  advance   ┌──────────┐         │
//! │   │ Delivery │ ─────────► │   Form   │ ─────────► │ Payment  │ ─► submit│
//! │   │          │ ◄───────── │          │ ◄───────── │          │         │
//! │   └──────────┘    back    └──────────┘    back    └──────────┘         │
//! │                                        (clears method + proof)          │
//! │                                                                         │
//! │   Delivery gate: pickup or shipping chosen                              │
//! │   Form gate:     name, email, phone, social handle                     │
//! │                  + street, city, postal code, province when shipping    │
//! │                  + every cart line has its color/section selection      │
//! │   Payment gate:  method chosen; transfer also needs a proof             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A refused transition leaves the session exactly as it was. There is no
//! way to skip a stage: `advance` moves one stage at a time and each stage
//! has its own gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::CartLineItem;
use crate::error::{CheckoutError, ValidationError};
use crate::payment::{
    payment_items, PreferenceRequest, ProofFile, ProofSummary, Submission, TransferSubmission,
};
use crate::pricing::{adjusted_total, checkout_subtotal, AdjustmentRates, CheckoutTotals};
use crate::selection::is_line_complete;
use crate::types::{DeliveryMethod, PaymentMethod};
use crate::validation::{
    validate_email, validate_phone, validate_postal_code, validate_required,
    validate_social_handle,
};

// =============================================================================
// Stage
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Delivery,
    Form,
    Payment,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutStage::Delivery => write!(f, "delivery"),
            CheckoutStage::Form => write!(f, "form"),
            CheckoutStage::Payment => write!(f, "payment"),
        }
    }
}

// =============================================================================
// Customer Form
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub province: String,
}

/// The customer fields as typed, possibly incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub social_handle: String,

    /// Only checked for shipping.
    #[serde(default)]
    pub address: ShippingAddress,

    /// Free text for the seller, sent with transfer payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Customer details that passed the form gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub social_handle: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ShippingAddress>,
}

impl CustomerForm {
    /// Checks every field and collects all failures.
    ///
    /// ## Returns
    /// The trimmed [`Customer`], with an address only for shipping, or every
    /// field error at once so the UI can highlight them together.
    pub fn validate(&self, delivery: DeliveryMethod) -> Result<Customer, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut check = |result: Result<String, ValidationError>| match result {
            Ok(value) => value,
            Err(err) => {
                errors.push(err);
                String::new()
            }
        };

        let name = check(validate_required("name", &self.name));
        let email = check(validate_email(&self.email));
        let phone = check(validate_phone(&self.phone));
        let social_handle = check(validate_social_handle(&self.social_handle));

        let address = match delivery {
            DeliveryMethod::Pickup => None,
            DeliveryMethod::Shipping => Some(ShippingAddress {
                street: check(validate_required("street", &self.address.street)),
                city: check(validate_required("city", &self.address.city)),
                postal_code: check(validate_postal_code(&self.address.postal_code)),
                province: check(validate_required("province", &self.address.province)),
            }),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Customer {
            name,
            email,
            phone,
            social_handle,
            address,
        })
    }

    fn notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Names of the products whose cart line lacks a required selection.
pub fn incomplete_lines(items: &[CartLineItem]) -> Vec<String> {
    items
        .iter()
        .filter(|line| !is_line_complete(line))
        .map(|line| line.product.name.clone())
        .collect()
}

// =============================================================================
// Session
// =============================================================================

/// Serializable snapshot of a session, for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub stage: CheckoutStage,
    pub delivery_method: Option<DeliveryMethod>,
    pub customer: CustomerForm,
    pub payment_method: Option<PaymentMethod>,
    pub proof: Option<ProofSummary>,
}

/// One checkout attempt. Discarded on cancel or successful submit.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    stage: CheckoutStage,
    delivery_method: Option<DeliveryMethod>,
    customer: CustomerForm,
    payment_method: Option<PaymentMethod>,
    proof: Option<ProofFile>,
    rates: AdjustmentRates,
}

impl CheckoutSession {
    /// Opens a session at the delivery stage.
    pub fn new(rates: AdjustmentRates) -> Self {
        CheckoutSession {
            stage: CheckoutStage::Delivery,
            delivery_method: None,
            customer: CustomerForm::default(),
            payment_method: None,
            proof: None,
            rates,
        }
    }

    pub fn stage(&self) -> CheckoutStage {
        self.stage
    }

    pub fn delivery_method(&self) -> Option<DeliveryMethod> {
        self.delivery_method
    }

    pub fn customer(&self) -> &CustomerForm {
        &self.customer
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn proof(&self) -> Option<&ProofFile> {
        self.proof.as_ref()
    }

    pub fn rates(&self) -> AdjustmentRates {
        self.rates
    }

    pub fn view(&self) -> CheckoutView {
        CheckoutView {
            stage: self.stage,
            delivery_method: self.delivery_method,
            customer: self.customer.clone(),
            payment_method: self.payment_method,
            proof: self.proof.as_ref().map(ProofFile::summary),
        }
    }

    fn require_stage(&self, expected: CheckoutStage) -> Result<(), CheckoutError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    // =========================================================================
    // Stage Inputs
    // =========================================================================

    pub fn choose_delivery(&mut self, method: DeliveryMethod) -> Result<(), CheckoutError> {
        self.require_stage(CheckoutStage::Delivery)?;
        self.delivery_method = Some(method);
        Ok(())
    }

    /// Replaces the customer fields. Checked on `advance`, not here.
    pub fn update_customer(&mut self, form: CustomerForm) -> Result<(), CheckoutError> {
        self.require_stage(CheckoutStage::Form)?;
        self.customer = form;
        Ok(())
    }

    /// Chooses the payment rail. Switching to the gateway drops any proof.
    pub fn choose_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.require_stage(CheckoutStage::Payment)?;
        if method == PaymentMethod::Gateway {
            self.proof = None;
        }
        self.payment_method = Some(method);
        Ok(())
    }

    /// Attaches the transfer receipt, replacing an earlier one.
    pub fn attach_proof(&mut self, proof: ProofFile) -> Result<(), CheckoutError> {
        self.require_stage(CheckoutStage::Payment)?;
        match self.payment_method {
            Some(PaymentMethod::Transfer) => {}
            Some(PaymentMethod::Gateway) => return Err(CheckoutError::ProofNotAccepted),
            None => return Err(CheckoutError::PaymentMethodRequired),
        }

        proof.validate().map_err(CheckoutError::InvalidProof)?;
        self.proof = Some(proof);
        Ok(())
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Moves one stage forward if the current stage's gate passes.
    pub fn advance(&mut self, items: &[CartLineItem]) -> Result<CheckoutStage, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.stage = match self.stage {
            CheckoutStage::Delivery => {
                self.delivery_method
                    .ok_or(CheckoutError::DeliveryMethodRequired)?;
                CheckoutStage::Form
            }
            CheckoutStage::Form => {
                self.check_form(items)?;
                CheckoutStage::Payment
            }
            CheckoutStage::Payment => return Err(CheckoutError::AtLastStage),
        };
        Ok(self.stage)
    }

    /// Moves one stage back. Leaving payment clears the method and proof.
    pub fn back(&mut self) -> Result<CheckoutStage, CheckoutError> {
        self.stage = match self.stage {
            CheckoutStage::Delivery => return Err(CheckoutError::AtFirstStage),
            CheckoutStage::Form => CheckoutStage::Delivery,
            CheckoutStage::Payment => {
                self.payment_method = None;
                self.proof = None;
                CheckoutStage::Form
            }
        };
        Ok(self.stage)
    }

    /// The form gate: valid customer fields and complete cart selections.
    fn check_form(&self, items: &[CartLineItem]) -> Result<Customer, CheckoutError> {
        let delivery = self
            .delivery_method
            .ok_or(CheckoutError::DeliveryMethodRequired)?;
        let customer = self
            .customer
            .validate(delivery)
            .map_err(CheckoutError::InvalidCustomer)?;

        let products = incomplete_lines(items);
        if !products.is_empty() {
            return Err(CheckoutError::IncompleteSelections { products });
        }

        Ok(customer)
    }

    // =========================================================================
    // Totals & Submission
    // =========================================================================

    /// Adjusted totals for one rail.
    pub fn totals_for(&self, items: &[CartLineItem], method: PaymentMethod) -> CheckoutTotals {
        adjusted_total(checkout_subtotal(items), method, self.rates)
    }

    /// Adjusted totals for both rails, gateway first.
    pub fn quote(&self, items: &[CartLineItem]) -> Vec<CheckoutTotals> {
        [PaymentMethod::Gateway, PaymentMethod::Transfer]
            .into_iter()
            .map(|method| self.totals_for(items, method))
            .collect()
    }

    /// Re-checks every gate and builds the payload for the chosen rail.
    ///
    /// The cart can change between stages, so the form gate runs again here.
    pub fn prepare_submission(&self, items: &[CartLineItem]) -> Result<Submission, CheckoutError> {
        self.require_stage(CheckoutStage::Payment)?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let method = self
            .payment_method
            .ok_or(CheckoutError::PaymentMethodRequired)?;
        let customer = self.check_form(items)?;
        let delivery_method = self
            .delivery_method
            .ok_or(CheckoutError::DeliveryMethodRequired)?;
        let totals = self.totals_for(items, method);

        match method {
            PaymentMethod::Gateway => Ok(Submission::Gateway(PreferenceRequest::new(
                customer,
                delivery_method,
                items,
                totals,
            ))),
            PaymentMethod::Transfer => {
                let proof = self.proof.clone().ok_or(CheckoutError::ProofRequired)?;
                Ok(Submission::Transfer(TransferSubmission {
                    proof,
                    customer,
                    delivery_method,
                    items: payment_items(items),
                    totals,
                    notes: self.customer.notes(),
                }))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::types::{ColorMode, ColorSection, ColorWithName, Product};

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.into(),
            name: name.into(),
            price_cents: 500,
            original_price_cents: None,
            stock: 10,
            images: Vec::new(),
            available_colors: Vec::new(),
            color_mode: ColorMode::Default,
            color_sections: Vec::new(),
            accessories: Vec::new(),
            bulk_pricing_rules: Vec::new(),
        }
    }

    fn line(product: Product, quantity: u32) -> CartLineItem {
        CartLineItem {
            product,
            quantity,
            selected_colors: Vec::new(),
            selected_sections: Vec::new(),
            selected_accessories: Vec::new(),
            added_at: Utc::now(),
        }
    }

    fn cart() -> Vec<CartLineItem> {
        vec![line(product("p1", "Planter"), 2)]
    }

    fn valid_form() -> CustomerForm {
        CustomerForm {
            name: "Ana López".into(),
            email: "ana@example.com".into(),
            phone: "+54 341 555 1234".into(),
            social_handle: "@ana.prints".into(),
            address: ShippingAddress::default(),
            notes: Some("  ".into()),
        }
    }

    fn at_payment(delivery: DeliveryMethod) -> CheckoutSession {
        let mut session = CheckoutSession::new(AdjustmentRates::default());
        session.choose_delivery(delivery).unwrap();
        session.advance(&cart()).unwrap();
        session.update_customer(valid_form()).unwrap();
        session.advance(&cart()).unwrap();
        session
    }

    #[test]
    fn test_delivery_gate() {
        let mut session = CheckoutSession::new(AdjustmentRates::default());
        assert_eq!(
            session.advance(&cart()),
            Err(CheckoutError::DeliveryMethodRequired)
        );
        assert_eq!(session.stage(), CheckoutStage::Delivery);

        session.choose_delivery(DeliveryMethod::Pickup).unwrap();
        assert_eq!(session.advance(&cart()), Ok(CheckoutStage::Form));
    }

    #[test]
    fn test_payment_is_unreachable_from_delivery() {
        let mut session = CheckoutSession::new(AdjustmentRates::default());
        session.choose_delivery(DeliveryMethod::Pickup).unwrap();

        assert!(matches!(
            session.choose_payment_method(PaymentMethod::Gateway),
            Err(CheckoutError::WrongStage { .. })
        ));

        // one advance reaches form only
        session.advance(&cart()).unwrap();
        assert_eq!(session.stage(), CheckoutStage::Form);
    }

    #[test]
    fn test_form_failure_keeps_stage() {
        let mut session = CheckoutSession::new(AdjustmentRates::default());
        session.choose_delivery(DeliveryMethod::Shipping).unwrap();
        session.advance(&cart()).unwrap();

        let mut form = valid_form();
        form.email = "not-an-email".into();
        session.update_customer(form).unwrap();

        match session.advance(&cart()) {
            Err(CheckoutError::InvalidCustomer(errors)) => {
                let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
                assert!(fields.contains(&"email"));
                assert!(fields.contains(&"street"));
                assert!(fields.contains(&"city"));
                assert!(fields.contains(&"postal code"));
                assert!(fields.contains(&"province"));
            }
            other => panic!("expected InvalidCustomer, got {:?}", other),
        }
        assert_eq!(session.stage(), CheckoutStage::Form);
    }

    #[test]
    fn test_shipping_address_is_required_only_for_shipping() {
        let pickup = valid_form().validate(DeliveryMethod::Pickup).unwrap();
        assert!(pickup.address.is_none());
        assert_eq!(pickup.social_handle, "ana.prints");

        let mut form = valid_form();
        form.address = ShippingAddress {
            street: "Av. Pellegrini 1200".into(),
            city: "Rosario".into(),
            postal_code: "S2000".into(),
            province: "Santa Fe".into(),
        };
        let shipping = form.validate(DeliveryMethod::Shipping).unwrap();
        assert_eq!(shipping.address.unwrap().city, "Rosario");
    }

    #[test]
    fn test_incomplete_selections_enumerate_products() {
        let mut lamp = product("p2", "Moon Lamp");
        lamp.available_colors = vec![ColorWithName::new("White", "#ffffff")];
        let mut house = product("p3", "Cottage");
        house.color_mode = ColorMode::Sections;
        house.color_sections = vec![ColorSection {
            id: "roof".into(),
            label: "Roof".into(),
            color_ids: vec!["red".into()],
        }];
        let items = vec![line(product("p1", "Planter"), 1), line(lamp, 1), line(house, 1)];

        let mut session = CheckoutSession::new(AdjustmentRates::default());
        session.choose_delivery(DeliveryMethod::Pickup).unwrap();
        session.advance(&items).unwrap();
        session.update_customer(valid_form()).unwrap();

        assert_eq!(
            session.advance(&items),
            Err(CheckoutError::IncompleteSelections {
                products: vec!["Moon Lamp".to_string(), "Cottage".to_string()]
            })
        );
        assert_eq!(session.stage(), CheckoutStage::Form);
    }

    #[test]
    fn test_empty_cart_cannot_advance() {
        let mut session = CheckoutSession::new(AdjustmentRates::default());
        session.choose_delivery(DeliveryMethod::Pickup).unwrap();
        assert_eq!(session.advance(&[]), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_back_transitions() {
        let mut session = at_payment(DeliveryMethod::Pickup);
        session.choose_payment_method(PaymentMethod::Transfer).unwrap();
        session
            .attach_proof(ProofFile::new("r.png", "image/png", vec![1]))
            .unwrap();

        assert_eq!(session.back(), Ok(CheckoutStage::Form));
        assert!(session.payment_method().is_none());
        assert!(session.proof().is_none());

        assert_eq!(session.back(), Ok(CheckoutStage::Delivery));
        assert_eq!(session.back(), Err(CheckoutError::AtFirstStage));
    }

    #[test]
    fn test_advance_past_payment_is_refused() {
        let mut session = at_payment(DeliveryMethod::Pickup);
        assert_eq!(session.advance(&cart()), Err(CheckoutError::AtLastStage));
    }

    #[test]
    fn test_proof_rules() {
        let mut session = at_payment(DeliveryMethod::Pickup);
        let proof = ProofFile::new("r.pdf", "application/pdf", vec![1]);

        assert_eq!(
            session.attach_proof(proof.clone()),
            Err(CheckoutError::PaymentMethodRequired)
        );

        session.choose_payment_method(PaymentMethod::Gateway).unwrap();
        assert_eq!(
            session.attach_proof(proof.clone()),
            Err(CheckoutError::ProofNotAccepted)
        );

        session.choose_payment_method(PaymentMethod::Transfer).unwrap();
        assert!(matches!(
            session.attach_proof(ProofFile::new("r.zip", "application/zip", vec![1])),
            Err(CheckoutError::InvalidProof(_))
        ));
        session.attach_proof(proof).unwrap();

        // switching to the gateway drops the proof
        session.choose_payment_method(PaymentMethod::Gateway).unwrap();
        assert!(session.proof().is_none());
    }

    #[test]
    fn test_transfer_requires_proof() {
        let mut session = at_payment(DeliveryMethod::Pickup);
        session.choose_payment_method(PaymentMethod::Transfer).unwrap();
        assert_eq!(
            session.prepare_submission(&cart()),
            Err(CheckoutError::ProofRequired)
        );
    }

    #[test]
    fn test_gateway_submission_is_surcharged_once() {
        let mut session = at_payment(DeliveryMethod::Pickup);
        session.choose_payment_method(PaymentMethod::Gateway).unwrap();

        let items = vec![line(product("p1", "Planter"), 1), line(product("p2", "Vase"), 1)];
        match session.prepare_submission(&items).unwrap() {
            Submission::Gateway(request) => {
                assert_eq!(request.subtotal.cents(), 1000);
                assert_eq!(request.adjustment.cents(), 100);
                assert_eq!(request.total.cents(), 1100);
                assert_eq!(request.items.len(), 2);
                // items keep unadjusted prices
                assert_eq!(request.items[0].unit_price.cents(), 500);
            }
            other => panic!("expected gateway submission, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_submission_is_discounted() {
        let mut session = at_payment(DeliveryMethod::Pickup);
        session.choose_payment_method(PaymentMethod::Transfer).unwrap();
        session
            .attach_proof(ProofFile::new("r.png", "image/png", vec![1, 2]))
            .unwrap();

        match session.prepare_submission(&cart()).unwrap() {
            Submission::Transfer(transfer) => {
                assert_eq!(transfer.totals.total.cents(), 950);
                assert!(transfer.notes.is_none());

                let pending = transfer.pending_request("https://files.example.com/p.png");
                assert_eq!(pending.amount.cents(), 950);
                assert_eq!(pending.metadata.adjustment.cents(), -50);
                assert_eq!(pending.proof_url, "https://files.example.com/p.png");
            }
            other => panic!("expected transfer submission, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_shows_both_rails() {
        let session = CheckoutSession::new(AdjustmentRates::default());
        let quote = session.quote(&cart());
        assert_eq!(quote[0].method, PaymentMethod::Gateway);
        assert_eq!(quote[0].total.cents(), 1100);
        assert_eq!(quote[1].total.cents(), 950);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(CheckoutStage::Payment.to_string(), "payment");
        let err = CheckoutError::WrongStage {
            expected: CheckoutStage::Payment,
            actual: CheckoutStage::Delivery,
        };
        assert_eq!(
            err.to_string(),
            "This step is only available at the payment stage (currently delivery)"
        );
    }
}
