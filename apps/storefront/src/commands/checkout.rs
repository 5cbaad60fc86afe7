//! # Checkout Commands
//!
//! The checkout modal: stage inputs, transitions and submission to one of
//! the two payment rails.
//!
//! ## Stage Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Flow                                        │
//! │                                                                         │
//! │  open_checkout                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────┐  advance   ┌──────────┐  advance   ┌──────────┐          │
//! │  │ Delivery │──────────► │   Form   │──────────► │ Payment  │          │
//! │  │          │ ◄──────────│          │ ◄──────────│          │          │
//! │  └──────────┘   back     └──────────┘   back     └────┬─────┘          │
//! │  choose_delivery         update_customer              │                 │
//! │                          (stock revalidated           │ choose_payment  │
//! │                           on the way out)             │ attach_proof    │
//! │                                                       ▼                 │
//! │                                               submit_checkout           │
//! │                                ┌──────────────────────┴───────────┐     │
//! │                                ▼                                  ▼     │
//! │                    Gateway: create preference     Transfer: upload proof│
//! │                    → redirect URL                 → pending payment     │
//! │                    → clear cart                   → clear cart          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On any submission failure the cart and the session are left as they
//! were, at the payment stage, so the buyer can retry.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commands::cart::{revalidate_lines, LineSync};
use crate::error::ApiError;
use crate::state::{CartState, CheckoutState, ConfigState, DbState, PaymentsState};
use layerline_core::checkout::CheckoutView;
use layerline_core::payment::{ProofFile, Submission};
use layerline_core::pricing::checkout_subtotal;
use layerline_core::{
    CartLineItem, CheckoutError, CheckoutStage, CheckoutTotals, CustomerForm, DeliveryMethod,
    Money, PaymentMethod,
};
use layerline_payments::PaymentError;

// =============================================================================
// Responses
// =============================================================================

/// Adjusted totals for one rail, with display strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    #[serde(flatten)]
    pub totals: CheckoutTotals,
    pub display_adjustment: String,
    pub display_total: String,
}

/// Checkout modal state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session: CheckoutView,
    pub subtotal: Money,

    /// Gateway first, then transfer.
    pub quote: Vec<QuoteView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub checkout: CheckoutResponse,

    /// Cart lines changed by the stock check before the payment stage.
    pub stock_changes: Vec<LineSync>,
}

/// Where the buyer goes after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SubmitResponse {
    /// Send the browser to the gateway's hosted page.
    Redirect { redirect_url: String, total: Money },

    /// Transfer recorded; the seller confirms it by hand.
    Pending { proof_url: String, amount: Money },
}

// =============================================================================
// Helpers
// =============================================================================

fn cart_items(cart: &CartState) -> Vec<CartLineItem> {
    cart.with_cart(|c| c.items().to_vec())
}

fn checkout_response(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
) -> Result<CheckoutResponse, ApiError> {
    let items = cart_items(cart);
    let (session, quote) = checkout.with_session(|s| (s.view(), s.quote(&items)))?;
    let config = config.get();

    Ok(CheckoutResponse {
        session,
        subtotal: checkout_subtotal(&items),
        quote: quote
            .into_iter()
            .map(|totals| QuoteView {
                display_adjustment: config.format_currency(totals.adjustment),
                display_total: config.format_currency(totals.total),
                totals,
            })
            .collect(),
    })
}

/// Rejects anything but an absolute http(s) URL.
fn redirect_target(raw: &str) -> Result<String, PaymentError> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| PaymentError::Parse(format!("Invalid redirect URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PaymentError::Parse(format!(
            "Redirect URL must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url.into())
}

// =============================================================================
// Session Commands
// =============================================================================

/// Opens the checkout modal at the delivery stage.
pub fn open_checkout(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
) -> Result<CheckoutResponse, ApiError> {
    debug!("open_checkout command");

    if cart.with_cart(|c| c.is_empty()) {
        return Err(CheckoutError::EmptyCart.into());
    }

    checkout.open(config.get().rates())?;
    checkout_response(cart, checkout, config)
}

pub fn get_checkout(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
) -> Result<CheckoutResponse, ApiError> {
    debug!("get_checkout command");
    checkout_response(cart, checkout, config)
}

/// Closes the modal, discarding the session.
pub fn close_checkout(checkout: &CheckoutState) -> Result<bool, ApiError> {
    debug!("close_checkout command");

    if checkout.is_submitting() {
        return Err(ApiError::submission_in_progress());
    }
    Ok(checkout.close())
}

pub fn choose_delivery(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
    method: DeliveryMethod,
) -> Result<CheckoutResponse, ApiError> {
    debug!(method = ?method, "choose_delivery command");

    checkout.with_session_mut(|s| s.choose_delivery(method))??;
    checkout_response(cart, checkout, config)
}

/// Replaces the customer fields. They are checked when leaving the form.
pub fn update_customer(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
    form: CustomerForm,
) -> Result<CheckoutResponse, ApiError> {
    debug!("update_customer command");

    checkout.with_session_mut(|s| s.update_customer(form))??;
    checkout_response(cart, checkout, config)
}

/// Moves one stage forward.
///
/// ## Behavior
/// Leaving the form re-reads every cart line from the catalog first; lines
/// whose stock dropped are clamped or removed before the gate runs, and the
/// changes are returned so the UI can tell the buyer.
pub async fn advance_checkout(
    db: &DbState,
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
) -> Result<AdvanceResponse, ApiError> {
    let stage = checkout.with_session(|s| s.stage())?;
    debug!(stage = %stage, "advance_checkout command");

    let stock_changes = if stage == CheckoutStage::Form {
        revalidate_lines(db, cart).await?
    } else {
        Vec::new()
    };

    let items = cart_items(cart);
    let next = checkout.with_session_mut(|s| s.advance(&items))??;
    info!(stage = %next, "Checkout advanced");

    Ok(AdvanceResponse {
        checkout: checkout_response(cart, checkout, config)?,
        stock_changes,
    })
}

/// Moves one stage back. Leaving payment clears the method and proof.
pub fn back_checkout(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
) -> Result<CheckoutResponse, ApiError> {
    debug!("back_checkout command");

    checkout.with_session_mut(|s| s.back())??;
    checkout_response(cart, checkout, config)
}

pub fn choose_payment_method(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
    method: PaymentMethod,
) -> Result<CheckoutResponse, ApiError> {
    debug!(method = %method, "choose_payment_method command");

    checkout.with_session_mut(|s| s.choose_payment_method(method))??;
    checkout_response(cart, checkout, config)
}

/// Attaches the bank transfer receipt.
///
/// ## Rules
/// - Only with the transfer method chosen
/// - An image or PDF, not empty, at most 5 MiB
pub fn attach_proof(
    cart: &CartState,
    checkout: &CheckoutState,
    config: &ConfigState,
    proof: ProofFile,
) -> Result<CheckoutResponse, ApiError> {
    debug!(proof = ?proof, "attach_proof command");

    checkout.with_session_mut(|s| s.attach_proof(proof))??;
    checkout_response(cart, checkout, config)
}

// =============================================================================
// Submission
// =============================================================================

/// Submits the checkout to the chosen rail.
///
/// ## Gateway
/// ```text
/// prepare_submission ──► create_preference ──► valid http(s) redirect?
///                              │ error                 │ yes
///                              ▼                       ▼
///                        cart untouched          clear cart, close session
/// ```
///
/// ## Transfer
/// ```text
/// prepare_submission ──► upload_proof ──► create_pending_payment ──► clear cart
///                            │ error            │ error                close session
///                            ▼                  ▼
///                      cart untouched     cart untouched
/// ```
///
/// Only one submission runs at a time; a second one gets
/// `SUBMISSION_IN_PROGRESS`.
/// The cart is held for the duration, so buyer edits made while the payment
/// call is in flight get the same error instead of being wiped by the clear.
pub async fn submit_checkout(
    cart: &CartState,
    checkout: &CheckoutState,
    payments: &PaymentsState,
) -> Result<SubmitResponse, ApiError> {
    debug!("submit_checkout command");

    let _guard = checkout.begin_submission()?;
    let _hold = cart.hold();
    let items = cart_items(cart);
    let submission = checkout.with_session(|s| s.prepare_submission(&items))??;

    let response = match submission {
        Submission::Gateway(request) => {
            let preference = payments
                .gateway()
                .create_preference(&request)
                .await
                .inspect_err(|e| warn!(error = %e, "Gateway preference failed"))?;
            let redirect_url = redirect_target(&preference.redirect_url)?;

            info!(
                total = %request.total,
                preference_id = ?preference.preference_id,
                "Gateway checkout created"
            );
            SubmitResponse::Redirect {
                redirect_url,
                total: request.total,
            }
        }
        Submission::Transfer(transfer) => {
            let uploaded = payments
                .transfer()
                .upload_proof(&transfer.proof)
                .await
                .inspect_err(|e| warn!(error = %e, "Proof upload failed"))?;

            let pending = transfer.pending_request(uploaded.url.clone());
            payments
                .transfer()
                .create_pending_payment(&pending)
                .await
                .inspect_err(|e| warn!(error = %e, "Pending payment failed"))?;

            info!(amount = %pending.amount, "Transfer payment pending");
            SubmitResponse::Pending {
                proof_url: uploaded.url,
                amount: pending.amount,
            }
        }
    };

    cart.with_cart_mut(|c| c.clear());
    checkout.close();
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::commands::cart::{
        add_to_cart, clear_cart, get_cart, update_cart_item, AddToCartRequest,
    };
    use crate::error::ErrorCode;
    use crate::test_support;
    use layerline_core::payment::{PreferenceResponse, UploadedProof};
    use layerline_payments::{MockPaymentGateway, MockTransferProofService};

    struct Fixture {
        db: DbState,
        cart: CartState,
        checkout: CheckoutState,
        config: ConfigState,
    }

    async fn fixture() -> Fixture {
        let fixture = Fixture {
            db: test_support::db_state().await,
            cart: test_support::cart_state(),
            checkout: CheckoutState::new(),
            config: test_support::config_state(),
        };

        // 2 × 800 = 1600
        let request = AddToCartRequest {
            product_id: "marble-planter".into(),
            quantity: 2,
            color: None,
            image_index: None,
            sections: Vec::new(),
            accessories: Vec::new(),
        };
        add_to_cart(&fixture.db, &fixture.cart, request).await.unwrap();
        fixture
    }

    /// Walks the session to the payment stage with `method` chosen.
    async fn at_payment(f: &Fixture, method: PaymentMethod) {
        open_checkout(&f.cart, &f.checkout, &f.config).unwrap();
        choose_delivery(&f.cart, &f.checkout, &f.config, DeliveryMethod::Pickup).unwrap();
        advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap();
        update_customer(&f.cart, &f.checkout, &f.config, test_support::customer_form()).unwrap();
        advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap();
        choose_payment_method(&f.cart, &f.checkout, &f.config, method).unwrap();
    }

    fn receipt() -> ProofFile {
        ProofFile::new("receipt.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    fn payments(gateway: MockPaymentGateway, transfer: MockTransferProofService) -> PaymentsState {
        PaymentsState::new(Arc::new(gateway), Arc::new(transfer))
    }

    #[tokio::test]
    async fn test_open_requires_items() {
        let f = fixture().await;
        f.cart.with_cart_mut(|c| c.clear());

        let err = open_checkout(&f.cart, &f.checkout, &f.config).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
        assert!(!f.checkout.is_open());
    }

    #[tokio::test]
    async fn test_quote_shows_both_rails() {
        let f = fixture().await;
        let response = open_checkout(&f.cart, &f.checkout, &f.config).unwrap();

        assert_eq!(response.session.stage, CheckoutStage::Delivery);
        assert_eq!(response.subtotal.cents(), 1600);
        assert_eq!(response.quote[0].totals.method, PaymentMethod::Gateway);
        assert_eq!(response.quote[0].totals.total.cents(), 1760);
        assert_eq!(response.quote[0].display_total, "$17.60");
        assert_eq!(response.quote[1].totals.total.cents(), 1520);
        assert_eq!(response.quote[1].display_adjustment, "-$0.80");
    }

    #[tokio::test]
    async fn test_cannot_skip_or_pass_invalid_form() {
        let f = fixture().await;
        open_checkout(&f.cart, &f.checkout, &f.config).unwrap();

        let err = advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckoutError);

        choose_delivery(&f.cart, &f.checkout, &f.config, DeliveryMethod::Shipping).unwrap();
        advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap();

        // pickup-only fields; shipping also needs an address
        update_customer(&f.cart, &f.checkout, &f.config, test_support::customer_form()).unwrap();
        let err = advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckoutError);
        let fields: Vec<&str> = err.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["street", "city", "postal code", "province"]);

        let stage = f.checkout.with_session(|s| s.stage()).unwrap();
        assert_eq!(stage, CheckoutStage::Form);
    }

    #[tokio::test]
    async fn test_leaving_form_revalidates_stock() {
        let f = fixture().await;
        open_checkout(&f.cart, &f.checkout, &f.config).unwrap();
        choose_delivery(&f.cart, &f.checkout, &f.config, DeliveryMethod::Pickup).unwrap();
        advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap();
        update_customer(&f.cart, &f.checkout, &f.config, test_support::customer_form()).unwrap();

        f.db.inner().products().set_stock("marble-planter", 1).await.unwrap();

        let advanced = advance_checkout(&f.db, &f.cart, &f.checkout, &f.config)
            .await
            .unwrap();
        assert_eq!(advanced.checkout.session.stage, CheckoutStage::Payment);
        assert_eq!(advanced.stock_changes.len(), 1);
        assert_eq!(advanced.checkout.subtotal.cents(), 800);
    }

    #[tokio::test]
    async fn test_back_from_payment_clears_method() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Transfer).await;
        attach_proof(&f.cart, &f.checkout, &f.config, receipt()).unwrap();

        let response = back_checkout(&f.cart, &f.checkout, &f.config).unwrap();
        assert_eq!(response.session.stage, CheckoutStage::Form);
        assert_eq!(response.session.payment_method, None);
        assert!(response.session.proof.is_none());
    }

    #[tokio::test]
    async fn test_proof_rules() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Gateway).await;

        let err = attach_proof(&f.cart, &f.checkout, &f.config, receipt()).unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckoutError);

        choose_payment_method(&f.cart, &f.checkout, &f.config, PaymentMethod::Transfer).unwrap();
        let text = ProofFile::new("notes.txt", "text/plain", b"hi".to_vec());
        assert!(attach_proof(&f.cart, &f.checkout, &f.config, text).is_err());

        let response = attach_proof(&f.cart, &f.checkout, &f.config, receipt()).unwrap();
        assert_eq!(response.session.proof.unwrap().file_name, "receipt.png");
    }

    #[tokio::test]
    async fn test_gateway_success_clears_cart() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Gateway).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_preference()
            .once()
            .withf(|req| req.total.cents() == 1760 && req.items.len() == 1)
            .return_once(|_| {
                Ok(PreferenceResponse {
                    redirect_url: "https://pay.example.com/checkout/abc".into(),
                    preference_id: Some("abc".into()),
                })
            });
        let payments = payments(gateway, MockTransferProofService::new());

        let response = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap();
        assert_eq!(
            response,
            SubmitResponse::Redirect {
                redirect_url: "https://pay.example.com/checkout/abc".into(),
                total: Money::from_cents(1760),
            }
        );
        assert!(get_cart(&f.cart).items.is_empty());
        assert!(!f.checkout.is_open());
        assert!(!f.checkout.is_submitting());
    }

    #[tokio::test]
    async fn test_cart_edits_refused_while_submitting() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Gateway).await;
        let cart = Arc::new(f.cart);

        let during = cart.clone();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_preference().once().return_once(move |_| {
            let err = update_cart_item(&during, "marble-planter", 1).unwrap_err();
            assert_eq!(err.code, ErrorCode::SubmissionInProgress);
            assert!(clear_cart(&during).is_err());
            Err(PaymentError::Rejected("Card declined".into()))
        });
        let payments = payments(gateway, MockTransferProofService::new());

        submit_checkout(&cart, &f.checkout, &payments)
            .await
            .unwrap_err();

        // the failed attempt released the cart with its lines intact
        assert_eq!(get_cart(&cart).total_items, 2);
        let view = update_cart_item(&cart, "marble-planter", 1).unwrap();
        assert_eq!(view.total_items, 1);
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_cart_and_stage() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Gateway).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_preference()
            .once()
            .return_once(|_| Err(PaymentError::Rejected("Card declined".into())));
        let payments = payments(gateway, MockTransferProofService::new());

        let err = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(err.message, "Card declined");

        assert_eq!(get_cart(&f.cart).total_items, 2);
        let stage = f.checkout.with_session(|s| s.stage()).unwrap();
        assert_eq!(stage, CheckoutStage::Payment);
        assert!(!f.checkout.is_submitting());
    }

    #[tokio::test]
    async fn test_gateway_bad_redirect_keeps_cart() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Gateway).await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_preference().once().return_once(|_| {
            Ok(PreferenceResponse {
                redirect_url: "javascript:alert(1)".into(),
                preference_id: None,
            })
        });
        let payments = payments(gateway, MockTransferProofService::new());

        let err = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(get_cart(&f.cart).total_items, 2);
    }

    #[tokio::test]
    async fn test_transfer_uploads_then_records_pending() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Transfer).await;
        attach_proof(&f.cart, &f.checkout, &f.config, receipt()).unwrap();

        let mut transfer = MockTransferProofService::new();
        let mut seq = mockall::Sequence::new();
        transfer
            .expect_upload_proof()
            .once()
            .in_sequence(&mut seq)
            .withf(|proof| proof.file_name == "receipt.png")
            .return_once(|_| {
                Ok(UploadedProof {
                    url: "https://files.example.com/proofs/1-receipt.png".into(),
                })
            });
        transfer
            .expect_create_pending_payment()
            .once()
            .in_sequence(&mut seq)
            .withf(|req| {
                req.amount.cents() == 1520
                    && req.proof_url == "https://files.example.com/proofs/1-receipt.png"
                    && req.metadata.adjustment.cents() == -80
            })
            .return_once(|_| Ok(()));
        let payments = payments(MockPaymentGateway::new(), transfer);

        let response = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap();
        assert_eq!(
            response,
            SubmitResponse::Pending {
                proof_url: "https://files.example.com/proofs/1-receipt.png".into(),
                amount: Money::from_cents(1520),
            }
        );
        assert!(get_cart(&f.cart).items.is_empty());
        assert!(!f.checkout.is_open());
    }

    #[tokio::test]
    async fn test_transfer_upload_failure_skips_pending() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Transfer).await;
        attach_proof(&f.cart, &f.checkout, &f.config, receipt()).unwrap();

        let mut transfer = MockTransferProofService::new();
        transfer.expect_upload_proof().once().return_once(|_| {
            Err(PaymentError::Api {
                status: 500,
                message: String::new(),
            })
        });
        transfer.expect_create_pending_payment().never();
        let payments = payments(MockPaymentGateway::new(), transfer);

        let err = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap_err();
        assert_eq!(err.message, layerline_payments::error::GENERIC_FAILURE);
        assert_eq!(get_cart(&f.cart).total_items, 2);
        assert!(f.checkout.is_open());
    }

    #[tokio::test]
    async fn test_transfer_without_proof_is_refused() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Transfer).await;

        let payments = payments(MockPaymentGateway::new(), MockTransferProofService::new());
        let err = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckoutError);
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected() {
        let f = fixture().await;
        at_payment(&f, PaymentMethod::Gateway).await;

        let _running = f.checkout.begin_submission().unwrap();
        let payments = payments(MockPaymentGateway::new(), MockTransferProofService::new());

        let err = submit_checkout(&f.cart, &f.checkout, &payments)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubmissionInProgress);
        assert!(close_checkout(&f.checkout).is_err());
        assert_eq!(get_cart(&f.cart).total_items, 2);
    }

    #[test]
    fn test_redirect_target() {
        assert_eq!(
            redirect_target(" https://pay.example.com/x ").unwrap(),
            "https://pay.example.com/x"
        );
        assert!(redirect_target("").is_err());
        assert!(redirect_target("/relative").is_err());
        assert!(redirect_target("ftp://pay.example.com").is_err());
    }
}
