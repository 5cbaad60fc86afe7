//! # layerline-payments: Payment Collaborators for Layerline
//!
//! The two payment rails the checkout can hand an order to, each behind an
//! async trait so the storefront can be tested against generated mocks.
//!
//! ## Rails
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Submission::Gateway(PreferenceRequest)                                 │
//! │       └──► PaymentGateway::create_preference ──► redirect URL          │
//! │                                                                         │
//! │  Submission::Transfer(TransferSubmission)                               │
//! │       ├──► TransferProofService::upload_proof ──► proof URL            │
//! │       └──► TransferProofService::create_pending_payment                │
//! │                                                                         │
//! │  HttpPaymentGateway ─┐                                                  │
//! │                      ├──► PaymentsClient (reqwest, auth headers)       │
//! │  HttpTransferProof ──┘                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Endpoints, bucket, API key, timeout
//! - [`client`] - Shared HTTP client and error body parsing
//! - [`gateway`] - The redirect rail
//! - [`transfer`] - The bank-transfer rail
//! - [`error`] - `PaymentError` and buyer-facing messages

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod transfer;

pub use client::PaymentsClient;
pub use config::PaymentsConfig;
pub use error::{PaymentError, PaymentResult};
pub use gateway::{HttpPaymentGateway, MockPaymentGateway, PaymentGateway};
pub use transfer::{HttpTransferProofService, MockTransferProofService, TransferProofService};

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;
    use layerline_core::checkout::Customer;

    /// Serves `router` on a loopback port and returns its base URL.
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub fn customer() -> Customer {
        Customer {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+54 11 5555 0000".into(),
            social_handle: "ada.prints".into(),
            address: None,
        }
    }
}
