//! # Transfer Proof Service
//!
//! The bank-transfer rail: store the buyer's receipt, then record a pending
//! payment pointing at it.
//!
//! ## Ordering
//! ```text
//! upload_proof(file) ──► public URL ──► create_pending_payment({.., proofUrl})
//!        │                                     │
//!        └── failure: nothing recorded         └── failure: the uploaded
//!                                                  object is left behind
//! ```

use async_trait::async_trait;
use mockall::automock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::client::PaymentsClient;
use crate::error::{PaymentError, PaymentResult};
use layerline_core::payment::{proof_object_name, PendingPaymentRequest, ProofFile, UploadedProof};

const CREATE_PENDING_PAYMENT: &str = "create-pending-payment";

#[automock]
#[async_trait]
pub trait TransferProofService: Send + Sync {
    /// Stores the receipt and returns where it can be read.
    async fn upload_proof(&self, proof: &ProofFile) -> PaymentResult<UploadedProof>;

    /// Records the transfer for manual review.
    async fn create_pending_payment(&self, request: &PendingPaymentRequest) -> PaymentResult<()>;
}

/// Transfer rail backed by the object store and the hosted
/// `create-pending-payment` function.
#[derive(Debug, Clone)]
pub struct HttpTransferProofService {
    client: PaymentsClient,
}

impl HttpTransferProofService {
    #[must_use]
    pub fn new(client: PaymentsClient) -> Self {
        HttpTransferProofService { client }
    }
}

#[async_trait]
impl TransferProofService for HttpTransferProofService {
    #[instrument(skip_all, fields(file = %proof.file_name, bytes = proof.data.len()))]
    async fn upload_proof(&self, proof: &ProofFile) -> PaymentResult<UploadedProof> {
        proof.validate().map_err(PaymentError::InvalidProof)?;

        let object_name = proof_object_name(&Uuid::new_v4().to_string(), &proof.file_name);
        let url = self
            .client
            .upload_object(&object_name, &proof.content_type, proof.data.clone())
            .await?;

        info!(object = %object_name, "Transfer proof uploaded");
        Ok(UploadedProof { url })
    }

    #[instrument(skip_all, fields(amount = %request.amount))]
    async fn create_pending_payment(&self, request: &PendingPaymentRequest) -> PaymentResult<()> {
        let _: serde_json::Value = self
            .client
            .call_function(CREATE_PENDING_PAYMENT, request)
            .await?;

        info!("Pending transfer payment recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaymentsConfig;
    use crate::test_support::{customer, serve};
    use axum::body::Bytes;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use layerline_core::money::Money;
    use layerline_core::payment::PaymentMetadata;
    use layerline_core::types::DeliveryMethod;
    use serde_json::{json, Value};

    async fn service(router: Router) -> (HttpTransferProofService, String) {
        let base = serve(router).await;
        let config = PaymentsConfig::new(&base, format!("{}/storage", base)).proof_bucket("proofs-bucket");
        let client = PaymentsClient::new(&config).unwrap();
        (HttpTransferProofService::new(client), base)
    }

    fn pending() -> PendingPaymentRequest {
        PendingPaymentRequest {
            customer: customer(),
            amount: Money::from_cents(950),
            proof_url: "https://files.test/p.png".into(),
            notes: Some("Leave at the door".into()),
            metadata: PaymentMetadata {
                items: Vec::new(),
                delivery_method: DeliveryMethod::Shipping,
                subtotal: Money::from_cents(1000),
                adjustment: Money::from_cents(-50),
            },
        }
    }

    #[tokio::test]
    async fn test_upload_proof_returns_public_url() {
        let router = Router::new().route(
            "/storage/object/{bucket}/{*name}",
            post(
                |Path((bucket, name)): Path<(String, String)>, headers: HeaderMap, body: Bytes| async move {
                    assert_eq!(bucket, "proofs-bucket");
                    assert!(name.starts_with("proofs/"));
                    assert!(name.ends_with("-receipt_1.png"));
                    assert_eq!(headers["content-type"], "image/png");
                    assert_eq!(&body[..], b"png-bytes");
                    Json(json!({"Key": name}))
                },
            ),
        );
        let (service, base) = service(router).await;

        let proof = ProofFile::new("receipt 1.png", "image/png", b"png-bytes".to_vec());
        let uploaded = service.upload_proof(&proof).await.unwrap();

        let prefix = format!("{}/storage/object/public/proofs-bucket/proofs/", base);
        assert!(uploaded.url.starts_with(&prefix), "{}", uploaded.url);
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_proof_before_network() {
        let (service, _) = service(Router::new()).await;

        let proof = ProofFile::new("notes.txt", "text/plain", b"hi".to_vec());
        assert!(matches!(
            service.upload_proof(&proof).await,
            Err(PaymentError::InvalidProof(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let router = Router::new().route(
            "/storage/object/{bucket}/{*name}",
            post(|| async { (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large") }),
        );
        let (service, _) = service(router).await;

        let proof = ProofFile::new("r.pdf", "application/pdf", vec![1, 2, 3]);
        let err = service.upload_proof(&proof).await.unwrap_err();
        assert!(matches!(err, PaymentError::Api { status: 413, .. }));
        assert_eq!(err.user_message(), "Payload too large");
    }

    #[tokio::test]
    async fn test_create_pending_payment() {
        let router = Router::new().route(
            "/create-pending-payment",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["amount"], 950);
                assert_eq!(body["proofUrl"], "https://files.test/p.png");
                assert_eq!(body["metadata"]["deliveryMethod"], "shipping");
                Json(json!({"success": true}))
            }),
        );
        let (service, _) = service(router).await;

        service.create_pending_payment(&pending()).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_pending_payment_refused() {
        let router = Router::new().route(
            "/create-pending-payment",
            post(|| async { Json(json!({"success": false, "error": "Amount mismatch"})) }),
        );
        let (service, _) = service(router).await;

        let err = service.create_pending_payment(&pending()).await.unwrap_err();
        assert_eq!(err.user_message(), "Amount mismatch");
    }
}
