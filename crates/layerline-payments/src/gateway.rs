//! # Payment Gateway
//!
//! Creates a hosted-checkout preference and returns the page the buyer is
//! redirected to. Any non-success answer is a hard failure.

use async_trait::async_trait;
use mockall::automock;
use tracing::{info, instrument};

use crate::client::PaymentsClient;
use crate::error::{PaymentError, PaymentResult};
use layerline_core::payment::{PreferenceRequest, PreferenceResponse};

const CREATE_PREFERENCE: &str = "create-preference";

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers the order with the gateway and returns the redirect URL.
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> PaymentResult<PreferenceResponse>;
}

/// Gateway backed by the hosted `create-preference` function.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: PaymentsClient,
}

impl HttpPaymentGateway {
    #[must_use]
    pub fn new(client: PaymentsClient) -> Self {
        HttpPaymentGateway { client }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip_all, fields(items = request.items.len(), total = %request.total))]
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> PaymentResult<PreferenceResponse> {
        let response: PreferenceResponse =
            self.client.call_function(CREATE_PREFERENCE, request).await?;

        if response.redirect_url.trim().is_empty() {
            return Err(PaymentError::Parse(
                "create-preference returned no redirect URL".to_string(),
            ));
        }

        info!(preference_id = ?response.preference_id, "Payment preference created");
        Ok(response)
    }
}
