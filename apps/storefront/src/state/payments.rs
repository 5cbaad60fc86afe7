//! # Payments State
//!
//! The two payment collaborators, held as trait objects so tests can swap in
//! `mockall` mocks.

use std::sync::Arc;

use layerline_payments::{
    HttpPaymentGateway, HttpTransferProofService, PaymentGateway, PaymentResult, PaymentsClient,
    PaymentsConfig, TransferProofService,
};

pub struct PaymentsState {
    gateway: Arc<dyn PaymentGateway>,
    transfer: Arc<dyn TransferProofService>,
}

impl PaymentsState {
    pub fn new(gateway: Arc<dyn PaymentGateway>, transfer: Arc<dyn TransferProofService>) -> Self {
        PaymentsState { gateway, transfer }
    }

    /// Builds the HTTP adapters over one shared client.
    pub fn from_config(config: &PaymentsConfig) -> PaymentResult<Self> {
        let client = PaymentsClient::new(config)?;
        Ok(PaymentsState::new(
            Arc::new(HttpPaymentGateway::new(client.clone())),
            Arc::new(HttpTransferProofService::new(client)),
        ))
    }

    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    pub fn transfer(&self) -> &dyn TransferProofService {
        self.transfer.as_ref()
    }
}

impl std::fmt::Debug for PaymentsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsState").finish_non_exhaustive()
    }
}
