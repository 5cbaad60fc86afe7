//! # Payment Errors
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reqwest::Error ───────────► PaymentError::Http                        │
//! │  non-2xx response ─────────► PaymentError::Api { status, message }     │
//! │  2xx with success=false ───► PaymentError::Rejected                    │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                           user_message()                                │
//! │              collaborator's reason, else a generic fallback            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Shown when a collaborator gives no usable reason.
pub const GENERIC_FAILURE: &str = "We couldn't process the payment. Please try again.";

#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status. `message` is the reason the service gave, or
    /// empty when the body carried none.
    #[error("API error: {status} {message}")]
    Api { status: u16, message: String },

    /// The service answered but refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Missing or invalid API key.
    #[error("Unauthorized: check the payments API key")]
    Unauthorized,

    /// Response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The proof file failed the type/size rules.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    #[error("Invalid payments configuration: {0}")]
    InvalidConfig(String),
}

impl PaymentError {
    /// Message safe to show the buyer.
    pub fn user_message(&self) -> String {
        let reason = match self {
            PaymentError::Api { message, .. } => message.trim(),
            PaymentError::Rejected(message) | PaymentError::InvalidProof(message) => {
                message.trim()
            }
            PaymentError::Http(e) if e.is_timeout() => {
                return "The payment service took too long to respond. Please try again."
                    .to_string()
            }
            _ => "",
        };

        if reason.is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            reason.to_string()
        }
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;
