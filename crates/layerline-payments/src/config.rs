//! # Payments Configuration
//!
//! Where the hosted payment functions and the proof bucket live.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  functions_url/create-preference        POST  PreferenceRequest        │
//! │  functions_url/create-pending-payment   POST  PendingPaymentRequest    │
//! │  storage_url/object/<bucket>/<name>     POST  proof bytes              │
//! │  storage_url/object/public/<bucket>/<name>    public read URL          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use secrecy::SecretString;

use crate::error::{PaymentError, PaymentResult};

/// Connection settings for the payment collaborators.
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Base URL of the hosted functions.
    pub functions_url: String,

    /// Base URL of the object store.
    pub storage_url: String,

    /// Bucket transfer proofs are uploaded to.
    pub proof_bucket: String,

    /// Sent as a bearer token and `apikey` header when present.
    pub api_key: Option<SecretString>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl PaymentsConfig {
    pub fn new(functions_url: impl Into<String>, storage_url: impl Into<String>) -> Self {
        PaymentsConfig {
            functions_url: functions_url.into(),
            storage_url: storage_url.into(),
            proof_bucket: "payment-proofs".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn proof_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.proof_bucket = bucket.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks both base URLs are absolute http(s) URLs and the bucket is set.
    pub fn validate(&self) -> PaymentResult<()> {
        check_base_url("functions_url", &self.functions_url)?;
        check_base_url("storage_url", &self.storage_url)?;

        if self.proof_bucket.trim().is_empty() {
            return Err(PaymentError::InvalidConfig(
                "proof_bucket must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_base_url(field: &str, value: &str) -> PaymentResult<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| PaymentError::InvalidConfig(format!("{} '{}': {}", field, value, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PaymentError::InvalidConfig(format!(
            "{} must use http or https, not {}",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_urls() {
        let config = PaymentsConfig::new("https://fn.example.com", "https://files.example.com");
        assert!(config.validate().is_ok());

        let config = PaymentsConfig::new("ftp://fn.example.com", "https://files.example.com");
        assert!(matches!(config.validate(), Err(PaymentError::InvalidConfig(_))));

        let config = PaymentsConfig::new("not a url", "https://files.example.com");
        assert!(config.validate().is_err());

        let config = PaymentsConfig::new("http://localhost:54321", "http://localhost:54321")
            .proof_bucket(" ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = PaymentsConfig::new("https://a.test", "https://b.test").api_key("sk_live_123");
        assert!(!format!("{:?}", config).contains("sk_live_123"));
    }
}
