//! # Payments HTTP Client
//!
//! One `reqwest::Client` shared by the gateway and transfer adapters, with
//! the auth headers and timeout applied once.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PaymentsConfig;
use crate::error::{PaymentError, PaymentResult};

/// Longest plain-text error body passed through as a reason.
const MAX_TEXT_REASON: usize = 200;

/// HTTP client for the hosted payment functions and object store.
#[derive(Clone)]
pub struct PaymentsClient {
    inner: Arc<PaymentsClientInner>,
}

struct PaymentsClientInner {
    client: reqwest::Client,
    functions_url: String,
    storage_url: String,
    proof_bucket: String,
}

impl PaymentsClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// fails to build.
    pub fn new(config: &PaymentsConfig) -> PaymentResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let key = key.expose_secret();
            let bearer = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| PaymentError::InvalidConfig(format!("Invalid API key format: {e}")))?;
            let raw = HeaderValue::from_str(key)
                .map_err(|e| PaymentError::InvalidConfig(format!("Invalid API key format: {e}")))?;
            headers.insert(AUTHORIZATION, bearer);
            headers.insert("apikey", raw);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(PaymentsClient {
            inner: Arc::new(PaymentsClientInner {
                client,
                functions_url: config.functions_url.trim_end_matches('/').to_string(),
                storage_url: config.storage_url.trim_end_matches('/').to_string(),
                proof_bucket: config.proof_bucket.clone(),
            }),
        })
    }

    /// Calls a hosted function with a JSON body and decodes the JSON reply.
    pub(crate) async fn call_function<T, B>(&self, name: &str, body: &B) -> PaymentResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = format!("{}/{}", self.inner.functions_url, name);
        debug!(function = %name, "Calling payment function");

        let response = self.inner.client.post(&url).json(body).send().await?;
        let value = self.handle_response(response).await?;
        reject_if_failed(&value)?;

        serde_json::from_value(value)
            .map_err(|e| PaymentError::Parse(format!("Unexpected {} response: {e}", name)))
    }

    /// Uploads an object to the proof bucket and returns its public URL.
    pub(crate) async fn upload_object(
        &self,
        object_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PaymentResult<String> {
        let inner = &self.inner;
        let url = format!(
            "{}/object/{}/{}",
            inner.storage_url, inner.proof_bucket, object_name
        );
        debug!(object = %object_name, bytes = data.len(), "Uploading object");

        let response = inner
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }

        Ok(format!(
            "{}/object/public/{}/{}",
            inner.storage_url, inner.proof_bucket, object_name
        ))
    }

    async fn handle_response(&self, response: reqwest::Response) -> PaymentResult<Value> {
        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(format!("Failed to parse response: {e}")))
    }
}

impl std::fmt::Debug for PaymentsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsClient")
            .field("functions_url", &self.inner.functions_url)
            .field("storage_url", &self.inner.storage_url)
            .field("proof_bucket", &self.inner.proof_bucket)
            .finish_non_exhaustive()
    }
}

/// Turns a non-success response into an error carrying the service's
/// reason, when it gave one.
async fn parse_error(response: reqwest::Response) -> PaymentError {
    let status = response.status().as_u16();

    if status == 401 || status == 403 {
        return PaymentError::Unauthorized;
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<Value>(&body) {
        Ok(value) => reason(&value).unwrap_or_default(),
        Err(_) => {
            let text = body.trim();
            if text.len() <= MAX_TEXT_REASON && !text.starts_with('<') {
                text.to_string()
            } else {
                String::new()
            }
        }
    };

    warn!(status, reason = %message, "Payment service returned an error");
    PaymentError::Api { status, message }
}

/// A 2xx reply can still refuse: `{"success": false}` or `{"error": ...}`.
fn reject_if_failed(value: &Value) -> PaymentResult<()> {
    let refused = value.get("success").and_then(Value::as_bool) == Some(false);
    let error = value.get("error").filter(|e| !e.is_null());

    if refused || error.is_some() {
        return Err(PaymentError::Rejected(reason(value).unwrap_or_default()));
    }
    Ok(())
}

/// Extracts `error` (string or `{message}`) or `message` from a JSON body.
fn reason(value: &Value) -> Option<String> {
    let error = value.get("error");
    error
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reason_shapes() {
        assert_eq!(reason(&json!({"error": "nope"})).as_deref(), Some("nope"));
        assert_eq!(
            reason(&json!({"error": {"message": "bad email"}})).as_deref(),
            Some("bad email")
        );
        assert_eq!(reason(&json!({"message": "later"})).as_deref(), Some("later"));
        assert_eq!(reason(&json!({"ok": true})), None);
    }

    #[test]
    fn test_reject_if_failed() {
        assert!(reject_if_failed(&json!({"redirectUrl": "https://pay"})).is_ok());
        assert!(reject_if_failed(&json!({"success": true, "error": null})).is_ok());

        match reject_if_failed(&json!({"success": false, "message": "duplicate"})) {
            Err(PaymentError::Rejected(m)) => assert_eq!(m, "duplicate"),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(reject_if_failed(&json!({"error": "boom"})).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = PaymentsConfig::new("file:///tmp", "https://files.test");
        assert!(matches!(
            PaymentsClient::new(&config),
            Err(PaymentError::InvalidConfig(_))
        ));
    }
}
