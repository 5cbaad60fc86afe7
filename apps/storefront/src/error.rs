//! # API Error Type
//!
//! Unified error type for storefront commands and routes.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  Browser                     Rust Backend                               │
//! │  ───────                     ────────────                               │
//! │                                                                         │
//! │  POST /api/checkout/advance                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ──── DbError::QueryFailed("...") ──┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Checkout Error? ──── CheckoutError::InvalidCustomer ─ ApiError ►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Payment Error? ───── PaymentError::Rejected("...") ─┘           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄──── 422 {"code":"CHECKOUT_ERROR","message":"...","fields":[...]}    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL errors, HTTP client errors) are logged and replaced
//! with a generic message before they reach the browser.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::state::ConfigError;
use layerline_core::{CheckoutError, CoreError, SelectionError, ValidationError};
use layerline_db::DbError;
use layerline_payments::PaymentError;

/// API error returned from commands.
///
/// ## Serialization
/// This is what the browser receives when a command fails:
/// ```json
/// {
///   "code": "CHECKOUT_ERROR",
///   "message": "Check the highlighted fields (1 issue(s))",
///   "fields": [{ "field": "email", "message": "email is required" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-field problems for inline form errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Error codes for API responses.
///
/// ## Usage in Frontend
/// ```typescript
/// const res = await fetch('/api/cart/items', { method: 'POST', body });
/// if (!res.ok) {
///   const e = await res.json();
///   switch (e.code) {
///     case 'INSUFFICIENT_STOCK':
///       toast(e.message);
///       break;
///     case 'SELECTION_ERROR':
///       highlightPicker(e.message);
///       break;
///     default:
///       toast('Something went wrong');
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,

    /// Cart operation refused (409)
    CartError,

    /// Insufficient stock (409)
    InsufficientStock,

    /// Variant selection incomplete or invalid (422)
    SelectionError,

    /// Checkout gate refused (422)
    CheckoutError,

    /// No checkout open (409)
    NoCheckout,

    /// Payment collaborator failed (502)
    PaymentError,

    /// A submission is already running (409)
    SubmissionInProgress,

    /// Configuration problem (500)
    ConfigError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::DatabaseError | ErrorCode::Internal | ErrorCode::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::CartError
            | ErrorCode::InsufficientStock
            | ErrorCode::NoCheckout
            | ErrorCode::SubmissionInProgress => StatusCode::CONFLICT,
            ErrorCode::SelectionError | ErrorCode::CheckoutError => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::PaymentError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Creates a cart error.
    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }

    pub fn no_checkout() -> Self {
        ApiError::new(ErrorCode::NoCheckout, "No checkout in progress")
    }

    pub fn submission_in_progress() -> Self {
        ApiError::new(
            ErrorCode::SubmissionInProgress,
            "Your payment is already being processed",
        )
    }

    pub fn with_fields(mut self, fields: Vec<FieldError>) -> Self {
        self.fields = fields;
        self
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InvalidData { entity, id, reason } => {
                error!(entity = %entity, id = %id, reason = %reason, "Stored record is corrupt");
                ApiError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            err @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::Validation(e) => {
                let field = FieldError::from(&e);
                ApiError::validation(e.to_string()).with_fields(vec![field])
            }
            CoreError::Selection(e) => e.into(),
            CoreError::Checkout(e) => e.into(),
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        let code = match err {
            SelectionError::OutOfStock { .. } => ErrorCode::InsufficientStock,
            _ => ErrorCode::SelectionError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::InvalidCustomer(errors) => ApiError::new(ErrorCode::CheckoutError, message)
                .with_fields(errors.iter().map(FieldError::from).collect()),
            CheckoutError::EmptyCart => ApiError::cart(message),
            _ => ApiError::new(ErrorCode::CheckoutError, message),
        }
    }
}

/// Collaborator failures surface the service's reason when it gave one.
impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        warn!(error = %err, "Payment collaborator failed");
        match err {
            PaymentError::InvalidConfig(_) => {
                ApiError::new(ErrorCode::ConfigError, "Payments are not configured")
            }
            PaymentError::InvalidProof(_) => {
                ApiError::new(ErrorCode::CheckoutError, err.user_message())
            }
            _ => ApiError::new(ErrorCode::PaymentError, err.user_message()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        error!("Configuration error: {}", err);
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_customer_lists_fields() {
        let err: ApiError = CheckoutError::InvalidCustomer(vec![
            ValidationError::Required {
                field: "email".into(),
            },
            ValidationError::Required {
                field: "phone".into(),
            },
        ])
        .into();

        assert_eq!(err.code, ErrorCode::CheckoutError);
        assert_eq!(err.fields.len(), 2);
        assert_eq!(err.fields[0].field, "email");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CHECKOUT_ERROR");
        assert_eq!(json["fields"][1]["field"], "phone");
    }

    #[test]
    fn test_fields_omitted_when_empty() {
        let json = serde_json::to_value(ApiError::no_checkout()).unwrap();
        assert_eq!(json["code"], "NO_CHECKOUT");
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_payment_error_uses_reason() {
        let err: ApiError = PaymentError::Rejected("Card declined".into()).into();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(err.message, "Card declined");
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_db_errors_hide_details() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEC"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InsufficientStock.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::SelectionError.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
