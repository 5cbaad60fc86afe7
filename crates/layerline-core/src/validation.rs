//! # Validation Module
//!
//! Field validators for the checkout customer form and the store settings.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront UI                                                │
//! │  ├── Inline hints while typing                                         │
//! │  └── Never trusted                                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Storefront command (Rust)                                    │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: per-field rules, collected by the form gate          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Payment functions                                            │
//! │  └── Reject anything they cannot bill                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator returns the trimmed value on success, so the form gate can
//! store exactly what it checked.
//!
//! ## Usage
//! ```rust
//! use layerline_core::validation::{validate_email, validate_social_handle};
//!
//! assert_eq!(validate_email("  ana@example.com ").unwrap(), "ana@example.com");
//! assert_eq!(validate_social_handle("@ana.prints").unwrap(), "ana.prints");
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted free-text field (names, street, city, province).
pub const MAX_TEXT_LEN: usize = 120;

/// Longest accepted social handle, without the leading `@`.
pub const MAX_HANDLE_LEN: usize = 50;

/// Longest accepted postal code.
pub const MAX_POSTAL_CODE_LEN: usize = 10;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_TEXT_LEN`] characters
///
/// ## Example
/// ```rust
/// use layerline_core::validation::validate_required;
///
/// assert_eq!(validate_required("city", " Rosario ").unwrap(), "Rosario");
/// assert!(validate_required("city", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates an email address.
///
/// ## Rules
/// - Required
/// - Exactly one `@` with a non-empty local part
/// - Domain has a dot, with no empty labels (`a@b..com` fails)
/// - No whitespace anywhere
///
/// This is a shape check, not deliverability. The payment gateway sends its
/// receipt to this address, so obviously broken input is caught here.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_required("email", email)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("must contain @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@example.com"));
    }

    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(invalid("must have a valid domain"));
    }

    Ok(email)
}

/// Validates a phone number.
///
/// ## Rules
/// - Required
/// - Only digits, spaces and `+ - ( )`
/// - Between 6 and 20 digits
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = validate_required("phone", phone)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, -, ( and )".to_string(),
        });
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(6..=20).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "phone digits".to_string(),
            min: 6,
            max: 20,
        });
    }

    Ok(phone)
}

/// Validates a social media handle, dropping a leading `@`.
///
/// ## Rules
/// - Required
/// - Letters, digits, `.` and `_` only
/// - At most [`MAX_HANDLE_LEN`] characters
///
/// ## Example
/// ```rust
/// use layerline_core::validation::validate_social_handle;
///
/// assert_eq!(validate_social_handle("@maker_3d").unwrap(), "maker_3d");
/// assert!(validate_social_handle("@").is_err());
/// assert!(validate_social_handle("two words").is_err());
/// ```
pub fn validate_social_handle(handle: &str) -> ValidationResult<String> {
    let handle = handle.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);

    if handle.is_empty() {
        return Err(ValidationError::Required {
            field: "social handle".to_string(),
        });
    }

    if handle.chars().count() > MAX_HANDLE_LEN {
        return Err(ValidationError::TooLong {
            field: "social handle".to_string(),
            max: MAX_HANDLE_LEN,
        });
    }

    if !handle
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "social handle".to_string(),
            reason: "must contain only letters, numbers, dots and underscores".to_string(),
        });
    }

    Ok(handle.to_string())
}

/// Validates a postal code.
///
/// ## Rules
/// - Required
/// - Letters, digits, spaces and hyphens
/// - At most [`MAX_POSTAL_CODE_LEN`] characters
pub fn validate_postal_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "postal code".to_string(),
        });
    }

    if code.chars().count() > MAX_POSTAL_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "postal code".to_string(),
            max: MAX_POSTAL_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "postal code".to_string(),
            reason: "must contain only letters, numbers, spaces and hyphens".to_string(),
        });
    }

    Ok(code.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a checkout adjustment rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
