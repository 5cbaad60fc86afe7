//! # Error Types
//!
//! Domain-specific error types for layerline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  layerline-core errors (this file)                                     │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures (form fields)        │
//! │  ├── SelectionError   - Incomplete/invalid color & accessory choices   │
//! │  └── CheckoutError    - Stage gate and submission preconditions        │
//! │                                                                         │
//! │  layerline-db errors       → DbError                                   │
//! │  layerline-payments errors → PaymentError                              │
//! │  storefront app            → ApiError (what the UI sees)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Note on the Cart Store
//! Cart mutations never return these errors: a refused add or update is a
//! plain `false`, and the caller turns it into a toast. Errors here describe
//! *why* something cannot proceed, so the UI can point at the right field.

use thiserror::Error;

use crate::checkout::CheckoutStage;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to add or increase a line.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 1, already 3 in cart)
    ///      │
    ///      ▼
    /// CartStore::add_item → false
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Low Poly Fox", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "No more stock of Low Poly Fox"
    /// ```
    #[error("No more stock of {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: u32,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Variant selection is incomplete or invalid.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Checkout cannot proceed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for the checkout customer form, where several fields can fail at once
/// and every one of them is shown inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// The form field this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Selection Error
// =============================================================================

/// Reasons a variant selection cannot be turned into a cart payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// `Default` mode product with colors, but none chosen.
    #[error("Choose a color for {product}")]
    ColorRequired { product: String },

    /// The color is not offered (deleted from the registry or never listed).
    #[error("Color {color} is not available for this product")]
    UnknownColor { color: String },

    /// The color exists but is marked out of stock.
    #[error("Color {color} is out of stock")]
    ColorOutOfStock { color: String },

    /// `Sections` mode product with at least one section left empty.
    #[error("Choose a color for: {}", .missing.join(", "))]
    SectionsIncomplete { missing: Vec<String> },

    /// The section id is not defined on the product.
    #[error("Unknown section: {section_id}")]
    UnknownSection { section_id: String },

    /// The color is not eligible for the section.
    #[error("Color {color_id} cannot be used for {section}")]
    SectionColorNotEligible { section: String, color_id: String },

    /// Accessory requested with a quantity but no color.
    #[error("Choose a color for the accessory {accessory}")]
    AccessoryColorRequired { accessory: String },

    /// The accessory is not offered with this product.
    #[error("Unknown accessory: {name}")]
    UnknownAccessory { name: String },

    /// The product is out of stock entirely.
    #[error("{product} is out of stock")]
    OutOfStock { product: String },
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Why a checkout transition or submission was refused.
///
/// The session never changes stage when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Operation is only valid in another stage.
    #[error("This step is only available at the {expected} stage (currently {actual})")]
    WrongStage {
        expected: CheckoutStage,
        actual: CheckoutStage,
    },

    /// Already at the first stage; nothing to go back to.
    #[error("Already at the first checkout step")]
    AtFirstStage,

    /// Payment is the last stage; only submit moves on from it.
    #[error("Confirm the payment to finish")]
    AtLastStage,

    /// No delivery method chosen.
    #[error("Choose pickup or shipping")]
    DeliveryMethodRequired,

    /// Customer form has invalid fields.
    #[error("Check the highlighted fields ({} issue(s))", .0.len())]
    InvalidCustomer(Vec<ValidationError>),

    /// Cart lines still need a color/section selection.
    #[error("Complete the color selection in your cart for: {}", .products.join(", "))]
    IncompleteSelections { products: Vec<String> },

    /// No payment method chosen.
    #[error("Choose a payment method")]
    PaymentMethodRequired,

    /// Transfer chosen but no proof attached.
    #[error("Attach the transfer receipt before confirming")]
    ProofRequired,

    /// Proof attached while the chosen method does not take one.
    #[error("A receipt can only be attached for bank transfer payments")]
    ProofNotAccepted,

    /// Proof file rejected (type or size).
    #[error("Invalid receipt file: {0}")]
    InvalidProof(String),

    /// Nothing to pay for.
    #[error("Your cart is empty")]
    EmptyCart,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Low Poly Fox".to_string(),
            available: 3,
            requested: 4,
        };
        assert_eq!(
            err.to_string(),
            "No more stock of Low Poly Fox: available 3, requested 4"
        );
    }

    #[test]
    fn test_selection_messages_list_sections() {
        let err = SelectionError::SectionsIncomplete {
            missing: vec!["Roof".to_string(), "Base".to_string()],
        };
        assert_eq!(err.to_string(), "Choose a color for: Roof, Base");
    }

    #[test]
    fn test_incomplete_selection_lists_products() {
        let err = CheckoutError::IncompleteSelections {
            products: vec!["Lamp".to_string(), "House".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Complete the color selection in your cart for: Lamp, House"
        );
    }

    #[test]
    fn test_validation_field_accessor() {
        let err = ValidationError::Required {
            field: "email".to_string(),
        };
        assert_eq!(err.field(), "email");
        assert_eq!(err.to_string(), "email is required");
    }

    #[test]
    fn test_wrapped_errors_convert() {
        let core: CoreError = CheckoutError::EmptyCart.into();
        assert!(matches!(core, CoreError::Checkout(_)));
        assert_eq!(core.to_string(), "Your cart is empty");
    }
}
