//! # Error Types
//!
//! Domain-specific error types for ridebill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ridebill-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations, missing entities     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ridebill-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── BillingError     - Core or persistence failure of a workflow      │
//! │                                                                         │
//! │  ridebill-cli errors                                                   │
//! │  └── AppError         - What the user sees (code + message)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BillingError → AppError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::BillStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced client, transfer or bill does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The transfer is already part of an invoice.
    ///
    /// ## When This Occurs
    /// - Selecting a transfer that another bill already claimed
    /// - Two billing flows racing for the same transfer (the loser gets this)
    #[error("Transfer {transfer_id} is already billed")]
    TransferAlreadyBilled { transfer_id: String },

    /// The requested status change is not an edge of the bill state machine.
    #[error("Bill {bill_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        bill_id: String,
        from: BillStatus,
        to: BillStatus,
    },

    /// Paid and cancelled bills no longer accept transfer changes.
    #[error("Bill {bill_id} is {status} and cannot be modified")]
    BillLocked { bill_id: String, status: BillStatus },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for the given entity kind.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These abort the specific computation and surface to the caller; pricing
/// never silently defaults a malformed transfer to zero.
#[derive(Debug, Error, PartialEq, Eq)]
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

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid email, malformed decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// An amount derived from this field no longer fits in a decimal.
    #[error("{field} is too large to compute")]
    Overflow { field: String },

    /// Field only makes sense for another configuration.
    #[error("{field} is not allowed: {reason}")]
    NotAllowed { field: String, reason: String },
}

impl ValidationError {
    pub fn overflow(field: &str) -> Self {
        ValidationError::Overflow {
            field: field.to_string(),
        }
    }
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
        let err = CoreError::not_found("Client", "c-42");
        assert_eq!(err.to_string(), "Client not found: c-42");

        let err = CoreError::InvalidStatusTransition {
            bill_id: "b-1".to_string(),
            from: BillStatus::Paid,
            to: BillStatus::Draft,
        };
        assert_eq!(err.to_string(), "Bill b-1 cannot move from paid to draft");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "hours".to_string(),
        };
        assert_eq!(err.to_string(), "hours is required");

        let err = ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        };
        assert_eq!(err.to_string(), "price must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "hours".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
