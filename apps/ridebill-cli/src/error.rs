//! # Application Error Type
//!
//! Unified error type for CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in RideBill                               │
//! │                                                                         │
//! │  ridebill bill create ...                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, AppError>                                             │  │
//! │  │         │                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ───┐           │  │
//! │  │  Business Error? ─── CoreError::BillLocked ─────────┼─ AppError │  │
//! │  │  Bad Config?     ─── ConfigError::InvalidValue ─────┘           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stderr: {"code":"NOT_FOUND","message":"Client not found: c-1"}        │
//! │  exit status: AppError::exit_code()                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::config::ConfigError;
use ridebill_core::{CoreError, ValidationError};
use ridebill_db::{BillingError, DbError};

/// Error returned from CLI commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "ALREADY_BILLED",
///   "message": "Transfer 7d0c... is already billed"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code for scripting
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Client, transfer or bill not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Transfer already belongs to a bill
    AlreadyBilled,

    /// Bill lifecycle rule violated
    BusinessLogic,

    /// Database operation failed
    DatabaseError,

    /// Configuration could not be loaded
    ConfigError,

    /// Output could not be written
    IoError,

    /// Internal error
    Internal,
}

impl AppError {
    /// Creates a new application error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a business rule error.
    pub fn business(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::BusinessLogic, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            ErrorCode::NotFound => 3,
            ErrorCode::ValidationError | ErrorCode::ConfigError => 2,
            ErrorCode::AlreadyBilled | ErrorCode::BusinessLogic => 4,
            ErrorCode::DatabaseError | ErrorCode::IoError | ErrorCode::Internal => 1,
        }
    }
}

/// Converts database errors to application errors.
impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => AppError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::TransferClaimed { transfer_id } => AppError::new(
                ErrorCode::AlreadyBilled,
                format!("Transfer {} is already billed", transfer_id),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                AppError::validation("Invalid reference, or the record is still in use")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            err @ DbError::CorruptRow { .. } => {
                tracing::error!("{}", err);
                AppError::new(ErrorCode::DatabaseError, err.to_string())
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to application errors.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => AppError::not_found(entity, &id),
            err @ CoreError::TransferAlreadyBilled { .. } => {
                AppError::new(ErrorCode::AlreadyBilled, err.to_string())
            }
            err @ (CoreError::InvalidStatusTransition { .. } | CoreError::BillLocked { .. }) => {
                AppError::business(err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Core(e) => e.into(),
            BillingError::Persistence(e) => e.into(),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::new(ErrorCode::IoError, err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::new(ErrorCode::IoError, format!("CSV export failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::internal(format!("Could not render output: {}", err))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;
    use ridebill_core::BillStatus;

    #[test]
    fn test_billing_errors_keep_their_meaning() {
        let err: AppError = BillingError::from(DbError::TransferClaimed {
            transfer_id: "t-1".into(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::AlreadyBilled);

        let err: AppError = BillingError::Core(CoreError::BillLocked {
            bill_id: "b-1".into(),
            status: BillStatus::Paid,
        })
        .into();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert_eq!(err.message, "Bill b-1 is paid and cannot be modified");
    }

    #[test]
    fn test_not_found_and_validation() {
        let err: AppError = CoreError::not_found("Client", "c-9").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Client not found: c-9");
        assert_eq!(err.exit_code(), 3);

        let err: AppError = ValidationError::Required {
            field: "hours".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let err = AppError::not_found("Bill", "b-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Bill not found: b-1");
    }
}
