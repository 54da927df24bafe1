//! # Validation Module
//!
//! Input validation for clients, transfers and tax settings.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Types and formats (dates, decimals, enums)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rules                                  │
//! │  ├── Required names, non-negative prices                               │
//! │  └── Hours present iff hourly, percentages within 0..=100              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE invoice numbers and billed transfers                       │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ridebill_core::validation::{validate_client_name, validate_hours};
//! use ridebill_core::types::ServiceType;
//!
//! validate_client_name("Hotel Miramar").unwrap();
//! validate_hours(ServiceType::Hourly, Some(4)).unwrap();
//! assert!(validate_hours(ServiceType::Hourly, None).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::{Money, Percent};
use crate::types::{Adjustment, Collaborator, ExtraCharge, NewClient, ServiceType, TransferDraft};
use crate::{MAX_AMOUNT, MAX_SERVICE_HOURS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 2000;
const MAX_PASSENGERS: i64 = 100;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a client name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_client_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LEN)
}

/// Loose email check: one `@` with something on both sides and a dot in
/// the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain.tld".to_string(),
        })
    }
}

/// Validates notes length (notes are optional).
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price or fee: zero is allowed, negatives are not, and
/// nothing above [`MAX_AMOUNT`].
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if price.amount() > Decimal::from(MAX_AMOUNT) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Validates a percentage within 0..=100.
pub fn validate_percentage(field: &str, rate: Percent) -> ValidationResult<()> {
    let value = rate.value();
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Validates a VAT rate in percentage points. Any non-negative rate works
/// in both tax modes.
pub fn validate_tax_rate(rate: Percent) -> ValidationResult<()> {
    if rate.value() < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: "tax_rate".to_string(),
        });
    }
    Ok(())
}

/// Hours must be present and positive iff the service is hourly.
///
/// ## Example
/// ```rust
/// use ridebill_core::validation::validate_hours;
/// use ridebill_core::types::ServiceType;
///
/// assert!(validate_hours(ServiceType::PointToPoint, None).is_ok());
/// assert!(validate_hours(ServiceType::PointToPoint, Some(2)).is_err());
/// assert!(validate_hours(ServiceType::Hourly, Some(0)).is_err());
/// ```
pub fn validate_hours(service_type: ServiceType, hours: Option<i64>) -> ValidationResult<()> {
    match (service_type, hours) {
        (ServiceType::Hourly, None) => Err(ValidationError::Required {
            field: "hours".to_string(),
        }),
        (ServiceType::Hourly, Some(h)) if h <= 0 => Err(ValidationError::MustBePositive {
            field: "hours".to_string(),
        }),
        (ServiceType::Hourly, Some(h)) if h > MAX_SERVICE_HOURS => {
            Err(ValidationError::OutOfRange {
                field: "hours".to_string(),
                min: 1,
                max: MAX_SERVICE_HOURS,
            })
        }
        (ServiceType::PointToPoint, Some(_)) => Err(ValidationError::NotAllowed {
            field: "hours".to_string(),
            reason: "only hourly services are booked by the hour".to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn validate_passengers(passengers: i64) -> ValidationResult<()> {
    if !(1..=MAX_PASSENGERS).contains(&passengers) {
        return Err(ValidationError::OutOfRange {
            field: "passengers".to_string(),
            min: 1,
            max: MAX_PASSENGERS,
        });
    }
    Ok(())
}

/// Validates a discount or commission.
pub fn validate_adjustment(field: &str, adjustment: &Adjustment) -> ValidationResult<()> {
    match adjustment {
        Adjustment::None => Ok(()),
        Adjustment::Percentage(rate) => validate_percentage(field, *rate),
        Adjustment::Fixed(amount) => validate_price(field, *amount),
    }
}

/// Extra-charge rows: a named row must not carry a negative price.
///
/// Blank rows are tolerated; pricing skips them.
pub fn validate_extra_charges(charges: &[ExtraCharge]) -> ValidationResult<()> {
    for charge in charges {
        if charge.name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "extra_charges.name".to_string(),
                max: MAX_NAME_LEN,
            });
        }
        validate_price("extra_charges.price", charge.price)?;
    }
    Ok(())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_client_name(&client.name)?;
    if let Some(email) = client.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    Ok(())
}

/// Validates a transfer before it is stored.
pub fn validate_transfer_draft(draft: &TransferDraft) -> ValidationResult<()> {
    if draft.client_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "client_id".to_string(),
        });
    }
    validate_price("price", draft.price)?;
    validate_hours(draft.service_type, draft.hours)?;
    validate_passengers(draft.passengers)?;
    validate_adjustment("discount", &draft.discount)?;
    validate_adjustment("commission", &draft.commission)?;
    validate_extra_charges(&draft.extra_charges)?;
    if let Some(Collaborator::Partner(name)) = &draft.collaborator {
        validate_text("collaborator", name, MAX_NAME_LEN)?;
    }
    validate_notes(draft.notes.as_deref())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn draft() -> TransferDraft {
        TransferDraft {
            client_id: "c-1".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            pickup_time: None,
            origin: Some("Airport".into()),
            destination: Some("Hotel".into()),
            passengers: 2,
            service_type: ServiceType::PointToPoint,
            price: Money::new(dec!(45)),
            hours: None,
            discount: Adjustment::None,
            extra_charges: vec![],
            commission: Adjustment::None,
            collaborator: None,
            notes: None,
        }
    }

    #[test]
    fn test_validate_client_name() {
        assert!(validate_client_name("Hotel Miramar").is_ok());
        assert!(validate_client_name("   ").is_err());
        assert!(validate_client_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@miramar.es").is_ok());
        assert!(validate_email("ops.miramar.es").is_err());
        assert!(validate_email("ops@localhost").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("price", Money::ZERO).is_ok());
        assert_eq!(
            validate_price("price", Money::new(dec!(-1))),
            Err(ValidationError::MustNotBeNegative {
                field: "price".to_string()
            })
        );
        assert!(validate_price("price", Money::new(Decimal::from(MAX_AMOUNT))).is_ok());
        assert!(validate_price("price", Money::new(dec!(1000000000.01))).is_err());
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let mut hourly = draft();
        hourly.service_type = ServiceType::Hourly;
        hourly.hours = Some(100);
        hourly.price = Money::new(dec!(1000000000000000000000000000));
        assert!(matches!(
            validate_transfer_draft(&hourly),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut extra = draft();
        extra.extra_charges = vec![ExtraCharge::new("Yacht", Money::new(dec!(5000000000)))];
        assert!(validate_transfer_draft(&extra).is_err());

        let mut commission = draft();
        commission.commission = Adjustment::Fixed(Money::new(dec!(5000000000)));
        assert!(validate_transfer_draft(&commission).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("discount", Percent::new(dec!(100))).is_ok());
        assert!(validate_percentage("discount", Percent::new(dec!(100.5))).is_err());
        assert!(validate_percentage("discount", Percent::new(dec!(-1))).is_err());
    }

    #[test]
    fn test_validate_transfer_draft() {
        assert!(validate_transfer_draft(&draft()).is_ok());

        let mut hourly = draft();
        hourly.service_type = ServiceType::Hourly;
        assert!(validate_transfer_draft(&hourly).is_err());
        hourly.hours = Some(3);
        assert!(validate_transfer_draft(&hourly).is_ok());

        let mut bad_discount = draft();
        bad_discount.discount = Adjustment::Percentage(Percent::new(dec!(150)));
        assert!(validate_transfer_draft(&bad_discount).is_err());

        let mut negative_extra = draft();
        negative_extra.extra_charges = vec![ExtraCharge::new("Tolls", Money::new(dec!(-2)))];
        assert!(validate_transfer_draft(&negative_extra).is_err());

        let mut blank_extra = draft();
        blank_extra.extra_charges = vec![ExtraCharge::new("", Money::ZERO)];
        assert!(validate_transfer_draft(&blank_extra).is_ok());
    }

    #[test]
    fn test_validate_tax_rate() {
        assert!(validate_tax_rate(Percent::new(dec!(21))).is_ok());
        assert!(validate_tax_rate(Percent::new(dec!(150))).is_ok());
        assert!(validate_tax_rate(Percent::new(dec!(-0.5))).is_err());
    }
}
