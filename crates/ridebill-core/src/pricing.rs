//! # Pricing Module
//!
//! Computes what a single transfer contributes to an invoice.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Per-Transfer Price                                 │
//! │                                                                         │
//! │  1. base      = price              (point to point)                     │
//! │               = price × hours      (hourly)                             │
//! │  2.   + extras                     (complete rows only)                 │
//! │  3.   − discount                   (against base ONLY, clamped [0,base])│
//! │  4. subtotal after discount                                             │
//! │  5. commission                     (against the subtotal of step 4)     │
//! │  6. total     = subtotal − commission                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Discount and commission deliberately use different bases. Apart from the
//! discount clamp, negative intermediates are not clamped.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Adjustment, Commission, ServiceType, Transfer};

/// Every intermediate figure of the ordering above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base: Money,
    pub extras: Money,
    pub discount: Money,
    pub subtotal_after_discount: Money,
    pub commission: Money,
    pub total: Money,
}

/// Price before extras, discount or commission.
///
/// ## Errors
/// Hourly transfers without positive `hours` fail with
/// [`ValidationError::Required`] / [`ValidationError::MustBePositive`].
/// A product too large for a decimal fails with [`ValidationError::Overflow`].
pub fn base_price(transfer: &Transfer) -> CoreResult<Money> {
    match transfer.service_type {
        ServiceType::PointToPoint => Ok(transfer.price),
        ServiceType::Hourly => {
            let hours = transfer.hours.ok_or_else(|| ValidationError::Required {
                field: "hours".to_string(),
            })?;
            if hours <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "hours".to_string(),
                }
                .into());
            }
            Ok(overflowed("price", transfer.price.checked_times(hours))?)
        }
    }
}

/// Sum of the complete extra-charge rows.
pub fn extra_charges_total(transfer: &Transfer) -> CoreResult<Money> {
    let prices = transfer
        .extra_charges
        .iter()
        .filter(|charge| charge.is_complete())
        .map(|charge| charge.price);
    Ok(overflowed("extra_charges", Money::checked_sum(prices))?)
}

/// Discount against the base price.
pub fn discount_amount(transfer: &Transfer) -> CoreResult<Money> {
    let base = base_price(transfer)?;
    Ok(discount_on(base, &transfer.discount)?)
}

fn discount_on(base: Money, discount: &Adjustment) -> Result<Money, ValidationError> {
    match discount {
        Adjustment::None => Ok(Money::ZERO),
        Adjustment::Percentage(rate) => overflowed("discount", base.checked_percent(*rate)),
        Adjustment::Fixed(value) => {
            let ceiling = if base.is_negative() { Money::ZERO } else { base };
            Ok(value.clamp_between(Money::ZERO, ceiling))
        }
    }
}

/// Commission withheld from `base_for_commission`.
///
/// Zero unless the transfer was performed by a partner and a commission is
/// configured.
pub fn commission_amount(transfer: &Transfer, base_for_commission: Money) -> CoreResult<Money> {
    let earns = transfer
        .collaborator
        .as_ref()
        .is_some_and(|c| c.earns_commission());
    if !earns {
        return Ok(Money::ZERO);
    }
    Ok(commission_on(base_for_commission, &transfer.commission)?)
}

fn commission_on(base: Money, commission: &Commission) -> Result<Money, ValidationError> {
    match commission {
        Adjustment::None => Ok(Money::ZERO),
        Adjustment::Percentage(rate) => overflowed("commission", base.checked_percent(*rate)),
        Adjustment::Fixed(value) => Ok(*value),
    }
}

fn overflowed(field: &str, amount: Option<Money>) -> Result<Money, ValidationError> {
    amount.ok_or_else(|| ValidationError::overflow(field))
}

/// Computes all intermediate figures in one pass.
pub fn price_breakdown(transfer: &Transfer) -> CoreResult<PriceBreakdown> {
    let base = base_price(transfer)?;
    let extras = extra_charges_total(transfer)?;
    let discount = discount_on(base, &transfer.discount)?;
    let subtotal_after_discount = overflowed(
        "extra_charges",
        base.checked_add(extras)
            .and_then(|gross| gross.checked_sub(discount)),
    )?;
    let commission = commission_amount(transfer, subtotal_after_discount)?;
    let total = overflowed("commission", subtotal_after_discount.checked_sub(commission))?;

    Ok(PriceBreakdown {
        base,
        extras,
        discount,
        subtotal_after_discount,
        commission,
        total,
    })
}

/// Final price the transfer contributes to a bill.
pub fn total_price(transfer: &Transfer) -> CoreResult<Money> {
    Ok(price_breakdown(transfer)?.total)
}

// =============================================================================
// Unit Tests
// =============================================================================
