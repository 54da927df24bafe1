//! # Billing Module
//!
//! Invoice arithmetic shared by the live preview, bill creation, bill
//! maintenance and export.
//!
//! ## Tax Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EXCLUDED (tax on top)            INCLUDED (tax carved out)             │
//! │  ─────────────────────            ─────────────────────────             │
//! │  tax   = sub × r / 100            tax   = sub × r / (100 + r)           │
//! │  total = sub + tax                total = sub                           │
//! │                                                                         │
//! │  sub = 175.50, r = 21             sub = 175.50, r = 21                  │
//! │  tax = 36.855                     tax = 30.4586...                      │
//! │  total = 212.355                  total = 175.50                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Figures are exact; round only when presenting them.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Percent};
use crate::pricing::{price_breakdown, PriceBreakdown};
use crate::types::{Adjustment, Bill, BillStatus, Client, ServiceType, TaxApplication, Transfer};
use crate::{INVOICE_PREFIX, MAX_PAYMENT_TERMS_DAYS};

// =============================================================================
// Totals
// =============================================================================

/// Subtotal, tax and grand total of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub sub_total: Money,
    pub tax_amount: Money,
    pub total: Money,
}

impl BillTotals {
    /// Applies the tax mode to an already summed subtotal.
    ///
    /// ## Example
    /// ```rust
    /// use ridebill_core::billing::BillTotals;
    /// use ridebill_core::money::{Money, Percent};
    /// use ridebill_core::types::TaxApplication;
    /// use rust_decimal::Decimal;
    ///
    /// let totals = BillTotals::compute(
    ///     Money::from_cents(10_000),
    ///     Percent::new(Decimal::from(21)),
    ///     TaxApplication::Excluded,
    /// )
    /// .unwrap();
    /// assert_eq!(totals.total, Money::from_cents(12_100));
    /// ```
    pub fn compute(
        sub_total: Money,
        tax_rate: Percent,
        application: TaxApplication,
    ) -> CoreResult<Self> {
        let rate = tax_rate.value();
        let totals = match application {
            TaxApplication::Excluded => sub_total.checked_percent(tax_rate).and_then(|tax_amount| {
                Some(BillTotals {
                    sub_total,
                    tax_amount,
                    total: sub_total.checked_add(tax_amount)?,
                })
            }),
            TaxApplication::Included => {
                let tax_amount = match Decimal::ONE_HUNDRED.checked_add(rate) {
                    Some(divisor) if divisor.is_zero() => Some(Money::ZERO),
                    Some(divisor) => sub_total
                        .amount()
                        .checked_mul(rate)
                        .and_then(|taxed| taxed.checked_div(divisor))
                        .map(Money::new),
                    None => None,
                };
                tax_amount.map(|tax_amount| BillTotals {
                    sub_total,
                    tax_amount,
                    total: sub_total,
                })
            }
        };
        totals.ok_or_else(|| ValidationError::overflow("tax_amount").into())
    }

    /// Sums line prices and applies the tax mode.
    ///
    /// Always recomputed from the full live set of lines, never patched
    /// incrementally.
    pub fn from_lines<I>(lines: I, tax_rate: Percent, application: TaxApplication) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        let sub_total =
            Money::checked_sum(lines).ok_or_else(|| ValidationError::overflow("sub_total"))?;
        Self::compute(sub_total, tax_rate, application)
    }
}

// =============================================================================
// Preview
// =============================================================================

/// One priced line of a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub transfer_id: String,
    pub description: String,
    pub breakdown: PriceBreakdown,
    /// Same as `breakdown.total`; becomes the bill item's unit price.
    pub total_price: Money,
}

impl PreviewItem {
    /// Prices a transfer and renders its line description.
    pub fn from_transfer(transfer: &Transfer) -> CoreResult<Self> {
        let breakdown = price_breakdown(transfer)?;
        Ok(PreviewItem {
            transfer_id: transfer.id.clone(),
            description: describe_transfer(transfer),
            total_price: breakdown.total,
            breakdown,
        })
    }
}

/// A priced, taxed bill that has not been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPreview {
    pub client: Client,
    pub items: Vec<PreviewItem>,
    pub sub_total: Money,
    pub tax_rate: Percent,
    pub tax_amount: Money,
    pub tax_application: TaxApplication,
    pub total: Money,
}

impl BillPreview {
    /// Prices every transfer (in the given order) and totals them.
    ///
    /// Fails on the first transfer that cannot be priced.
    pub fn assemble(
        client: Client,
        transfers: &[Transfer],
        tax_rate: Percent,
        tax_application: TaxApplication,
    ) -> CoreResult<Self> {
        let items = transfers
            .iter()
            .map(PreviewItem::from_transfer)
            .collect::<CoreResult<Vec<_>>>()?;

        let totals = BillTotals::from_lines(
            items.iter().map(|item| item.total_price),
            tax_rate,
            tax_application,
        )?;

        Ok(BillPreview {
            client,
            items,
            sub_total: totals.sub_total,
            tax_rate,
            tax_amount: totals.tax_amount,
            tax_application,
            total: totals.total,
        })
    }

    pub fn totals(&self) -> BillTotals {
        BillTotals {
            sub_total: self.sub_total,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Line Descriptions
// =============================================================================

/// Renders the invoice line text for a transfer.
///
/// `14/03/2026 - Hourly (4h) - Airport → Hotel Sol - Discount 10%`
pub fn describe_transfer(transfer: &Transfer) -> String {
    let mut parts = vec![transfer.date.format("%d/%m/%Y").to_string()];

    parts.push(match (transfer.service_type, transfer.hours) {
        (ServiceType::Hourly, Some(hours)) => {
            format!("{} ({}h)", transfer.service_type.label(), hours)
        }
        (service, _) => service.label().to_string(),
    });

    if let Some(route) = transfer.route() {
        parts.push(route);
    }

    match transfer.discount {
        Adjustment::None => {}
        discount => parts.push(format!("Discount {discount}")),
    }

    parts.join(" - ")
}

// =============================================================================
// Invoice Numbers
// =============================================================================

/// Formats a sequential invoice number: `INVOICE-2026-0007`.
pub fn invoice_number(year: i32, sequence: i64) -> String {
    format!("{INVOICE_PREFIX}-{year}-{sequence:04}")
}

/// Number used when the bill count is unavailable.
///
/// The year is the invoice year, the sequence comes from the clock; unique
/// only on a best-effort basis.
pub fn fallback_invoice_number(year: i32, now: DateTime<Utc>) -> String {
    invoice_number(year, now.timestamp_millis().rem_euclid(10_000))
}

// =============================================================================
// Dates
// =============================================================================

/// Due date after `payment_terms_days` days.
///
/// Fails with [`ValidationError::OutOfRange`] for negative terms or terms
/// above [`MAX_PAYMENT_TERMS_DAYS`].
pub fn due_date(date: NaiveDate, payment_terms_days: i64) -> CoreResult<NaiveDate> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "payment_terms_days".to_string(),
        min: 0,
        max: MAX_PAYMENT_TERMS_DAYS,
    };
    if !(0..=MAX_PAYMENT_TERMS_DAYS).contains(&payment_terms_days) {
        return Err(out_of_range().into());
    }
    let days = u64::try_from(payment_terms_days).map_err(|_| out_of_range())?;
    Ok(date
        .checked_add_days(Days::new(days))
        .ok_or_else(out_of_range)?)
}

// =============================================================================
// Lifecycle Rules
// =============================================================================

/// Rejects status changes that are not edges of the lifecycle graph.
pub fn ensure_transition(bill: &Bill, next: BillStatus) -> CoreResult<()> {
    if bill.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::InvalidStatusTransition {
            bill_id: bill.id.clone(),
            from: bill.status,
            to: next,
        })
    }
}

/// Rejects transfer changes on paid or cancelled bills.
pub fn ensure_editable(bill: &Bill) -> CoreResult<()> {
    if bill.is_editable() {
        Ok(())
    } else {
        Err(CoreError::BillLocked {
            bill_id: bill.id.clone(),
            status: bill.status,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Percent;
    use crate::types::Collaborator;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn client() -> Client {
        let now = Utc::now();
        Client {
            id: "c-1".into(),
            name: "Hotel Miramar".into(),
            tax_id: Some("B12345678".into()),
            email: None,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn two_transfers() -> Vec<Transfer> {
        let hourly = Transfer::new("t-1", "c-1", date(), ServiceType::Hourly, Money::new(dec!(20)))
            .with_hours(4)
            .with_discount(Adjustment::Percentage(Percent::new(dec!(10))));
        let ride = Transfer::new("t-2", "c-1", date(), ServiceType::PointToPoint, Money::new(dec!(100)))
            .with_extra_charge("Child seat", Money::new(dec!(25)))
            .with_discount(Adjustment::Fixed(Money::new(dec!(10))))
            .with_commission(Adjustment::Percentage(Percent::new(dec!(10))))
            .with_collaborator(Collaborator::Partner("Acme".into()));
        vec![hourly, ride]
    }

    #[test]
    fn test_preview_tax_excluded() {
        let preview = BillPreview::assemble(
            client(),
            &two_transfers(),
            Percent::new(dec!(21)),
            TaxApplication::Excluded,
        )
        .unwrap();

        assert_eq!(preview.items[0].total_price, Money::new(dec!(72)));
        assert_eq!(preview.items[1].total_price, Money::new(dec!(103.5)));
        assert_eq!(preview.sub_total, Money::new(dec!(175.5)));
        assert_eq!(preview.tax_amount, Money::new(dec!(36.855)));
        assert_eq!(preview.total, Money::new(dec!(212.355)));
        assert_eq!(preview.total - preview.sub_total, preview.tax_amount);
    }

    #[test]
    fn test_preview_tax_included() {
        let preview = BillPreview::assemble(
            client(),
            &two_transfers(),
            Percent::new(dec!(21)),
            TaxApplication::Included,
        )
        .unwrap();

        assert_eq!(preview.total, Money::new(dec!(175.5)));
        assert_eq!(
            preview.tax_amount.amount(),
            dec!(175.5) * dec!(21) / dec!(121)
        );
        assert_eq!(preview.tax_amount.to_string(), "30.46");
    }

    #[test]
    fn test_preview_is_deterministic() {
        let transfers = two_transfers();
        let rate = Percent::new(dec!(21));
        let a = BillPreview::assemble(client(), &transfers, rate, TaxApplication::Included).unwrap();
        let b = BillPreview::assemble(client(), &transfers, rate, TaxApplication::Included).unwrap();
        assert_eq!(a.totals(), b.totals());
    }

    #[test]
    fn test_preview_fails_on_invalid_transfer() {
        let broken = Transfer::new("t-9", "c-1", date(), ServiceType::Hourly, Money::new(dec!(20)));
        let result = BillPreview::assemble(
            client(),
            &[broken],
            Percent::new(dec!(21)),
            TaxApplication::Excluded,
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_zero_rate() {
        let totals =
            BillTotals::compute(Money::new(dec!(50)), Percent::ZERO, TaxApplication::Included)
                .unwrap();
        assert_eq!(totals.tax_amount, Money::ZERO);
        assert_eq!(totals.total, Money::new(dec!(50)));
    }

    #[test]
    fn test_describe_transfer() {
        let transfers = two_transfers();
        assert_eq!(
            describe_transfer(&transfers[0]),
            "14/03/2026 - Hourly (4h) - Discount 10%"
        );

        let routed = transfers[1].clone().with_route("Airport", "Port");
        assert_eq!(
            describe_transfer(&routed),
            "14/03/2026 - Point to point - Airport → Port - Discount 10.00"
        );

        let plain = Transfer::new("t", "c", date(), ServiceType::PointToPoint, Money::ZERO);
        assert_eq!(describe_transfer(&plain), "14/03/2026 - Point to point");
    }

    #[test]
    fn test_invoice_numbers() {
        assert_eq!(invoice_number(2026, 1), "INVOICE-2026-0001");
        assert_eq!(invoice_number(2026, 12345), "INVOICE-2026-12345");

        let now = Utc.with_ymd_and_hms(2027, 1, 2, 12, 0, 0).unwrap();
        let fallback = fallback_invoice_number(2026, now);
        assert!(fallback.starts_with("INVOICE-2026-"));
        assert_eq!(fallback.len(), "INVOICE-2026-0000".len());
    }

    #[test]
    fn test_due_date() {
        assert_eq!(
            due_date(date(), 30).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 13).unwrap()
        );
        assert_eq!(due_date(date(), 0).unwrap(), date());
    }

    #[test]
    fn test_due_date_rejects_unreasonable_terms() {
        for days in [-1, MAX_PAYMENT_TERMS_DAYS + 1, i64::MAX] {
            assert!(matches!(
                due_date(date(), days),
                Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
            ));
        }
        assert!(due_date(NaiveDate::MAX, 1).is_err());
    }

    #[test]
    fn test_oversized_tax_is_an_error() {
        let huge = Money::new(Decimal::MAX);
        let result = BillTotals::compute(huge, Percent::new(dec!(21)), TaxApplication::Excluded);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));

        let included =
            BillTotals::compute(Money::new(dec!(100)), Percent::new(dec!(300)), TaxApplication::Included)
                .unwrap();
        assert_eq!(included.tax_amount, Money::new(dec!(75)));
        assert_eq!(included.total, Money::new(dec!(100)));
    }

    fn bill(status: BillStatus) -> Bill {
        let now = Utc::now();
        Bill {
            id: "b-1".into(),
            number: invoice_number(2026, 1),
            client_id: "c-1".into(),
            date: date(),
            due_date: due_date(date(), 30).unwrap(),
            status,
            tax_rate: Percent::new(dec!(21)),
            tax_application: TaxApplication::Excluded,
            sub_total: Money::ZERO,
            tax_amount: Money::ZERO,
            total: Money::ZERO,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lifecycle_rules() {
        assert!(ensure_transition(&bill(BillStatus::Draft), BillStatus::Sent).is_ok());
        assert!(matches!(
            ensure_transition(&bill(BillStatus::Paid), BillStatus::Draft),
            Err(CoreError::InvalidStatusTransition { .. })
        ));

        assert!(ensure_editable(&bill(BillStatus::Sent)).is_ok());
        assert!(matches!(
            ensure_editable(&bill(BillStatus::Cancelled)),
            Err(CoreError::BillLocked { .. })
        ));
    }
}
