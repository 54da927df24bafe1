//! # Bill Export
//!
//! Writes a stored bill as CSV.
//!
//! ```text
//! Line,Transfer,Description,Amount
//! 1,7d0c…,14/03/2026 - Hourly (4h) - Discount 10%,72.00 €
//! 2,91ab…,14/03/2026 - Point to point - Discount 10.00,103.50 €
//! ,,Subtotal,175.50 €
//! ,,Tax 21% (excluded),36.86 €
//! ,,Total,212.36 €
//! ```
//!
//! Figures come from the stored bill; nothing is re-priced here. Amounts
//! carry `RIDEBILL_CURRENCY_SYMBOL`; set it empty for bare numbers.

use std::io::Write;

use tracing::info;

use super::bill::resolve_bill_id;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppError;
use ridebill_core::{BillWithItems, TaxApplication};

const HEADER: [&str; 4] = ["Line", "Transfer", "Description", "Amount"];

/// Exports a bill (by ID or invoice number) to `writer`.
///
/// ## Returns
/// The bill's invoice number.
pub async fn export_bill<W: Write>(
    ctx: &AppContext,
    id_or_number: &str,
    writer: W,
) -> Result<String, AppError> {
    let bill_id = resolve_bill_id(ctx.db(), id_or_number).await?;
    let bill = ctx.billing().get_bill(&bill_id).await?;

    write_bill_csv(&bill, ctx.config(), writer)?;

    info!(bill_id = %bill_id, number = %bill.bill.number, lines = bill.items.len(), "Bill exported");
    Ok(bill.bill.number)
}

/// Header, one row per item, then subtotal, tax and total rows.
pub fn write_bill_csv<W: Write>(
    bill: &BillWithItems,
    config: &AppConfig,
    writer: W,
) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    for (n, item) in bill.items.iter().enumerate() {
        wtr.write_record([
            (n + 1).to_string(),
            item.transfer_id.clone(),
            item.description.clone(),
            config.format_money(item.unit_price),
        ])?;
    }

    let b = &bill.bill;
    let tax_label = match b.tax_application {
        TaxApplication::Excluded => format!("Tax {} (excluded)", b.tax_rate),
        TaxApplication::Included => format!("Tax {} (included)", b.tax_rate),
    };
    for (label, amount) in [
        ("Subtotal".to_string(), b.sub_total),
        (tax_label, b.tax_amount),
        ("Total".to_string(), b.total),
    ] {
        wtr.write_record([String::new(), String::new(), label, config.format_money(amount)])?;
    }

    wtr.flush()?;
    Ok(())
}
