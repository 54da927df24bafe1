//! # Bill Commands
//!
//! Thin wrappers over [`BillingService`](ridebill_db::BillingService).
//!
//! ## Billing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ridebill bill preview --client C --all-unbilled                        │
//! │       │  (nothing stored; shows lines, subtotal, tax, total)            │
//! │       ▼                                                                 │
//! │  ridebill bill create  --client C --transfer T1 --transfer T2           │
//! │       │  draft bill, INVOICE-2026-0001, T1/T2 marked billed             │
//! │       ▼                                                                 │
//! │  ridebill bill update  B --remove T2 --add T3                           │
//! │       │  totals recomputed from the remaining lines                     │
//! │       ▼                                                                 │
//! │  ridebill bill status  B sent ──► paid                                  │
//! │                                                                         │
//! │  ridebill bill export  B --out bill.csv                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax rate and mode fall back to the configured defaults when a command
//! does not set them.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::context::AppContext;
use crate::error::AppError;
use ridebill_core::billing::BillPreview;
use ridebill_core::{Bill, BillStatus, BillWithItems, Percent, TaxApplication};
use ridebill_db::{BillFilter, Database, NewBill, TransferFilter};

/// Selection and tax settings shared by `preview` and `create`.
#[derive(Debug, Clone, Default)]
pub struct BillRequest {
    pub client_id: String,
    pub transfer_ids: Vec<String>,
    /// Also select every unbilled transfer of the client.
    pub all_unbilled: bool,
    pub tax_rate: Option<Percent>,
    pub tax_application: Option<TaxApplication>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Result of deleting a bill.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedBill {
    pub bill_id: String,
    pub unbilled_transfer_ids: Vec<String>,
}

/// Computes what a bill would look like without storing anything.
pub async fn preview_bill(ctx: &AppContext, request: BillRequest) -> Result<BillPreview, AppError> {
    let transfer_ids = selection(ctx.db(), &request).await?;
    let preview = ctx
        .billing()
        .calculate_bill_preview(
            &request.client_id,
            &transfer_ids,
            request.tax_rate.unwrap_or(ctx.config().default_tax_rate),
            request
                .tax_application
                .unwrap_or(ctx.config().default_tax_application),
        )
        .await?;
    Ok(preview)
}

/// Creates a draft bill and marks its transfers billed.
pub async fn create_bill(ctx: &AppContext, request: BillRequest) -> Result<BillWithItems, AppError> {
    let transfer_ids = selection(ctx.db(), &request).await?;
    let created = ctx
        .billing()
        .create_bill(NewBill {
            client_id: request.client_id,
            transfer_ids,
            tax_rate: request.tax_rate.unwrap_or(ctx.config().default_tax_rate),
            tax_application: request
                .tax_application
                .unwrap_or(ctx.config().default_tax_application),
            date: request.date,
            notes: request.notes,
        })
        .await?;
    Ok(created)
}

/// Lists bills, newest first.
pub async fn list_bills(db: &Database, filter: &BillFilter) -> Result<Vec<Bill>, AppError> {
    let bills = db.bills().list(filter).await?;
    debug!(count = bills.len(), "list_bills command");
    Ok(bills)
}

/// Gets a bill by ID or invoice number.
pub async fn get_bill(ctx: &AppContext, id_or_number: &str) -> Result<BillWithItems, AppError> {
    let bill_id = resolve_bill_id(ctx.db(), id_or_number).await?;
    Ok(ctx.billing().get_bill(&bill_id).await?)
}

/// Adds and removes transfers on a draft or sent bill.
pub async fn update_bill_transfers(
    ctx: &AppContext,
    id_or_number: &str,
    add: &[String],
    remove: &[String],
) -> Result<BillWithItems, AppError> {
    let bill_id = resolve_bill_id(ctx.db(), id_or_number).await?;
    Ok(ctx
        .billing()
        .update_bill_transfers(&bill_id, add, remove)
        .await?)
}

/// Moves a bill to a new status.
pub async fn set_bill_status(
    ctx: &AppContext,
    id_or_number: &str,
    status: BillStatus,
) -> Result<Bill, AppError> {
    let bill_id = resolve_bill_id(ctx.db(), id_or_number).await?;
    Ok(ctx.billing().change_status(&bill_id, status).await?)
}

/// Deletes a bill; its transfers become billable again.
pub async fn delete_bill(ctx: &AppContext, id_or_number: &str) -> Result<DeletedBill, AppError> {
    let bill_id = resolve_bill_id(ctx.db(), id_or_number).await?;
    let unbilled_transfer_ids = ctx.billing().delete_bill(&bill_id).await?;
    Ok(DeletedBill {
        bill_id,
        unbilled_transfer_ids,
    })
}

/// Accepts either a bill UUID or an invoice number such as `INVOICE-2026-0001`.
pub(crate) async fn resolve_bill_id(db: &Database, id_or_number: &str) -> Result<String, AppError> {
    let key = id_or_number.trim();
    if let Some(bill) = db.bills().get_by_number(key).await? {
        return Ok(bill.id);
    }
    Ok(key.to_string())
}

/// Explicit IDs first, then (optionally) the client's unbilled transfers.
async fn selection(db: &Database, request: &BillRequest) -> Result<Vec<String>, AppError> {
    let mut ids = request.transfer_ids.clone();
    if request.all_unbilled {
        let unbilled = db
            .transfers()
            .list(&TransferFilter::unbilled_for(request.client_id.clone()))
            .await?;
        ids.extend(unbilled.into_iter().map(|t| t.id));
    }
    Ok(ids)
}
