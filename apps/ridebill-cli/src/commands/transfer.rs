//! # Transfer Commands
//!
//! Booking CRUD plus a price quote.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update                                                        │
//! │    validate_transfer_draft ──► client exists? ──► insert / replace      │
//! │                                                                         │
//! │  update / delete only touch unbilled transfers; a billed transfer must  │
//! │  first be removed from its bill.                                        │
//! │                                                                         │
//! │  quote: prices a draft without storing it                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::error::AppError;
use ridebill_core::pricing::{price_breakdown, PriceBreakdown};
use ridebill_core::validation::validate_transfer_draft;
use ridebill_core::{CoreError, Transfer, TransferDraft};
use ridebill_db::{Database, TransferFilter};

/// A transfer together with its computed price.
#[derive(Debug, Clone, Serialize)]
pub struct TransferView {
    #[serde(flatten)]
    pub transfer: Transfer,
    pub price_breakdown: PriceBreakdown,
}

impl TryFrom<Transfer> for TransferView {
    type Error = CoreError;

    fn try_from(transfer: Transfer) -> Result<Self, Self::Error> {
        Ok(TransferView {
            price_breakdown: price_breakdown(&transfer)?,
            transfer,
        })
    }
}

/// Lists transfers matching the filter, in service order.
pub async fn list_transfers(
    db: &Database,
    filter: &TransferFilter,
) -> Result<Vec<TransferView>, AppError> {
    let transfers = db.transfers().list(filter).await?;
    debug!(count = transfers.len(), "list_transfers command");

    transfers
        .into_iter()
        .map(|t| TransferView::try_from(t).map_err(AppError::from))
        .collect()
}

/// Gets a single transfer with its price.
pub async fn get_transfer(db: &Database, id: &str) -> Result<TransferView, AppError> {
    let transfer = db
        .transfers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Transfer", id))?;
    Ok(TransferView::try_from(transfer)?)
}

/// Records a new, unbilled transfer.
pub async fn create_transfer(db: &Database, draft: TransferDraft) -> Result<TransferView, AppError> {
    validate_transfer_draft(&draft)?;
    ensure_client(db, &draft.client_id).await?;

    let transfer = db.transfers().insert(&draft).await?;
    info!(id = %transfer.id, client_id = %transfer.client_id, "Transfer created");
    Ok(TransferView::try_from(transfer)?)
}

/// Replaces an unbilled transfer.
pub async fn update_transfer(
    db: &Database,
    id: &str,
    draft: TransferDraft,
) -> Result<TransferView, AppError> {
    validate_transfer_draft(&draft)?;
    ensure_client(db, &draft.client_id).await?;

    match db.transfers().update_unbilled(id, &draft).await? {
        Some(transfer) => {
            info!(id = %id, "Transfer updated");
            Ok(TransferView::try_from(transfer)?)
        }
        None => Err(locked_or_missing(db, id).await),
    }
}

/// Deletes an unbilled transfer.
pub async fn delete_transfer(db: &Database, id: &str) -> Result<(), AppError> {
    if db.transfers().delete_unbilled(id).await? {
        info!(id = %id, "Transfer deleted");
        Ok(())
    } else {
        Err(locked_or_missing(db, id).await)
    }
}

/// Prices a draft without persisting it.
pub fn quote_transfer(draft: TransferDraft) -> Result<PriceBreakdown, AppError> {
    validate_transfer_draft(&draft)?;
    let transfer = draft.into_transfer("quote", chrono::Utc::now());
    Ok(price_breakdown(&transfer)?)
}

async fn ensure_client(db: &Database, client_id: &str) -> Result<(), AppError> {
    match db.clients().get_by_id(client_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Client", client_id)),
    }
}

/// Explains why an unbilled-only write touched no row.
async fn locked_or_missing(db: &Database, id: &str) -> AppError {
    match db.transfers().get_by_id(id).await {
        Ok(Some(_)) => AppError::business(format!(
            "Transfer {} is billed; remove it from its bill first",
            id
        )),
        Ok(None) => AppError::not_found("Transfer", id),
        Err(e) => e.into(),
    }
}
