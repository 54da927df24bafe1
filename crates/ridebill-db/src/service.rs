//! # Billing Service
//!
//! Runs the billing workflows against a [`BillingStore`].
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_bill_preview   read-only; missing client aborts,            │
//! │                           missing transfers are skipped                │
//! │                                                                         │
//! │  create_bill              preview → number → insert_bill (atomic)      │
//! │                                                                         │
//! │  update_bill_transfers    remove / add → apply_bill_changes (atomic,   │
//! │                           totals recomputed from the live item set)    │
//! │                                                                         │
//! │  change_status            draft → sent → paid, draft|sent → cancelled  │
//! │                                                                         │
//! │  delete_bill              unbill all transfers + delete (atomic)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic goes through `ridebill_core::pricing` and
//! `ridebill_core::billing`; this module only sequences store calls.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::bill::BillChanges;
use crate::store::BillingStore;
use ridebill_core::billing::{
    due_date, ensure_editable, ensure_transition, fallback_invoice_number, invoice_number,
    BillPreview, PreviewItem,
};
use ridebill_core::validation::validate_tax_rate;
use ridebill_core::{
    Bill, BillItem, BillStatus, BillWithItems, CoreError, Money, Percent, TaxApplication,
    Transfer, ValidationError, DEFAULT_PAYMENT_TERMS_DAYS,
};

/// How many invoice numbers are tried before giving up on a collision.
const MAX_NUMBER_ATTEMPTS: i64 = 10;

// =============================================================================
// Errors
// =============================================================================

/// Failure of a billing workflow.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Business rule or input problem.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The store failed.
    #[error(transparent)]
    Persistence(DbError),
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Core(err.into())
    }
}

/// A lost compare-and-set on `billed` is a business conflict, not a storage
/// failure.
impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::TransferClaimed { transfer_id } => {
                BillingError::Core(CoreError::TransferAlreadyBilled { transfer_id })
            }
            other => BillingError::Persistence(other),
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

// =============================================================================
// Requests
// =============================================================================

/// Everything needed to create a bill.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub client_id: String,
    pub transfer_ids: Vec<String>,
    pub tax_rate: Percent,
    pub tax_application: TaxApplication,
    /// Invoice date; today when absent.
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Billing workflows over an injected store.
#[derive(Debug, Clone)]
pub struct BillingService<S> {
    store: S,
    payment_terms_days: i64,
}

impl<S: BillingStore> BillingService<S> {
    pub fn new(store: S) -> Self {
        BillingService {
            store,
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
        }
    }

    /// Days between invoice date and due date.
    pub fn with_payment_terms(mut self, days: i64) -> Self {
        self.payment_terms_days = days;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prices a selection of transfers without persisting anything.
    ///
    /// ## Errors
    /// * `CoreError::NotFound` - the client does not exist
    /// * `CoreError::Validation` - bad tax rate, a transfer of another client,
    ///   or a transfer that cannot be priced
    ///
    /// Unknown transfer IDs are skipped with a warning; a preview over a
    /// stale selection still renders.
    pub async fn calculate_bill_preview(
        &self,
        client_id: &str,
        transfer_ids: &[String],
        tax_rate: Percent,
        tax_application: TaxApplication,
    ) -> BillingResult<BillPreview> {
        let (preview, _) = self
            .resolve_preview(client_id, transfer_ids, tax_rate, tax_application)
            .await?;
        Ok(preview)
    }

    async fn resolve_preview(
        &self,
        client_id: &str,
        transfer_ids: &[String],
        tax_rate: Percent,
        tax_application: TaxApplication,
    ) -> BillingResult<(BillPreview, Vec<Transfer>)> {
        validate_tax_rate(tax_rate)?;

        let client = self
            .store
            .get_client(client_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Client", client_id))?;

        let transfers = self.resolve_transfers(client_id, transfer_ids).await?;
        let preview = BillPreview::assemble(client, &transfers, tax_rate, tax_application)?;

        debug!(
            client_id = %client_id,
            items = preview.items.len(),
            sub_total = %preview.sub_total,
            total = %preview.total,
            "Bill preview computed"
        );
        Ok((preview, transfers))
    }

    /// Loads transfers in selection order, dropping duplicates and unknown IDs.
    async fn resolve_transfers(
        &self,
        client_id: &str,
        transfer_ids: &[String],
    ) -> BillingResult<Vec<Transfer>> {
        let mut seen = HashSet::new();
        let mut transfers = Vec::with_capacity(transfer_ids.len());

        for id in transfer_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let Some(transfer) = self.store.get_transfer(id).await? else {
                warn!(transfer_id = %id, "Selected transfer not found, skipping");
                continue;
            };
            if transfer.client_id != client_id {
                return Err(ValidationError::NotAllowed {
                    field: "transfer_ids".to_string(),
                    reason: format!("transfer {id} belongs to another client"),
                }
                .into());
            }
            transfers.push(transfer);
        }

        Ok(transfers)
    }

    /// Creates a draft bill from unbilled transfers.
    ///
    /// Bill, items and `billed` flags are written atomically. If another
    /// bill claims one of the transfers first, nothing is written and
    /// `TransferAlreadyBilled` is returned.
    pub async fn create_bill(&self, request: NewBill) -> BillingResult<BillWithItems> {
        let (preview, transfers) = self
            .resolve_preview(
                &request.client_id,
                &request.transfer_ids,
                request.tax_rate,
                request.tax_application,
            )
            .await?;

        if preview.is_empty() {
            return Err(ValidationError::Required {
                field: "transfer_ids".to_string(),
            }
            .into());
        }
        if let Some(billed) = transfers.iter().find(|t| t.billed) {
            return Err(CoreError::TransferAlreadyBilled {
                transfer_id: billed.id.clone(),
            }
            .into());
        }

        let now = Utc::now();
        let date = request.date.unwrap_or_else(|| now.date_naive());
        let bill_id = Uuid::new_v4().to_string();
        let items: Vec<BillItem> = preview
            .items
            .iter()
            .map(|item| new_item(&bill_id, item))
            .collect();

        let mut bill = Bill {
            id: bill_id,
            number: String::new(),
            client_id: request.client_id.clone(),
            date,
            due_date: due_date(date, self.payment_terms_days)?,
            status: BillStatus::Draft,
            tax_rate: preview.tax_rate,
            tax_application: preview.tax_application,
            sub_total: preview.sub_total,
            tax_amount: preview.tax_amount,
            total: preview.total,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let first_sequence = match self.store.count_bills_in_year(date.year()).await {
            Ok(count) => Some(count + 1),
            Err(e) => {
                warn!(error = %e, "Could not count bills, using a clock-derived number");
                None
            }
        };

        for attempt in 0..MAX_NUMBER_ATTEMPTS {
            bill.number = match first_sequence {
                Some(sequence) => invoice_number(date.year(), sequence + attempt),
                None => fallback_invoice_number(date.year(), Utc::now()),
            };

            match self.store.insert_bill(&bill, &items).await {
                Ok(()) => {
                    info!(
                        bill_id = %bill.id,
                        number = %bill.number,
                        items = items.len(),
                        total = %bill.total,
                        "Bill created"
                    );
                    return Ok(BillWithItems { bill, items });
                }
                Err(e) if e.is_unique_violation_on("bills.number") => {
                    warn!(number = %bill.number, attempt, "Invoice number taken, trying the next one");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DbError::duplicate("bills.number", bill.number).into())
    }

    /// Adds and removes transfers on an existing bill.
    ///
    /// Removal happens first. The new subtotal is the sum over the
    /// resulting item set; tax and total use the bill's stored rate and mode.
    pub async fn update_bill_transfers(
        &self,
        bill_id: &str,
        added_transfer_ids: &[String],
        removed_transfer_ids: &[String],
    ) -> BillingResult<BillWithItems> {
        let bill = self.require_bill(bill_id).await?;
        ensure_editable(&bill)?;

        let current = self.store.list_bill_items(bill_id).await?;
        let on_bill: HashSet<&str> = current.iter().map(|i| i.transfer_id.as_str()).collect();

        let mut removed = Vec::new();
        for id in unique(removed_transfer_ids) {
            if on_bill.contains(id.as_str()) {
                removed.push(id.clone());
            } else {
                warn!(bill_id = %bill_id, transfer_id = %id, "Transfer not on bill, nothing to remove");
            }
        }
        let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();

        let candidates: Vec<String> = unique(added_transfer_ids)
            .into_iter()
            .filter(|id| {
                let already = on_bill.contains(id.as_str()) && !removed_set.contains(id.as_str());
                if already {
                    debug!(bill_id = %bill_id, transfer_id = %id, "Transfer already on bill");
                }
                !already
            })
            .cloned()
            .collect();

        let transfers = self.resolve_transfers(&bill.client_id, &candidates).await?;
        let mut added_items = Vec::with_capacity(transfers.len());
        for transfer in &transfers {
            if transfer.billed && !removed_set.contains(transfer.id.as_str()) {
                return Err(CoreError::TransferAlreadyBilled {
                    transfer_id: transfer.id.clone(),
                }
                .into());
            }
            added_items.push(new_item(bill_id, &PreviewItem::from_transfer(transfer)?));
        }

        let totals = self
            .store
            .apply_bill_changes(&BillChanges {
                bill_id: bill_id.to_string(),
                removed_transfer_ids: removed,
                added_items,
            })
            .await?;

        info!(
            bill_id = %bill_id,
            sub_total = %totals.sub_total,
            total = %totals.total,
            "Bill transfers updated"
        );

        self.get_bill(bill_id).await
    }

    /// Moves a bill along its lifecycle.
    pub async fn change_status(&self, bill_id: &str, next: BillStatus) -> BillingResult<Bill> {
        let mut bill = self.require_bill(bill_id).await?;
        ensure_transition(&bill, next)?;

        self.store
            .update_bill_status(bill_id, bill.status, next)
            .await?;

        info!(bill_id = %bill_id, from = %bill.status, to = %next, "Bill status changed");
        bill.status = next;
        bill.updated_at = Utc::now();
        Ok(bill)
    }

    /// Deletes a bill; its transfers become billable again.
    pub async fn delete_bill(&self, bill_id: &str) -> BillingResult<Vec<String>> {
        self.require_bill(bill_id).await?;
        let unbilled = self.store.delete_bill(bill_id).await?;
        info!(bill_id = %bill_id, unbilled = unbilled.len(), "Bill deleted");
        Ok(unbilled)
    }

    /// Loads a bill with its items.
    pub async fn get_bill(&self, bill_id: &str) -> BillingResult<BillWithItems> {
        let bill = self.require_bill(bill_id).await?;
        let items = self.store.list_bill_items(bill_id).await?;
        Ok(BillWithItems { bill, items })
    }

    async fn require_bill(&self, bill_id: &str) -> BillingResult<Bill> {
        Ok(self
            .store
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Bill", bill_id))?)
    }
}

fn new_item(bill_id: &str, line: &PreviewItem) -> BillItem {
    BillItem {
        id: Uuid::new_v4().to_string(),
        bill_id: bill_id.to_string(),
        transfer_id: line.transfer_id.clone(),
        description: line.description.clone(),
        unit_price: line.total_price,
        created_at: Utc::now(),
    }
}

fn unique(ids: &[String]) -> Vec<&String> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(id.as_str())).collect()
}

/// Sum of the item prices, the value `sub_total` must always equal.
pub fn items_total(items: &[BillItem]) -> Money {
    items.iter().map(|item| item.unit_price).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use ridebill_core::{
        Adjustment, Collaborator, ExtraCharge, NewClient, ServiceType, TransferDraft,
    };
    use rust_decimal_macros::dec;

    struct Fixture {
        service: BillingService<Database>,
        db: Database,
        client_id: String,
        hourly_id: String,
        ride_id: String,
    }

    fn draft(client_id: &str) -> TransferDraft {
        TransferDraft {
            client_id: client_id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            pickup_time: None,
            origin: None,
            destination: None,
            passengers: 1,
            service_type: ServiceType::PointToPoint,
            price: Money::new(dec!(100)),
            hours: None,
            discount: Adjustment::None,
            extra_charges: vec![],
            commission: Adjustment::None,
            collaborator: None,
            notes: None,
        }
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = db
            .clients()
            .create(&NewClient {
                name: "Hotel Miramar".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        // 20/h × 4h − 10% = 72
        let mut hourly = draft(&client.id);
        hourly.service_type = ServiceType::Hourly;
        hourly.price = Money::new(dec!(20));
        hourly.hours = Some(4);
        hourly.discount = Adjustment::Percentage(Percent::new(dec!(10)));
        let hourly = db.transfers().insert(&hourly).await.unwrap();

        // 100 + 25 − 10, minus 10% commission = 103.5
        let mut ride = draft(&client.id);
        ride.extra_charges = vec![ExtraCharge::new("Child seat", Money::new(dec!(25)))];
        ride.discount = Adjustment::Fixed(Money::new(dec!(10)));
        ride.commission = Adjustment::Percentage(Percent::new(dec!(10)));
        ride.collaborator = Some(Collaborator::Partner("Acme Cabs".into()));
        let ride = db.transfers().insert(&ride).await.unwrap();

        Fixture {
            service: BillingService::new(db.clone()),
            db,
            client_id: client.id,
            hourly_id: hourly.id,
            ride_id: ride.id,
        }
    }

    fn new_bill(f: &Fixture, ids: &[&String]) -> NewBill {
        NewBill {
            client_id: f.client_id.clone(),
            transfer_ids: ids.iter().map(|s| s.to_string()).collect(),
            tax_rate: Percent::new(dec!(21)),
            tax_application: TaxApplication::Excluded,
            date: NaiveDate::from_ymd_opt(2026, 3, 31),
            notes: None,
        }
    }

    async fn is_billed(db: &Database, id: &str) -> bool {
        db.transfers().get_by_id(id).await.unwrap().unwrap().billed
    }

    #[tokio::test]
    async fn test_preview_skips_missing_transfers() {
        let f = fixture().await;
        let ids = vec![f.hourly_id.clone(), "deleted-id".to_string(), f.ride_id.clone()];

        let preview = f
            .service
            .calculate_bill_preview(&f.client_id, &ids, Percent::new(dec!(21)), TaxApplication::Excluded)
            .await
            .unwrap();

        assert_eq!(preview.items.len(), 2);
        assert_eq!(preview.sub_total, Money::new(dec!(175.5)));
        assert_eq!(preview.tax_amount, Money::new(dec!(36.855)));
        assert_eq!(preview.total, Money::new(dec!(212.355)));

        // Nothing persisted.
        assert!(!is_billed(&f.db, &f.hourly_id).await);
    }

    #[tokio::test]
    async fn test_preview_unknown_client() {
        let f = fixture().await;
        let result = f
            .service
            .calculate_bill_preview("nobody", &[f.ride_id.clone()], Percent::ZERO, TaxApplication::Excluded)
            .await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::NotFound { entity: "Client", .. }))
        ));
    }

    #[tokio::test]
    async fn test_preview_is_idempotent() {
        let f = fixture().await;
        let ids = vec![f.hourly_id.clone(), f.ride_id.clone()];
        let rate = Percent::new(dec!(21));

        let a = f
            .service
            .calculate_bill_preview(&f.client_id, &ids, rate, TaxApplication::Included)
            .await
            .unwrap();
        let b = f
            .service
            .calculate_bill_preview(&f.client_id, &ids, rate, TaxApplication::Included)
            .await
            .unwrap();

        assert_eq!(a.totals(), b.totals());
        assert_eq!(a.total, Money::new(dec!(175.5)));
    }

    #[tokio::test]
    async fn test_create_bill_persists_and_claims() {
        let f = fixture().await;

        let created = f
            .service
            .create_bill(new_bill(&f, &[&f.hourly_id, &f.ride_id]))
            .await
            .unwrap();

        assert_eq!(created.bill.number, "INVOICE-2026-0001");
        assert_eq!(created.bill.status, BillStatus::Draft);
        assert_eq!(created.bill.due_date, NaiveDate::from_ymd_opt(2026, 4, 30).unwrap());
        assert_eq!(created.items.len(), 2);

        let stored = f.service.get_bill(&created.bill.id).await.unwrap();
        assert_eq!(stored.bill.sub_total, Money::new(dec!(175.5)));
        assert_eq!(stored.bill.total, Money::new(dec!(212.355)));
        assert_eq!(items_total(&stored.items), stored.bill.sub_total);
        assert_eq!(stored.items[0].transfer_id, f.hourly_id);
        assert_eq!(stored.items[1].unit_price, Money::new(dec!(103.5)));

        assert!(is_billed(&f.db, &f.hourly_id).await);
        assert!(is_billed(&f.db, &f.ride_id).await);
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential() {
        let f = fixture().await;

        let first = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();
        let second = f.service.create_bill(new_bill(&f, &[&f.ride_id])).await.unwrap();

        assert_eq!(first.bill.number, "INVOICE-2026-0001");
        assert_eq!(second.bill.number, "INVOICE-2026-0002");
    }

    #[tokio::test]
    async fn test_number_collision_moves_to_next_sequence() {
        let f = fixture().await;

        let first = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();
        let second = f.service.create_bill(new_bill(&f, &[&f.ride_id])).await.unwrap();
        // Count drops to 1 while INVOICE-2026-0002 still exists.
        f.service.delete_bill(&first.bill.id).await.unwrap();

        let third = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();
        assert_ne!(third.bill.number, second.bill.number);
        assert_eq!(third.bill.number, "INVOICE-2026-0003");
    }

    #[tokio::test]
    async fn test_create_rejects_billed_transfer_and_writes_nothing() {
        let f = fixture().await;
        f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();

        let result = f
            .service
            .create_bill(new_bill(&f, &[&f.ride_id, &f.hourly_id]))
            .await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::TransferAlreadyBilled { .. }))
        ));

        assert!(!is_billed(&f.db, &f.ride_id).await);
        assert_eq!(f.db.bills().count_in_year(2026).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_claim_is_compare_and_set() {
        let f = fixture().await;
        let created = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();

        // Bypass the service check and go straight at the store.
        let mut rogue = created.bill.clone();
        rogue.id = "rogue".into();
        rogue.number = "INVOICE-2026-0999".into();
        let mut item = created.items[0].clone();
        item.id = "rogue-item".into();
        item.bill_id = rogue.id.clone();

        let result = f.db.insert_bill(&rogue, &[item]).await;
        assert!(matches!(result, Err(DbError::TransferClaimed { .. })));
        assert!(f.db.bills().get_by_id("rogue").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_empty_bill_is_rejected() {
        let f = fixture().await;
        let mut request = new_bill(&f, &[]);
        request.transfer_ids = vec!["gone".into()];

        let result = f.service.create_bill(request).await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::Validation(ValidationError::Required { .. })))
        ));
    }

    #[tokio::test]
    async fn test_remove_transfer_unbills_and_recomputes() {
        let f = fixture().await;
        let created = f
            .service
            .create_bill(new_bill(&f, &[&f.hourly_id, &f.ride_id]))
            .await
            .unwrap();

        let updated = f
            .service
            .update_bill_transfers(&created.bill.id, &[], &[f.hourly_id.clone()])
            .await
            .unwrap();

        assert!(!is_billed(&f.db, &f.hourly_id).await);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.bill.sub_total, Money::new(dec!(103.5)));
        assert_eq!(updated.bill.sub_total, items_total(&updated.items));
        assert_eq!(updated.bill.tax_amount, Money::new(dec!(21.735)));
        assert_eq!(updated.bill.total, Money::new(dec!(125.235)));
    }

    #[tokio::test]
    async fn test_add_transfer_claims_and_recomputes() {
        let f = fixture().await;
        let created = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();

        let updated = f
            .service
            .update_bill_transfers(&created.bill.id, &[f.ride_id.clone(), "missing".into()], &[])
            .await
            .unwrap();

        assert!(is_billed(&f.db, &f.ride_id).await);
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.items[1].transfer_id, f.ride_id);
        assert_eq!(updated.bill.sub_total, Money::new(dec!(175.5)));
        assert_eq!(updated.bill.total, Money::new(dec!(212.355)));
    }

    #[tokio::test]
    async fn test_adding_transfer_billed_elsewhere_fails() {
        let f = fixture().await;
        let first = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();
        f.service.create_bill(new_bill(&f, &[&f.ride_id])).await.unwrap();

        let result = f
            .service
            .update_bill_transfers(&first.bill.id, &[f.ride_id.clone()], &[])
            .await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::TransferAlreadyBilled { .. }))
        ));
    }

    #[tokio::test]
    async fn test_terminal_bills_are_locked() {
        let f = fixture().await;
        let created = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();
        let id = created.bill.id.as_str();

        f.service.change_status(id, BillStatus::Sent).await.unwrap();
        let paid = f.service.change_status(id, BillStatus::Paid).await.unwrap();
        assert_eq!(paid.status, BillStatus::Paid);

        let result = f
            .service
            .update_bill_transfers(id, &[f.ride_id.clone()], &[])
            .await;
        assert!(matches!(result, Err(BillingError::Core(CoreError::BillLocked { .. }))));
    }

    #[tokio::test]
    async fn test_invalid_status_transition() {
        let f = fixture().await;
        let created = f.service.create_bill(new_bill(&f, &[&f.hourly_id])).await.unwrap();
        let id = created.bill.id.as_str();

        let result = f.service.change_status(id, BillStatus::Paid).await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::InvalidStatusTransition { .. }))
        ));

        f.service.change_status(id, BillStatus::Cancelled).await.unwrap();
        assert!(f.service.change_status(id, BillStatus::Draft).await.is_err());

        let stored = f.service.get_bill(id).await.unwrap();
        assert_eq!(stored.bill.status, BillStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_delete_bill_unbills_everything() {
        let f = fixture().await;
        let created = f
            .service
            .create_bill(new_bill(&f, &[&f.hourly_id, &f.ride_id]))
            .await
            .unwrap();

        let unbilled = f.service.delete_bill(&created.bill.id).await.unwrap();
        assert_eq!(unbilled.len(), 2);
        assert!(!is_billed(&f.db, &f.hourly_id).await);
        assert!(!is_billed(&f.db, &f.ride_id).await);
        assert!(matches!(
            f.service.get_bill(&created.bill.id).await,
            Err(BillingError::Core(CoreError::NotFound { .. }))
        ));

        // Transfers can be billed again.
        f.service
            .create_bill(new_bill(&f, &[&f.hourly_id, &f.ride_id]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transfer_of_other_client_is_rejected() {
        let f = fixture().await;
        let other = f
            .db
            .clients()
            .create(&NewClient {
                name: "Other Travel".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let foreign = f.db.transfers().insert(&draft(&other.id)).await.unwrap();

        let result = f
            .service
            .create_bill(new_bill(&f, &[&f.hourly_id, &foreign.id]))
            .await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::Validation(ValidationError::NotAllowed { .. })))
        ));
    }

    /// Database whose bill count is unavailable.
    struct CountUnavailable(Database);

    #[async_trait::async_trait]
    impl BillingStore for CountUnavailable {
        async fn get_client(&self, id: &str) -> crate::DbResult<Option<ridebill_core::Client>> {
            self.0.get_client(id).await
        }

        async fn get_transfer(&self, id: &str) -> crate::DbResult<Option<ridebill_core::Transfer>> {
            self.0.get_transfer(id).await
        }

        async fn get_bill(&self, id: &str) -> crate::DbResult<Option<Bill>> {
            BillingStore::get_bill(&self.0, id).await
        }

        async fn list_bill_items(&self, bill_id: &str) -> crate::DbResult<Vec<BillItem>> {
            self.0.list_bill_items(bill_id).await
        }

        async fn count_bills_in_year(&self, _year: i32) -> crate::DbResult<i64> {
            Err(DbError::QueryFailed("bills table locked".into()))
        }

        async fn insert_bill(&self, bill: &Bill, items: &[BillItem]) -> crate::DbResult<()> {
            self.0.insert_bill(bill, items).await
        }

        async fn apply_bill_changes(
            &self,
            changes: &BillChanges,
        ) -> crate::DbResult<ridebill_core::billing::BillTotals> {
            self.0.apply_bill_changes(changes).await
        }

        async fn update_bill_status(
            &self,
            bill_id: &str,
            from: BillStatus,
            to: BillStatus,
        ) -> crate::DbResult<()> {
            self.0.update_bill_status(bill_id, from, to).await
        }

        async fn delete_bill(&self, bill_id: &str) -> crate::DbResult<Vec<String>> {
            BillingStore::delete_bill(&self.0, bill_id).await
        }
    }

    #[tokio::test]
    async fn test_clock_number_uses_invoice_year() {
        let f = fixture().await;
        let service = BillingService::new(CountUnavailable(f.db.clone()));

        let mut request = new_bill(&f, &[&f.hourly_id]);
        request.date = NaiveDate::from_ymd_opt(2025, 12, 30);
        let created = service.create_bill(request).await.unwrap();

        assert!(created.bill.number.starts_with("INVOICE-2025-"));
        assert_eq!(created.bill.number.len(), "INVOICE-2025-0000".len());
    }

    #[tokio::test]
    async fn test_unreasonable_payment_terms_write_nothing() {
        let f = fixture().await;
        let service = f.service.clone().with_payment_terms(i64::MAX);

        let result = service.create_bill(new_bill(&f, &[&f.hourly_id])).await;
        assert!(matches!(
            result,
            Err(BillingError::Core(CoreError::Validation(ValidationError::OutOfRange { .. })))
        ));
        assert!(!is_billed(&f.db, &f.hourly_id).await);
        assert_eq!(f.db.bills().count_in_year(2026).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_preview_accepts_rates_above_one_hundred() {
        let f = fixture().await;

        let preview = f
            .service
            .calculate_bill_preview(
                &f.client_id,
                &[f.hourly_id.clone()],
                Percent::new(dec!(150)),
                TaxApplication::Excluded,
            )
            .await
            .unwrap();
        assert_eq!(preview.tax_amount, Money::new(dec!(108)));
        assert_eq!(preview.total, Money::new(dec!(180)));
    }
}
