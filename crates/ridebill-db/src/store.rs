//! # Billing Store
//!
//! The data-access seam of the billing workflow.
//!
//! [`BillingService`](crate::service::BillingService) only talks to a
//! `BillingStore`, never to SQL directly. [`Database`] is the production
//! implementation; the multi-row writes (`insert_bill`,
//! `apply_bill_changes`, `delete_bill`) must be atomic in any implementation.

use async_trait::async_trait;

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::bill::BillChanges;
use ridebill_core::billing::BillTotals;
use ridebill_core::{Bill, BillItem, BillStatus, Client, Transfer};

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn get_client(&self, id: &str) -> DbResult<Option<Client>>;

    async fn get_transfer(&self, id: &str) -> DbResult<Option<Transfer>>;

    async fn get_bill(&self, id: &str) -> DbResult<Option<Bill>>;

    async fn list_bill_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>>;

    /// Number of bills dated in `year`.
    async fn count_bills_in_year(&self, year: i32) -> DbResult<i64>;

    /// Persists the bill and its items, claiming every item's transfer.
    ///
    /// Fails with `TransferClaimed` (and writes nothing) if any transfer is
    /// already billed.
    async fn insert_bill(&self, bill: &Bill, items: &[BillItem]) -> DbResult<()>;

    /// Applies item removals and additions and stores recomputed totals.
    async fn apply_bill_changes(&self, changes: &BillChanges) -> DbResult<BillTotals>;

    /// Compare-and-set on the bill status.
    async fn update_bill_status(&self, bill_id: &str, from: BillStatus, to: BillStatus)
        -> DbResult<()>;

    /// Deletes the bill, returning the transfers that were unbilled.
    async fn delete_bill(&self, bill_id: &str) -> DbResult<Vec<String>>;
}

#[async_trait]
impl BillingStore for Database {
    async fn get_client(&self, id: &str) -> DbResult<Option<Client>> {
        self.clients().get_by_id(id).await
    }

    async fn get_transfer(&self, id: &str) -> DbResult<Option<Transfer>> {
        self.transfers().get_by_id(id).await
    }

    async fn get_bill(&self, id: &str) -> DbResult<Option<Bill>> {
        self.bills().get_by_id(id).await
    }

    async fn list_bill_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        self.bills().get_items(bill_id).await
    }

    async fn count_bills_in_year(&self, year: i32) -> DbResult<i64> {
        self.bills().count_in_year(year).await
    }

    async fn insert_bill(&self, bill: &Bill, items: &[BillItem]) -> DbResult<()> {
        self.bills().insert_with_items(bill, items).await
    }

    async fn apply_bill_changes(&self, changes: &BillChanges) -> DbResult<BillTotals> {
        self.bills().apply_changes(changes).await
    }

    async fn update_bill_status(
        &self,
        bill_id: &str,
        from: BillStatus,
        to: BillStatus,
    ) -> DbResult<()> {
        self.bills().update_status(bill_id, from, to).await
    }

    async fn delete_bill(&self, bill_id: &str) -> DbResult<Vec<String>> {
        self.bills().delete(bill_id).await
    }
}
