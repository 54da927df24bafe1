//! # Bill Repository
//!
//! Database operations for bills and bill items.
//!
//! ## Claiming Transfers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION (insert_bill)                      │
//! │                                                                         │
//! │  1. INSERT INTO bills (...)              ← UNIQUE(number)               │
//! │                                                                         │
//! │  2. for each item:                                                      │
//! │     UPDATE transfers SET billed = 1                                     │
//! │      WHERE id = ? AND billed = 0         ← compare-and-set              │
//! │     0 rows? → ROLLBACK, TransferClaimed                                 │
//! │     INSERT INTO bill_items (...)         ← UNIQUE(transfer_id)          │
//! │                                                                         │
//! │  COMMIT ← bill, items and billed flags appear together or not at all    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping a `Transaction` without committing rolls it back, so every early
//! return below leaves the database untouched.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use super::{parse_money, parse_percent};
use crate::error::{DbError, DbResult};
use ridebill_core::billing::BillTotals;
use ridebill_core::{Bill, BillItem, BillStatus, Money, TaxApplication};

const SELECT_BILL: &str = r#"
    SELECT
        id, number, client_id, date, due_date, status,
        tax_rate, tax_application, sub_total, tax_amount, total,
        notes, created_at, updated_at
    FROM bills
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, bill_id, transfer_id, description, unit_price, created_at
    FROM bill_items
"#;

#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: String,
    number: String,
    client_id: String,
    date: NaiveDate,
    due_date: NaiveDate,
    status: BillStatus,
    tax_rate: String,
    tax_application: TaxApplication,
    sub_total: String,
    tax_amount: String,
    total: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BillRow> for Bill {
    type Error = DbError;

    fn try_from(row: BillRow) -> DbResult<Self> {
        const TABLE: &str = "bills";

        Ok(Bill {
            tax_rate: parse_percent(TABLE, &row.id, "tax_rate", &row.tax_rate)?,
            sub_total: parse_money(TABLE, &row.id, "sub_total", &row.sub_total)?,
            tax_amount: parse_money(TABLE, &row.id, "tax_amount", &row.tax_amount)?,
            total: parse_money(TABLE, &row.id, "total", &row.total)?,
            id: row.id,
            number: row.number,
            client_id: row.client_id,
            date: row.date,
            due_date: row.due_date,
            status: row.status,
            tax_application: row.tax_application,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BillItemRow {
    id: String,
    bill_id: String,
    transfer_id: String,
    description: String,
    unit_price: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BillItemRow> for BillItem {
    type Error = DbError;

    fn try_from(row: BillItemRow) -> DbResult<Self> {
        Ok(BillItem {
            unit_price: parse_money("bill_items", &row.id, "unit_price", &row.unit_price)?,
            id: row.id,
            bill_id: row.bill_id,
            transfer_id: row.transfer_id,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// Filters for [`BillRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub client_id: Option<String>,
    pub status: Option<BillStatus>,
}

/// Item changes applied to an existing bill in one transaction.
#[derive(Debug, Clone, Default)]
pub struct BillChanges {
    pub bill_id: String,
    /// Transfers whose items are removed (and which become unbilled).
    pub removed_transfer_ids: Vec<String>,
    /// New items; their transfers are claimed.
    pub added_items: Vec<BillItem>,
}

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let row = sqlx::query_as::<_, BillRow>(&format!("{SELECT_BILL} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bill::try_from).transpose()
    }

    /// Gets a bill by its invoice number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Bill>> {
        let row = sqlx::query_as::<_, BillRow>(&format!("{SELECT_BILL} WHERE number = ?1"))
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bill::try_from).transpose()
    }

    /// Lists bills, newest first.
    pub async fn list(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        let rows = sqlx::query_as::<_, BillRow>(&format!(
            "{SELECT_BILL}
             WHERE (?1 IS NULL OR client_id = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY date DESC, number DESC"
        ))
        .bind(&filter.client_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed bills");
        rows.into_iter().map(Bill::try_from).collect()
    }

    /// Gets a bill's items in line order.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let rows = sqlx::query_as::<_, BillItemRow>(&format!(
            "{SELECT_ITEM} WHERE bill_id = ?1 ORDER BY position"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BillItem::try_from).collect()
    }

    /// Counts bills dated in the given calendar year.
    pub async fn count_in_year(&self, year: i32) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE substr(date, 1, 4) = ?1")
                .bind(format!("{year:04}"))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Inserts a bill with its items and marks their transfers billed.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on `bills.number` - number taken
    /// * `Err(DbError::TransferClaimed)` - a transfer was already billed
    pub async fn insert_with_items(&self, bill: &Bill, items: &[BillItem]) -> DbResult<()> {
        debug!(
            id = %bill.id,
            number = %bill.number,
            items = items.len(),
            "Inserting bill"
        );

        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, number, client_id, date, due_date, status,
                tax_rate, tax_application, sub_total, tax_amount, total,
                notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.number)
        .bind(&bill.client_id)
        .bind(bill.date)
        .bind(bill.due_date)
        .bind(bill.status)
        .bind(bill.tax_rate.value().to_string())
        .bind(bill.tax_application)
        .bind(bill.sub_total.amount().to_string())
        .bind(bill.tax_amount.amount().to_string())
        .bind(bill.total.amount().to_string())
        .bind(&bill.notes)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            claim_transfer(&mut tx, &item.transfer_id).await?;
            insert_item(&mut tx, item).await?;
        }

        commit(tx).await?;

        info!(id = %bill.id, number = %bill.number, total = %bill.total, "Bill created");
        Ok(())
    }

    /// Removes and adds items, then recomputes the bill's totals from the
    /// resulting item set using the bill's stored tax settings.
    ///
    /// Only draft and sent bills are touched.
    pub async fn apply_changes(&self, changes: &BillChanges) -> DbResult<BillTotals> {
        let bill_id = changes.bill_id.as_str();
        debug!(
            bill_id = %bill_id,
            removed = changes.removed_transfer_ids.len(),
            added = changes.added_items.len(),
            "Applying bill changes"
        );

        let mut tx = self.begin().await?;

        let (tax_rate, tax_application): (String, TaxApplication) = sqlx::query_as(
            "SELECT tax_rate, tax_application FROM bills
             WHERE id = ?1 AND status IN ('draft', 'sent')",
        )
        .bind(bill_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Bill (editable)", bill_id))?;
        let tax_rate = parse_percent("bills", bill_id, "tax_rate", &tax_rate)?;

        for transfer_id in &changes.removed_transfer_ids {
            let removed = sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1 AND transfer_id = ?2")
                .bind(bill_id)
                .bind(transfer_id)
                .execute(&mut *tx)
                .await?;

            if removed.rows_affected() > 0 {
                sqlx::query("UPDATE transfers SET billed = 0, updated_at = ?2 WHERE id = ?1")
                    .bind(transfer_id)
                    .bind(Utc::now())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for item in &changes.added_items {
            claim_transfer(&mut tx, &item.transfer_id).await?;
            insert_item(&mut tx, item).await?;
        }

        let prices: Vec<String> =
            sqlx::query_scalar("SELECT unit_price FROM bill_items WHERE bill_id = ?1")
                .bind(bill_id)
                .fetch_all(&mut *tx)
                .await?;
        let prices = prices
            .iter()
            .map(|raw| parse_money("bill_items", bill_id, "unit_price", raw))
            .collect::<DbResult<Vec<Money>>>()?;

        // Dropping the transaction on error rolls the item changes back.
        let totals = BillTotals::from_lines(prices, tax_rate, tax_application)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE bills SET
                sub_total = ?2,
                tax_amount = ?3,
                total = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(bill_id)
        .bind(totals.sub_total.amount().to_string())
        .bind(totals.tax_amount.amount().to_string())
        .bind(totals.total.amount().to_string())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;

        info!(bill_id = %bill_id, sub_total = %totals.sub_total, total = %totals.total, "Bill totals recomputed");
        Ok(totals)
    }

    /// Moves a bill from `from` to `to`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Bill missing, or no longer in `from`
    pub async fn update_status(&self, bill_id: &str, from: BillStatus, to: BillStatus) -> DbResult<()> {
        debug!(bill_id = %bill_id, from = %from, to = %to, "Updating bill status");

        let result = sqlx::query(
            "UPDATE bills SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(bill_id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("Bill ({from})"), bill_id));
        }

        Ok(())
    }

    /// Deletes a bill and its items, unbilling every referenced transfer.
    ///
    /// ## Returns
    /// The IDs of the transfers that were unbilled.
    pub async fn delete(&self, bill_id: &str) -> DbResult<Vec<String>> {
        let mut tx = self.begin().await?;

        let transfer_ids: Vec<String> = sqlx::query_scalar(
            "SELECT transfer_id FROM bill_items WHERE bill_id = ?1 ORDER BY position",
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE transfers SET billed = 0, updated_at = ?2
             WHERE id IN (SELECT transfer_id FROM bill_items WHERE bill_id = ?1)",
        )
        .bind(bill_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", bill_id));
        }

        commit(tx).await?;

        info!(bill_id = %bill_id, unbilled = transfer_ids.len(), "Bill deleted");
        Ok(transfer_ids)
    }

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

/// Marks a transfer billed if, and only if, it is currently unbilled.
async fn claim_transfer(tx: &mut Transaction<'static, Sqlite>, transfer_id: &str) -> DbResult<()> {
    let claimed = sqlx::query("UPDATE transfers SET billed = 1, updated_at = ?2 WHERE id = ?1 AND billed = 0")
        .bind(transfer_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

    if claimed.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM transfers WHERE id = ?1")
            .bind(transfer_id)
            .fetch_optional(&mut **tx)
            .await?;

        return Err(match exists {
            Some(_) => DbError::TransferClaimed {
                transfer_id: transfer_id.to_string(),
            },
            None => DbError::not_found("Transfer", transfer_id),
        });
    }

    Ok(())
}

async fn insert_item(tx: &mut Transaction<'static, Sqlite>, item: &BillItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_items (
            id, bill_id, transfer_id, position, description, unit_price, created_at
        ) VALUES (
            ?1, ?2, ?3,
            (SELECT COALESCE(MAX(position), 0) + 1 FROM bill_items WHERE bill_id = ?2),
            ?4, ?5, ?6
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.bill_id)
    .bind(&item.transfer_id)
    .bind(&item.description)
    .bind(item.unit_price.amount().to_string())
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use ridebill_core::{NewClient, Percent, ServiceType, TransferDraft};
    use rust_decimal_macros::dec;

    async fn seeded() -> (Database, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = db
            .clients()
            .create(&NewClient {
                name: "Palm Residences".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let transfer = db
            .transfers()
            .insert(&TransferDraft {
                client_id: client.id.clone(),
                date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
                pickup_time: None,
                origin: None,
                destination: None,
                passengers: 1,
                service_type: ServiceType::PointToPoint,
                price: Money::new(dec!(60)),
                hours: None,
                discount: Default::default(),
                extra_charges: vec![],
                commission: Default::default(),
                collaborator: None,
                notes: None,
            })
            .await
            .unwrap();
        (db, client.id, transfer.id)
    }

    fn bill(client_id: &str, number: &str) -> Bill {
        let date = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let totals = BillTotals::compute(
            Money::new(dec!(60)),
            Percent::new(dec!(10)),
            TaxApplication::Excluded,
        )
        .unwrap();
        Bill {
            id: format!("bill-{number}"),
            number: number.to_string(),
            client_id: client_id.to_string(),
            date,
            due_date: date,
            status: BillStatus::Draft,
            tax_rate: Percent::new(dec!(10)),
            tax_application: TaxApplication::Excluded,
            sub_total: totals.sub_total,
            tax_amount: totals.tax_amount,
            total: totals.total,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(bill: &Bill, transfer_id: &str) -> BillItem {
        BillItem {
            id: format!("item-{transfer_id}"),
            bill_id: bill.id.clone(),
            transfer_id: transfer_id.to_string(),
            description: "10/02/2026 - Point to point".into(),
            unit_price: Money::new(dec!(60)),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (db, client_id, transfer_id) = seeded().await;
        let bill = bill(&client_id, "INVOICE-2026-0001");

        db.bills()
            .insert_with_items(&bill, &[item(&bill, &transfer_id)])
            .await
            .unwrap();

        let stored = db.bills().get_by_number("INVOICE-2026-0001").await.unwrap().unwrap();
        assert_eq!(stored.id, bill.id);
        assert_eq!(stored.total, Money::new(dec!(66)));
        assert_eq!(stored.tax_rate, Percent::new(dec!(10)));

        let items = db.bills().get_items(&bill.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, Money::new(dec!(60)));

        assert_eq!(db.bills().count_in_year(2026).await.unwrap(), 1);
        assert_eq!(db.bills().count_in_year(2025).await.unwrap(), 0);

        let transfer = db.transfers().get_by_id(&transfer_id).await.unwrap().unwrap();
        assert!(transfer.billed);
    }

    #[tokio::test]
    async fn test_duplicate_number_is_reported_and_rolled_back() {
        let (db, client_id, transfer_id) = seeded().await;
        let first = bill(&client_id, "INVOICE-2026-0001");
        db.bills().insert_with_items(&first, &[]).await.unwrap();

        let mut second = bill(&client_id, "INVOICE-2026-0001");
        second.id = "bill-other".into();
        let err = db
            .bills()
            .insert_with_items(&second, &[item(&second, &transfer_id)])
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on("bills.number"));
        let transfer = db.transfers().get_by_id(&transfer_id).await.unwrap().unwrap();
        assert!(!transfer.billed);
    }

    #[tokio::test]
    async fn test_status_compare_and_set() {
        let (db, client_id, _) = seeded().await;
        let bill = bill(&client_id, "INVOICE-2026-0001");
        db.bills().insert_with_items(&bill, &[]).await.unwrap();

        db.bills()
            .update_status(&bill.id, BillStatus::Draft, BillStatus::Sent)
            .await
            .unwrap();

        // Stale `from` no longer matches.
        let err = db
            .bills()
            .update_status(&bill.id, BillStatus::Draft, BillStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let sent = db
            .bills()
            .list(&BillFilter {
                status: Some(BillStatus::Sent),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
    }

    #[tokio::test]
    async fn test_changes_on_locked_bill_are_refused() {
        let (db, client_id, transfer_id) = seeded().await;
        let mut bill = bill(&client_id, "INVOICE-2026-0001");
        bill.status = BillStatus::Paid;
        db.bills().insert_with_items(&bill, &[]).await.unwrap();

        let err = db
            .bills()
            .apply_changes(&BillChanges {
                bill_id: bill.id.clone(),
                removed_transfer_ids: vec![],
                added_items: vec![item(&bill, &transfer_id)],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db.bills().get_items(&bill.id).await.unwrap().is_empty());
    }
}
