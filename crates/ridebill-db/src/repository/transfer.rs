//! # Transfer Repository
//!
//! Database operations for transfers.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Transfer (domain)              transfers (row)                         │
//! │  ─────────────────              ───────────────                         │
//! │  price: Money           ──►     price TEXT            "45.5"            │
//! │  discount: Adjustment   ──►     discount_type TEXT    'percentage'      │
//! │                                 discount_value TEXT   "10"              │
//! │  extra_charges: Vec<..> ──►     extra_charges TEXT    '[{"name":..}]'   │
//! │  collaborator: Option   ──►     collaborator_kind     'partner'         │
//! │                                 collaborator_name     'Acme Cabs'       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `billed` flag is only written by [`BillRepository`](super::bill::BillRepository),
//! inside the transactions that add or remove bill items.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Arguments, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{parse_money, parse_optional_decimal};
use crate::error::{DbError, DbResult};
use ridebill_core::{
    Adjustment, AdjustmentKind, Collaborator, CollaboratorKind, ExtraCharge, ServiceType,
    Transfer, TransferDraft,
};

pub(crate) const SELECT_TRANSFER: &str = r#"
    SELECT
        id, client_id, date, pickup_time, origin, destination, passengers,
        service_type, price, hours,
        discount_type, discount_value,
        extra_charges,
        commission_type, commission_value,
        collaborator_kind, collaborator_name,
        billed, notes, created_at, updated_at
    FROM transfers
"#;

/// Raw `transfers` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransferRow {
    id: String,
    client_id: String,
    date: NaiveDate,
    pickup_time: Option<NaiveTime>,
    origin: Option<String>,
    destination: Option<String>,
    passengers: i64,
    service_type: ServiceType,
    price: String,
    hours: Option<i64>,
    discount_type: Option<AdjustmentKind>,
    discount_value: Option<String>,
    extra_charges: String,
    commission_type: Option<AdjustmentKind>,
    commission_value: Option<String>,
    collaborator_kind: Option<CollaboratorKind>,
    collaborator_name: Option<String>,
    billed: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransferRow> for Transfer {
    type Error = DbError;

    fn try_from(row: TransferRow) -> DbResult<Self> {
        const TABLE: &str = "transfers";

        let price = parse_money(TABLE, &row.id, "price", &row.price)?;
        let discount = Adjustment::from_parts(
            row.discount_type,
            parse_optional_decimal(TABLE, &row.id, "discount_value", row.discount_value.as_deref())?,
        );
        let commission = Adjustment::from_parts(
            row.commission_type,
            parse_optional_decimal(
                TABLE,
                &row.id,
                "commission_value",
                row.commission_value.as_deref(),
            )?,
        );
        let extra_charges: Vec<ExtraCharge> = serde_json::from_str(&row.extra_charges)
            .map_err(|e| DbError::corrupt(TABLE, &row.id, "extra_charges", e))?;

        Ok(Transfer {
            id: row.id,
            client_id: row.client_id,
            date: row.date,
            pickup_time: row.pickup_time,
            origin: row.origin,
            destination: row.destination,
            passengers: row.passengers,
            service_type: row.service_type,
            price,
            hours: row.hours,
            discount,
            extra_charges,
            commission,
            collaborator: Collaborator::from_parts(row.collaborator_kind, row.collaborator_name),
            billed: row.billed,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Filters for [`TransferRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub client_id: Option<String>,
    pub billed: Option<bool>,
    /// Inclusive lower bound on the service date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the service date.
    pub to: Option<NaiveDate>,
}

impl TransferFilter {
    /// Unbilled transfers of one client, the candidates for a new bill.
    pub fn unbilled_for(client_id: impl Into<String>) -> Self {
        TransferFilter {
            client_id: Some(client_id.into()),
            billed: Some(false),
            ..Default::default()
        }
    }
}

/// Column values shared by insert and update.
struct TransferColumns {
    price: String,
    discount_type: Option<AdjustmentKind>,
    discount_value: Option<String>,
    extra_charges: String,
    commission_type: Option<AdjustmentKind>,
    commission_value: Option<String>,
    collaborator_kind: Option<CollaboratorKind>,
    collaborator_name: Option<String>,
}

impl TransferColumns {
    fn from_draft(draft: &TransferDraft) -> DbResult<Self> {
        let (discount_type, discount_value) = draft.discount.to_parts();
        let (commission_type, commission_value) = draft.commission.to_parts();
        let extra_charges = serde_json::to_string(&draft.extra_charges)
            .map_err(|e| DbError::Internal(format!("Failed to encode extra charges: {e}")))?;

        Ok(TransferColumns {
            price: draft.price.amount().to_string(),
            discount_type,
            discount_value: discount_value.map(|v| v.to_string()),
            extra_charges,
            commission_type,
            commission_value: commission_value.map(|v| v.to_string()),
            collaborator_kind: draft.collaborator.as_ref().map(Collaborator::kind),
            collaborator_name: draft
                .collaborator
                .as_ref()
                .and_then(|c| c.name().map(str::to_string)),
        })
    }
}

/// Repository for transfer database operations.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Gets a transfer by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Transfer))` - Transfer found
    /// * `Ok(None)` - Transfer not found
    /// * `Err(DbError::CorruptRow)` - Stored row cannot be decoded
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transfer>> {
        let row = sqlx::query_as::<_, TransferRow>(&format!("{SELECT_TRANSFER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Transfer::try_from).transpose()
    }

    /// Lists transfers matching the filter, oldest service date first.
    pub async fn list(&self, filter: &TransferFilter) -> DbResult<Vec<Transfer>> {
        let mut clauses = Vec::new();
        let mut args = SqliteArguments::default();

        if let Some(client_id) = &filter.client_id {
            clauses.push("client_id = ?");
            add_arg(&mut args, client_id.clone())?;
        }
        if let Some(billed) = filter.billed {
            clauses.push("billed = ?");
            add_arg(&mut args, billed)?;
        }
        if let Some(from) = filter.from {
            clauses.push("date >= ?");
            add_arg(&mut args, from)?;
        }
        if let Some(to) = filter.to {
            clauses.push("date <= ?");
            add_arg(&mut args, to)?;
        }

        let mut sql = SELECT_TRANSFER.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date, pickup_time, created_at");

        let rows = sqlx::query_as_with::<_, TransferRow, _>(&sql, args)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed transfers");
        rows.into_iter().map(Transfer::try_from).collect()
    }

    /// Inserts a new, unbilled transfer.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - `client_id` doesn't exist
    pub async fn insert(&self, draft: &TransferDraft) -> DbResult<Transfer> {
        let transfer = draft
            .clone()
            .into_transfer(Uuid::new_v4().to_string(), Utc::now());
        let columns = TransferColumns::from_draft(draft)?;

        debug!(
            id = %transfer.id,
            client_id = %transfer.client_id,
            service_type = transfer.service_type.as_str(),
            "Inserting transfer"
        );

        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, client_id, date, pickup_time, origin, destination, passengers,
                service_type, price, hours,
                discount_type, discount_value,
                extra_charges,
                commission_type, commission_value,
                collaborator_kind, collaborator_name,
                billed, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12,
                ?13,
                ?14, ?15,
                ?16, ?17,
                0, ?18, ?19, ?20
            )
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.client_id)
        .bind(transfer.date)
        .bind(transfer.pickup_time)
        .bind(&transfer.origin)
        .bind(&transfer.destination)
        .bind(transfer.passengers)
        .bind(transfer.service_type)
        .bind(&columns.price)
        .bind(transfer.hours)
        .bind(columns.discount_type)
        .bind(&columns.discount_value)
        .bind(&columns.extra_charges)
        .bind(columns.commission_type)
        .bind(&columns.commission_value)
        .bind(columns.collaborator_kind)
        .bind(&columns.collaborator_name)
        .bind(&transfer.notes)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(transfer)
    }

    /// Replaces a transfer's details, provided it is not on a bill.
    ///
    /// ## Returns
    /// * `Ok(Some(Transfer))` - Updated
    /// * `Ok(None)` - Transfer missing or already billed (nothing written)
    pub async fn update_unbilled(
        &self,
        id: &str,
        draft: &TransferDraft,
    ) -> DbResult<Option<Transfer>> {
        let columns = TransferColumns::from_draft(draft)?;

        debug!(id = %id, "Updating transfer");

        let result = sqlx::query(
            r#"
            UPDATE transfers SET
                client_id = ?2,
                date = ?3,
                pickup_time = ?4,
                origin = ?5,
                destination = ?6,
                passengers = ?7,
                service_type = ?8,
                price = ?9,
                hours = ?10,
                discount_type = ?11,
                discount_value = ?12,
                extra_charges = ?13,
                commission_type = ?14,
                commission_value = ?15,
                collaborator_kind = ?16,
                collaborator_name = ?17,
                notes = ?18,
                updated_at = ?19
            WHERE id = ?1 AND billed = 0
            "#,
        )
        .bind(id)
        .bind(&draft.client_id)
        .bind(draft.date)
        .bind(draft.pickup_time)
        .bind(&draft.origin)
        .bind(&draft.destination)
        .bind(draft.passengers)
        .bind(draft.service_type)
        .bind(&columns.price)
        .bind(draft.hours)
        .bind(columns.discount_type)
        .bind(&columns.discount_value)
        .bind(&columns.extra_charges)
        .bind(columns.commission_type)
        .bind(&columns.commission_value)
        .bind(columns.collaborator_kind)
        .bind(&columns.collaborator_name)
        .bind(&draft.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Deletes a transfer that is not on a bill.
    ///
    /// ## Returns
    /// * `Ok(true)` - Deleted
    /// * `Ok(false)` - Transfer missing or already billed
    pub async fn delete_unbilled(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting transfer");

        let result = sqlx::query("DELETE FROM transfers WHERE id = ?1 AND billed = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts transfers, optionally only unbilled ones.
    pub async fn count(&self, unbilled_only: bool) -> DbResult<i64> {
        let sql = if unbilled_only {
            "SELECT COUNT(*) FROM transfers WHERE billed = 0"
        } else {
            "SELECT COUNT(*) FROM transfers"
        };
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn add_arg<'q, T>(args: &mut SqliteArguments<'q>, value: T) -> DbResult<()>
where
    T: 'q + Send + sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    args.add(value)
        .map_err(|e| DbError::QueryFailed(format!("Failed to bind filter: {e}")))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use ridebill_core::{Money, NewClient, Percent};
    use rust_decimal_macros::dec;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = db
            .clients()
            .create(&NewClient {
                name: "Hotel Miramar".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (db, client.id)
    }

    fn draft(client_id: &str, day: u32) -> TransferDraft {
        TransferDraft {
            client_id: client_id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            pickup_time: NaiveTime::from_hms_opt(9, 30, 0),
            origin: Some("Airport".into()),
            destination: Some("Hotel Miramar".into()),
            passengers: 3,
            service_type: ServiceType::PointToPoint,
            price: Money::new(dec!(100)),
            hours: None,
            discount: Adjustment::Fixed(Money::new(dec!(10))),
            extra_charges: vec![ExtraCharge::new("Child seat", Money::new(dec!(25)))],
            commission: Adjustment::Percentage(Percent::new(dec!(10))),
            collaborator: Some(Collaborator::Partner("Acme Cabs".into())),
            notes: Some("Flight IB3456".into()),
        }
    }

    #[tokio::test]
    async fn test_insert_round_trips_all_columns() {
        let (db, client_id) = setup().await;

        let created = db.transfers().insert(&draft(&client_id, 14)).await.unwrap();
        let fetched = db.transfers().get_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.price, Money::new(dec!(100)));
        assert_eq!(fetched.discount, Adjustment::Fixed(Money::new(dec!(10))));
        assert_eq!(fetched.commission, Adjustment::Percentage(Percent::new(dec!(10))));
        assert_eq!(fetched.extra_charges.len(), 1);
        assert_eq!(fetched.collaborator, Some(Collaborator::Partner("Acme Cabs".into())));
        assert_eq!(fetched.pickup_time, NaiveTime::from_hms_opt(9, 30, 0));
        assert!(!fetched.billed);
        assert_eq!(
            ridebill_core::pricing::total_price(&fetched).unwrap(),
            Money::new(dec!(103.5))
        );
    }

    #[tokio::test]
    async fn test_insert_requires_existing_client() {
        let (db, _) = setup().await;
        let result = db.transfers().insert(&draft("no-such-client", 14)).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, client_id) = setup().await;
        for day in [20, 3, 11] {
            db.transfers().insert(&draft(&client_id, day)).await.unwrap();
        }

        let all = db.transfers().list(&TransferFilter::default()).await.unwrap();
        let days: Vec<_> = all.iter().map(|t| t.date.format("%d").to_string()).collect();
        assert_eq!(days, ["03", "11", "20"]);

        let ranged = db
            .transfers()
            .list(&TransferFilter {
                from: NaiveDate::from_ymd_opt(2026, 3, 5),
                to: NaiveDate::from_ymd_opt(2026, 3, 20),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.len(), 2);

        let unbilled = db
            .transfers()
            .list(&TransferFilter::unbilled_for(&client_id))
            .await
            .unwrap();
        assert_eq!(unbilled.len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_unbilled() {
        let (db, client_id) = setup().await;
        let created = db.transfers().insert(&draft(&client_id, 14)).await.unwrap();

        let mut hourly = draft(&client_id, 14);
        hourly.service_type = ServiceType::Hourly;
        hourly.hours = Some(4);
        hourly.price = Money::new(dec!(20));
        hourly.collaborator = Some(Collaborator::SelfService);

        let updated = db
            .transfers()
            .update_unbilled(&created.id, &hourly)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.service_type, ServiceType::Hourly);
        assert_eq!(updated.hours, Some(4));
        assert_eq!(updated.collaborator, Some(Collaborator::SelfService));

        assert!(db.transfers().delete_unbilled(&created.id).await.unwrap());
        assert!(!db.transfers().delete_unbilled(&created.id).await.unwrap());
        assert!(db
            .transfers()
            .update_unbilled(&created.id, &hourly)
            .await
            .unwrap()
            .is_none());
    }
}
