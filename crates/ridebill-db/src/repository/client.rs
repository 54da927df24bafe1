//! # Client Repository
//!
//! Database operations for clients.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ridebill_core::{Client, NewClient};

const SELECT_CLIENT: &str = r#"
    SELECT id, name, tax_id, email, phone, address, created_at, updated_at
    FROM clients
"#;

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Gets a client by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Client))` - Client found
    /// * `Ok(None)` - Client not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!("{SELECT_CLIENT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Lists all clients ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let clients =
            sqlx::query_as::<_, Client>(&format!("{SELECT_CLIENT} ORDER BY name COLLATE NOCASE"))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = clients.len(), "Listed clients");
        Ok(clients)
    }

    /// Inserts a new client with a generated ID.
    pub async fn create(&self, input: &NewClient) -> DbResult<Client> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            tax_id: input.tax_id.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, tax_id, email, phone, address, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    /// Replaces a client's details.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Client doesn't exist
    pub async fn update(&self, id: &str, input: &NewClient) -> DbResult<Client> {
        debug!(id = %id, "Updating client");

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?2,
                tax_id = ?3,
                email = ?4,
                phone = ?5,
                address = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.tax_id)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Deletes a client.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Client still has transfers or bills
    /// * `Err(DbError::NotFound)` - Client doesn't exist
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting client");

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// Counts all clients.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use ridebill_core::NewClient;

    fn hotel() -> NewClient {
        NewClient {
            name: "Hotel Miramar".into(),
            tax_id: Some("B12345678".into()),
            email: Some("ops@miramar.es".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let created = db.clients().create(&hotel()).await.unwrap();
        let fetched = db.clients().get_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "Hotel Miramar");
        assert_eq!(fetched.tax_id.as_deref(), Some("B12345678"));
        assert_eq!(db.clients().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.clients().create(&hotel()).await.unwrap();

        let mut changed = hotel();
        changed.phone = Some("+34 600 000 000".into());
        let updated = db.clients().update(&created.id, &changed).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+34 600 000 000"));

        db.clients().delete(&created.id).await.unwrap();
        assert!(db.clients().get_by_id(&created.id).await.unwrap().is_none());
        assert!(matches!(
            db.clients().delete(&created.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for name in ["zeta travel", "Alpha Tours", "mid Cabs"] {
            db.clients()
                .create(&NewClient {
                    name: name.into(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let names: Vec<_> = db
            .clients()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Alpha Tours", "mid Cabs", "zeta travel"]);
    }
}
