//! # Client Commands
//!
//! CRUD over the client directory. Names are validated before they reach
//! the database; a client that still has transfers cannot be deleted.

use tracing::{debug, info};

use crate::error::AppError;
use ridebill_core::validation::validate_new_client;
use ridebill_core::{Client, NewClient};
use ridebill_db::{Database, DbError};

/// Lists all clients by name.
pub async fn list_clients(db: &Database) -> Result<Vec<Client>, AppError> {
    let clients = db.clients().list().await?;
    debug!(count = clients.len(), "list_clients command");
    Ok(clients)
}

/// Gets a single client.
pub async fn get_client(db: &Database, id: &str) -> Result<Client, AppError> {
    db.clients()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Client", id))
}

/// Creates a client after validating its fields.
pub async fn create_client(db: &Database, input: NewClient) -> Result<Client, AppError> {
    validate_new_client(&input)?;

    let client = db.clients().create(&input).await?;
    info!(id = %client.id, name = %client.name, "Client created");
    Ok(client)
}

/// Replaces a client's details.
pub async fn update_client(db: &Database, id: &str, input: NewClient) -> Result<Client, AppError> {
    validate_new_client(&input)?;

    let client = db.clients().update(id, &input).await?;
    info!(id = %client.id, "Client updated");
    Ok(client)
}

/// Deletes a client with no transfers or bills.
pub async fn delete_client(db: &Database, id: &str) -> Result<(), AppError> {
    match db.clients().delete(id).await {
        Ok(()) => {
            info!(id = %id, "Client deleted");
            Ok(())
        }
        Err(DbError::ForeignKeyViolation { .. }) => Err(AppError::business(format!(
            "Client {} still has transfers or bills",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use ridebill_db::DbConfig;

    fn input(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: Some("ops@example.com".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_client_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let created = create_client(&db, input("Hotel Miramar")).await.unwrap();
        let renamed = update_client(&db, &created.id, input("Hotel Miramar & Spa"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Hotel Miramar & Spa");

        assert_eq!(list_clients(&db).await.unwrap().len(), 1);

        delete_client(&db, &created.id).await.unwrap();
        let err = get_client(&db, &created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = create_client(&db, input("   ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(list_clients(&db).await.unwrap().is_empty());
    }
}
