//! # Application Context
//!
//! What every command needs: the open database and the loaded configuration.
//!
//! `Database` wraps a `SqlitePool`, so the context is cheap to share and
//! commands can run queries without extra locking.

use ridebill_db::{BillingService, Database};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AppContext {
    db: Database,
    config: AppConfig,
}

impl AppContext {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppContext { db, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Billing workflows over this context's database.
    pub fn billing(&self) -> BillingService<Database> {
        BillingService::new(self.db.clone()).with_payment_terms(self.config.payment_terms_days)
    }
}
