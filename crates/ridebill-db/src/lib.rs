//! # ridebill-db: Database Layer for RideBill
//!
//! This crate provides database access for RideBill and runs the billing
//! workflow on top of it. It uses SQLite for local storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RideBill Data Flow                               │
//! │                                                                         │
//! │  CLI command (bill create)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   ridebill-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   BillingService<S: BillingStore>   (service.rs, store.rs)     │   │
//! │  │            │                                                    │   │
//! │  │   ┌────────▼──────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ClientRepo    │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ TransferRepo  │    │              │  │   │
//! │  │   │               │    │ BillRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/ridebill/ridebill.db (or RIDEBILL_DB_PATH)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Client, transfer and bill repositories
//! - [`store`] - The `BillingStore` seam used by the service
//! - [`service`] - Preview, create, update, status and delete workflows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ridebill_db::{BillingService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ridebill.db")).await?;
//! let billing = BillingService::new(db.clone());
//!
//! let preview = billing
//!     .calculate_bill_preview(&client_id, &transfer_ids, rate, TaxApplication::Excluded)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::{BillingError, BillingResult, BillingService, NewBill};
pub use store::BillingStore;

// Repository re-exports for convenience
pub use repository::bill::{BillChanges, BillFilter, BillRepository};
pub use repository::client::ClientRepository;
pub use repository::transfer::{TransferFilter, TransferRepository};
