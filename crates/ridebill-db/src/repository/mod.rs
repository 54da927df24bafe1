//! # Repository Module
//!
//! Database repository implementations for RideBill.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command / BillingService                                          │
//! │       │                                                                 │
//! │       │  db.transfers().list(&filter)                                  │
//! │       ▼                                                                 │
//! │  TransferRepository                                                    │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── list(&self, filter)                                               │
//! │  ├── insert(&self, draft)                                              │
//! │  └── update_unbilled(&self, id, draft)                                 │
//! │       │                                                                 │
//! │       │  SQL (row structs ⇄ domain types)                               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`](client::ClientRepository) - Client CRUD
//! - [`TransferRepository`](transfer::TransferRepository) - Transfer CRUD and filters
//! - [`BillRepository`](bill::BillRepository) - Bills, items and the atomic
//!   claim / unbill operations

pub mod bill;
pub mod client;
pub mod transfer;

use std::str::FromStr;

use ridebill_core::{Money, Percent};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(
    table: &'static str,
    id: &str,
    column: &'static str,
    raw: &str,
) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| DbError::corrupt(table, id, column, e))
}

pub(crate) fn parse_money(
    table: &'static str,
    id: &str,
    column: &'static str,
    raw: &str,
) -> DbResult<Money> {
    parse_decimal(table, id, column, raw).map(Money::new)
}

pub(crate) fn parse_percent(
    table: &'static str,
    id: &str,
    column: &'static str,
    raw: &str,
) -> DbResult<Percent> {
    parse_decimal(table, id, column, raw).map(Percent::new)
}

pub(crate) fn parse_optional_decimal(
    table: &'static str,
    id: &str,
    column: &'static str,
    raw: Option<&str>,
) -> DbResult<Option<Decimal>> {
    raw.map(|value| parse_decimal(table, id, column, value))
        .transpose()
}
