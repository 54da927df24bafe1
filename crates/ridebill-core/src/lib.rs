//! # ridebill-core: Pure Business Logic for RideBill
//!
//! This crate is the **heart** of RideBill. It contains the transfer pricing
//! rules and the invoice arithmetic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RideBill Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    ridebill-cli (front end)                     │   │
//! │  │   client/transfer CRUD ──► bill preview ──► create ──► export   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         ridebill-db: BillingService<S: BillingStore>            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ ridebill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │  billing  │  │ validation│  │   │
//! │  │   │ Transfer  │  │ base/extra│  │  VAT math │  │   rules   │  │   │
//! │  │   │ Bill      │  │ discount  │  │  numbers  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Client, Transfer, Bill, BillItem, ...)
//! - [`money`] - `Money` and `Percent` over exact decimals
//! - [`pricing`] - Per-transfer price calculator
//! - [`billing`] - Tax modes, previews, invoice numbers, status machine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use ridebill_core::money::{Money, Percent};
//! use ridebill_core::pricing::total_price;
//! use ridebill_core::types::{Adjustment, ServiceType, Transfer};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
//! let transfer = Transfer::new("t-1", "c-1", date, ServiceType::Hourly, Money::new(Decimal::from(20)))
//!     .with_hours(4)
//!     .with_discount(Adjustment::Percentage(Percent::new(Decimal::from(10))));
//!
//! assert_eq!(total_price(&transfer).unwrap(), Money::new(Decimal::from(72)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every invoice number (`INVOICE-2026-0001`).
pub const INVOICE_PREFIX: &str = "INVOICE";

/// Days between the invoice date and its due date unless configured otherwise.
pub const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;

/// Longest accepted payment term (ten years).
pub const MAX_PAYMENT_TERMS_DAYS: i64 = 3650;

/// Largest accepted price, extra charge or fixed adjustment.
///
/// Keeps every derived figure (168 hours, many lines, tax) far inside the
/// decimal range.
pub const MAX_AMOUNT: i64 = 1_000_000_000;

/// Upper bound for hourly dispositions.
///
/// A booking longer than a week is almost certainly a typo (hours vs minutes).
pub const MAX_SERVICE_HOURS: i64 = 168;
