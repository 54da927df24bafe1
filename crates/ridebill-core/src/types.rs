//! # Domain Types
//!
//! Core domain types used throughout RideBill.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │    Transfer     │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  client_id (FK) │   │  id (UUID)      │       │
//! │  │  name           │   │  service_type   │   │  number         │       │
//! │  │  tax_id         │   │  price, hours   │   │  status         │       │
//! │  │  email, phone   │   │  discount       │   │  tax_rate       │       │
//! │  └─────────────────┘   │  extra_charges  │   │  sub_total      │       │
//! │                        │  commission     │   │  total          │       │
//! │                        │  billed         │   └────────┬────────┘       │
//! │                        └────────▲────────┘            │                │
//! │                                 │             ┌───────▼────────┐       │
//! │                                 └─────────────│    BillItem    │       │
//! │                                  transfer_id  │  unit_price    │       │
//! │                                               └────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tagged Variants
//! Optional discounts and commissions are an [`Adjustment`], and the party
//! that performed a ride is an optional [`Collaborator`]. "No discount",
//! "zero discount" and "self-service" are distinct states rather than
//! special strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Percent};

// =============================================================================
// Service Type
// =============================================================================

/// How a transfer is priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// A single ride from A to B; `price` is per trip.
    #[default]
    PointToPoint,
    /// A disposition charged by the hour; `price` is the hourly rate.
    Hourly,
}

impl ServiceType {
    /// Human-readable label used on invoice lines.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::PointToPoint => "Point to point",
            ServiceType::Hourly => "Hourly",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::PointToPoint => "point_to_point",
            ServiceType::Hourly => "hourly",
        }
    }
}

impl FromStr for ServiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "point_to_point" | "p2p" => Ok(ServiceType::PointToPoint),
            "hourly" => Ok(ServiceType::Hourly),
            other => Err(ValidationError::InvalidFormat {
                field: "service_type".to_string(),
                reason: format!("unknown service type '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Adjustment (Discount / Commission)
// =============================================================================

/// A price adjustment: nothing, a percentage, or a fixed amount.
///
/// Serialized as `{"type": "percentage", "value": "10"}` or `{"type": "none"}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Adjustment {
    #[default]
    None,
    /// Percentage points of the relevant base.
    Percentage(Percent),
    /// A fixed amount.
    Fixed(Money),
}

/// Discount applied against a transfer's base price.
pub type Discount = Adjustment;

/// Commission withheld by a collaborator, against the discounted subtotal.
pub type Commission = Adjustment;

/// The stored discriminant of an [`Adjustment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Percentage,
    Fixed,
}

impl Adjustment {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Adjustment::None)
    }

    /// Splits the adjustment into a kind and a raw value for storage.
    pub fn to_parts(&self) -> (Option<AdjustmentKind>, Option<Decimal>) {
        match self {
            Adjustment::None => (None, None),
            Adjustment::Percentage(p) => (Some(AdjustmentKind::Percentage), Some(p.value())),
            Adjustment::Fixed(m) => (Some(AdjustmentKind::Fixed), Some(m.amount())),
        }
    }

    /// Rebuilds an adjustment from stored parts.
    ///
    /// A kind without a value collapses to `None`.
    pub fn from_parts(kind: Option<AdjustmentKind>, value: Option<Decimal>) -> Self {
        match (kind, value) {
            (Some(AdjustmentKind::Percentage), Some(v)) => Adjustment::Percentage(Percent::new(v)),
            (Some(AdjustmentKind::Fixed), Some(v)) => Adjustment::Fixed(Money::new(v)),
            _ => Adjustment::None,
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::None => write!(f, "none"),
            Adjustment::Percentage(p) => write!(f, "{p}"),
            Adjustment::Fixed(m) => write!(f, "{m}"),
        }
    }
}

// =============================================================================
// Collaborator
// =============================================================================

/// Who performed the ride when it was not the operator's own fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Collaborator {
    /// Performed in-house; never earns a commission.
    SelfService,
    /// An external partner (driver or agency) identified by name.
    Partner(String),
}

/// The stored discriminant of a [`Collaborator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorKind {
    SelfService,
    Partner,
}

impl Collaborator {
    /// Whether a commission may be withheld for this collaborator.
    #[inline]
    pub fn earns_commission(&self) -> bool {
        matches!(self, Collaborator::Partner(_))
    }

    pub fn kind(&self) -> CollaboratorKind {
        match self {
            Collaborator::SelfService => CollaboratorKind::SelfService,
            Collaborator::Partner(_) => CollaboratorKind::Partner,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Collaborator::SelfService => None,
            Collaborator::Partner(name) => Some(name),
        }
    }

    /// Rebuilds a collaborator from stored columns.
    pub fn from_parts(kind: Option<CollaboratorKind>, name: Option<String>) -> Option<Self> {
        match kind? {
            CollaboratorKind::SelfService => Some(Collaborator::SelfService),
            CollaboratorKind::Partner => Some(Collaborator::Partner(name.unwrap_or_default())),
        }
    }
}

// =============================================================================
// Extra Charge
// =============================================================================

/// A named add-on fee (child seat, waiting time, tolls).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraCharge {
    pub name: String,
    pub price: Money,
}

impl ExtraCharge {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        ExtraCharge {
            name: name.into(),
            price,
        }
    }

    /// Rows with a blank name or a non-positive price are unfinished drafts
    /// and do not count towards the total.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.price.is_positive()
    }
}

// =============================================================================
// Client
// =============================================================================

/// The party a bill is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Company or person name printed on invoices.
    pub name: String,

    /// VAT / fiscal identifier.
    pub tax_id: Option<String>,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Transfer
// =============================================================================

/// A booked service: one ride, or an hourly disposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Client that booked (and will be billed for) the service.
    pub client_id: String,

    /// Service date.
    pub date: NaiveDate,

    pub pickup_time: Option<NaiveTime>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub passengers: i64,

    pub service_type: ServiceType,

    /// Per-trip price, or hourly rate when `service_type` is hourly.
    pub price: Money,

    /// Booked hours; required for hourly services only.
    pub hours: Option<i64>,

    pub discount: Discount,

    /// Add-on fees in entry order.
    pub extra_charges: Vec<ExtraCharge>,

    pub commission: Commission,

    pub collaborator: Option<Collaborator>,

    /// Set once the transfer is a line on some bill.
    pub billed: bool,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    /// Creates an unbilled transfer with no adjustments.
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        date: NaiveDate,
        service_type: ServiceType,
        price: Money,
    ) -> Self {
        let now = Utc::now();
        Transfer {
            id: id.into(),
            client_id: client_id.into(),
            date,
            pickup_time: None,
            origin: None,
            destination: None,
            passengers: 1,
            service_type,
            price,
            hours: None,
            discount: Adjustment::None,
            extra_charges: Vec::new(),
            commission: Adjustment::None,
            collaborator: None,
            billed: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_hours(mut self, hours: i64) -> Self {
        self.hours = Some(hours);
        self
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_extra_charge(mut self, name: impl Into<String>, price: Money) -> Self {
        self.extra_charges.push(ExtraCharge::new(name, price));
        self
    }

    pub fn with_commission(mut self, commission: Commission) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_collaborator(mut self, collaborator: Collaborator) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    pub fn with_route(mut self, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self.destination = Some(destination.into());
        self
    }

    /// "Origin → Destination" when both ends are known.
    pub fn route(&self) -> Option<String> {
        match (self.origin.as_deref(), self.destination.as_deref()) {
            (Some(from), Some(to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                Some(format!("{} → {}", from.trim(), to.trim()))
            }
            _ => None,
        }
    }
}

/// Input for creating or replacing a transfer.
///
/// The `billed` flag is never part of a draft; only the billing workflow
/// flips it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub client_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub pickup_time: Option<NaiveTime>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default = "default_passengers")]
    pub passengers: i64,
    pub service_type: ServiceType,
    pub price: Money,
    #[serde(default)]
    pub hours: Option<i64>,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub extra_charges: Vec<ExtraCharge>,
    #[serde(default)]
    pub commission: Commission,
    #[serde(default)]
    pub collaborator: Option<Collaborator>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_passengers() -> i64 {
    1
}

impl TransferDraft {
    /// Materializes the draft as an unbilled transfer.
    pub fn into_transfer(self, id: impl Into<String>, now: DateTime<Utc>) -> Transfer {
        Transfer {
            id: id.into(),
            client_id: self.client_id,
            date: self.date,
            pickup_time: self.pickup_time,
            origin: self.origin,
            destination: self.destination,
            passengers: self.passengers,
            service_type: self.service_type,
            price: self.price,
            hours: self.hours,
            discount: self.discount,
            extra_charges: self.extra_charges,
            commission: self.commission,
            collaborator: self.collaborator,
            billed: false,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// Lifecycle of an invoice.
///
/// ```text
///   Draft ──► Sent ──► Paid
///     │         │
///     └────┬────┘
///          ▼
///      Cancelled
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// Freshly created, still editable.
    #[default]
    Draft,
    /// Sent to the client, awaiting payment.
    Sent,
    Paid,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Draft => "draft",
            BillStatus::Sent => "sent",
            BillStatus::Paid => "paid",
            BillStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: BillStatus) -> bool {
        matches!(
            (self, next),
            (BillStatus::Draft, BillStatus::Sent)
                | (BillStatus::Sent, BillStatus::Paid)
                | (BillStatus::Draft, BillStatus::Cancelled)
                | (BillStatus::Sent, BillStatus::Cancelled)
        )
    }

    /// Paid and cancelled bills are closed.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BillStatus::Paid | BillStatus::Cancelled)
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(BillStatus::Draft),
            "sent" => Ok(BillStatus::Sent),
            "paid" => Ok(BillStatus::Paid),
            "cancelled" | "canceled" => Ok(BillStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown bill status '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Tax Application
// =============================================================================

/// Whether the VAT rate is added on top of, or already contained in, the
/// subtotal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TaxApplication {
    /// Prices already contain the tax; it is carved out of the subtotal.
    Included,
    /// Tax is added on top of the subtotal.
    #[default]
    Excluded,
}

impl TaxApplication {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxApplication::Included => "included",
            TaxApplication::Excluded => "excluded",
        }
    }
}

impl fmt::Display for TaxApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxApplication {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "included" | "inclusive" => Ok(TaxApplication::Included),
            "excluded" | "exclusive" => Ok(TaxApplication::Excluded),
            other => Err(ValidationError::InvalidFormat {
                field: "tax_application".to_string(),
                reason: format!("expected 'included' or 'excluded', got '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// An invoice aggregating one or more transfers of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier: `INVOICE-<year>-<0000>`.
    pub number: String,

    pub client_id: String,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BillStatus,

    pub tax_rate: Percent,
    pub tax_application: TaxApplication,

    /// Cached result of the last computation over the bill's items.
    pub sub_total: Money,
    pub tax_amount: Money,
    pub total: Money,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Whether transfers may still be added or removed.
    #[inline]
    pub fn is_editable(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// A line on a bill. Snapshot of the transfer's price at billing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub transfer_id: String,
    /// Generated line text (date, service, discount summary).
    pub description: String,
    /// Final transfer price (`pricing::total_price`).
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

/// A bill together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillWithItems {
    #[serde(flatten)]
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
