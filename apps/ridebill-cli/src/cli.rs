//! # Argument Definitions
//!
//! clap derive structs for the `ridebill` binary.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{ArgAction, Args, Parser, Subcommand};

use ridebill_core::{
    Adjustment, BillStatus, Collaborator, ExtraCharge, Money, NewClient, Percent, ServiceType,
    TaxApplication, TransferDraft, ValidationError,
};

#[derive(Debug, Parser)]
#[command(name = "ridebill", about = "Transfer pricing and billing", version)]
pub struct Cli {
    /// Database file (overrides RIDEBILL_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Render output as pretty JSON
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage clients
    #[command(subcommand)]
    Client(ClientCommands),
    /// Manage transfers
    #[command(subcommand)]
    Transfer(TransferCommands),
    /// Preview, create and maintain bills
    #[command(subcommand)]
    Bill(BillCommands),
    /// Show the effective configuration
    Config,
}

// =============================================================================
// Clients
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum ClientCommands {
    List,
    Show { id: String },
    Add(ClientArgs),
    Update {
        id: String,
        #[command(flatten)]
        client: ClientArgs,
    },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct ClientArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub tax_id: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

impl From<ClientArgs> for NewClient {
    fn from(args: ClientArgs) -> Self {
        NewClient {
            name: args.name,
            tax_id: args.tax_id,
            email: args.email,
            phone: args.phone,
            address: args.address,
        }
    }
}

// =============================================================================
// Transfers
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum TransferCommands {
    List {
        #[arg(long)]
        client: Option<String>,
        /// Only unbilled transfers
        #[arg(long, conflicts_with = "billed")]
        unbilled: bool,
        /// Only billed transfers
        #[arg(long)]
        billed: bool,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Show { id: String },
    Add(TransferArgs),
    Update {
        id: String,
        #[command(flatten)]
        transfer: TransferArgs,
    },
    Delete { id: String },
    /// Price a transfer without saving it
    Quote(TransferArgs),
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    #[arg(long)]
    pub client: String,
    #[arg(long)]
    pub date: NaiveDate,
    /// Pickup time, HH:MM:SS
    #[arg(long)]
    pub time: Option<NaiveTime>,
    #[arg(long)]
    pub origin: Option<String>,
    #[arg(long)]
    pub destination: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub passengers: i64,
    /// point_to_point or hourly
    #[arg(long, default_value = "point_to_point")]
    pub service: ServiceType,
    /// Flat price, or the hourly rate for hourly services
    #[arg(long)]
    pub price: Money,
    #[arg(long)]
    pub hours: Option<i64>,
    /// `10%` for a percentage, `15` for a fixed amount
    #[arg(long, value_parser = parse_adjustment)]
    pub discount: Option<Adjustment>,
    /// Extra charge as NAME=PRICE; repeatable
    #[arg(long = "extra", value_parser = parse_extra)]
    pub extras: Vec<ExtraCharge>,
    /// `10%` for a percentage, `15` for a fixed amount
    #[arg(long, value_parser = parse_adjustment)]
    pub commission: Option<Adjustment>,
    /// Partner who performed the service; omit for own drivers
    #[arg(long)]
    pub partner: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl From<TransferArgs> for TransferDraft {
    fn from(args: TransferArgs) -> Self {
        TransferDraft {
            client_id: args.client,
            date: args.date,
            pickup_time: args.time,
            origin: args.origin,
            destination: args.destination,
            passengers: args.passengers,
            service_type: args.service,
            price: args.price,
            hours: args.hours,
            discount: args.discount.unwrap_or_default(),
            extra_charges: args.extras,
            commission: args.commission.unwrap_or_default(),
            collaborator: Some(match args.partner {
                Some(name) => Collaborator::Partner(name),
                None => Collaborator::SelfService,
            }),
            notes: args.notes,
        }
    }
}

// =============================================================================
// Bills
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum BillCommands {
    List {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        status: Option<BillStatus>,
    },
    /// Show a bill by ID or invoice number
    Show { bill: String },
    /// Compute a bill without saving it
    Preview(BillArgs),
    Create {
        #[command(flatten)]
        bill: BillArgs,
        /// Invoice date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Add or remove transfers on a draft or sent bill
    Update {
        bill: String,
        #[arg(long = "add")]
        add: Vec<String>,
        #[arg(long = "remove")]
        remove: Vec<String>,
    },
    /// draft → sent → paid, or → cancelled
    Status { bill: String, status: BillStatus },
    Delete { bill: String },
    /// Write the bill as CSV
    Export {
        bill: String,
        /// Output file (default: stdout)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct BillArgs {
    #[arg(long)]
    pub client: String,
    /// Transfer to include; repeatable
    #[arg(long = "transfer")]
    pub transfers: Vec<String>,
    /// Include every unbilled transfer of the client
    #[arg(long)]
    pub all_unbilled: bool,
    /// Tax rate in percent (default: RIDEBILL_TAX_RATE)
    #[arg(long)]
    pub tax_rate: Option<Percent>,
    /// included or excluded (default: RIDEBILL_TAX_APPLICATION)
    #[arg(long)]
    pub tax: Option<TaxApplication>,
}

// =============================================================================
// Value parsers
// =============================================================================

/// `10%` → percentage, `15` / `15.50` → fixed amount, `none` → no adjustment.
pub fn parse_adjustment(raw: &str) -> Result<Adjustment, ValidationError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") || raw.is_empty() {
        return Ok(Adjustment::None);
    }
    if raw.ends_with('%') {
        Ok(Adjustment::Percentage(raw.parse::<Percent>()?))
    } else {
        Ok(Adjustment::Fixed(raw.parse::<Money>()?))
    }
}

/// `Child seat=10` → extra charge.
pub fn parse_extra(raw: &str) -> Result<ExtraCharge, ValidationError> {
    let (name, price) = raw.rsplit_once('=').ok_or_else(|| ValidationError::InvalidFormat {
        field: "extra".to_string(),
        reason: "expected NAME=PRICE".to_string(),
    })?;
    Ok(ExtraCharge::new(name.trim(), price.parse::<Money>()?))
}
