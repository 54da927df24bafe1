//! # RideBill CLI Library
//!
//! Startup and dispatch for the `ridebill` binary.
//!
//! ## Module Organization
//! ```text
//! ridebill_cli/
//! ├── lib.rs          ◄─── You are here (startup & dispatch)
//! ├── cli.rs          ◄─── clap argument definitions
//! ├── config.rs       ◄─── AppConfig from RIDEBILL_* variables
//! ├── context.rs      ◄─── Database + config handed to commands
//! ├── commands/
//! │   ├── client.rs   ◄─── Client CRUD
//! │   ├── transfer.rs ◄─── Transfer CRUD, quotes
//! │   ├── bill.rs     ◄─── Preview, create, update, status, delete
//! │   └── export.rs   ◄─── CSV export
//! └── error.rs        ◄─── AppError (code + message)
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{BillCommands, Cli, ClientCommands, Commands, TransferCommands};
use commands::bill::BillRequest;
use commands::{bill, client, export, transfer};
use config::{AppConfig, ConfigError};
use context::AppContext;
use error::AppError;
use ridebill_db::{BillFilter, Database, DbConfig, TransferFilter};

/// Runs one CLI invocation.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Load configuration (RIDEBILL_* variables, then --db)               │
/// │  2. Determine database path                                             │
/// │     • --db / RIDEBILL_DB_PATH                                           │
/// │     • Linux: ~/.local/share/ridebill/ridebill.db                        │
/// │     • macOS: ~/Library/Application Support/com.ridebill.ridebill/...    │
/// │  3. Connect (WAL, foreign keys) and run pending migrations              │
/// │  4. Dispatch the subcommand, print its result as JSON                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.db.clone() {
        config.db_path = Some(path);
    }

    if let Commands::Config = cli.command {
        return print(&config, cli.pretty);
    }

    let db_path = database_path(&config)?;
    info!(db_path = %db_path.display(), "Opening database");
    let db = Database::new(DbConfig::new(db_path)).await?;
    let ctx = AppContext::new(db, config);

    let result = dispatch(&ctx, cli.command, cli.pretty).await;
    ctx.db().close().await;
    result
}

async fn dispatch(ctx: &AppContext, command: Commands, pretty: bool) -> Result<(), AppError> {
    let db = ctx.db();

    match command {
        Commands::Config => print(ctx.config(), pretty),

        Commands::Client(cmd) => match cmd {
            ClientCommands::List => print(&client::list_clients(db).await?, pretty),
            ClientCommands::Show { id } => print(&client::get_client(db, &id).await?, pretty),
            ClientCommands::Add(args) => {
                print(&client::create_client(db, args.into()).await?, pretty)
            }
            ClientCommands::Update { id, client: args } => {
                print(&client::update_client(db, &id, args.into()).await?, pretty)
            }
            ClientCommands::Delete { id } => {
                client::delete_client(db, &id).await?;
                print(&serde_json::json!({ "deleted": id }), pretty)
            }
        },

        Commands::Transfer(cmd) => match cmd {
            TransferCommands::List {
                client,
                unbilled,
                billed,
                from,
                to,
            } => {
                let filter = TransferFilter {
                    client_id: client,
                    billed: match (unbilled, billed) {
                        (true, _) => Some(false),
                        (_, true) => Some(true),
                        _ => None,
                    },
                    from,
                    to,
                };
                print(&transfer::list_transfers(db, &filter).await?, pretty)
            }
            TransferCommands::Show { id } => {
                print(&transfer::get_transfer(db, &id).await?, pretty)
            }
            TransferCommands::Add(args) => {
                print(&transfer::create_transfer(db, args.into()).await?, pretty)
            }
            TransferCommands::Update { id, transfer: args } => print(
                &transfer::update_transfer(db, &id, args.into()).await?,
                pretty,
            ),
            TransferCommands::Delete { id } => {
                transfer::delete_transfer(db, &id).await?;
                print(&serde_json::json!({ "deleted": id }), pretty)
            }
            TransferCommands::Quote(args) => {
                print(&transfer::quote_transfer(args.into())?, pretty)
            }
        },

        Commands::Bill(cmd) => match cmd {
            BillCommands::List { client, status } => {
                let filter = BillFilter {
                    client_id: client,
                    status,
                };
                print(&bill::list_bills(db, &filter).await?, pretty)
            }
            BillCommands::Show { bill: id } => print(&bill::get_bill(ctx, &id).await?, pretty),
            BillCommands::Preview(args) => {
                let request = BillRequest {
                    client_id: args.client,
                    transfer_ids: args.transfers,
                    all_unbilled: args.all_unbilled,
                    tax_rate: args.tax_rate,
                    tax_application: args.tax,
                    ..Default::default()
                };
                print(&bill::preview_bill(ctx, request).await?, pretty)
            }
            BillCommands::Create { bill: args, date, notes } => {
                let request = BillRequest {
                    client_id: args.client,
                    transfer_ids: args.transfers,
                    all_unbilled: args.all_unbilled,
                    tax_rate: args.tax_rate,
                    tax_application: args.tax,
                    date,
                    notes,
                };
                print(&bill::create_bill(ctx, request).await?, pretty)
            }
            BillCommands::Update { bill: id, add, remove } => print(
                &bill::update_bill_transfers(ctx, &id, &add, &remove).await?,
                pretty,
            ),
            BillCommands::Status { bill: id, status } => {
                print(&bill::set_bill_status(ctx, &id, status).await?, pretty)
            }
            BillCommands::Delete { bill: id } => print(&bill::delete_bill(ctx, &id).await?, pretty),
            BillCommands::Export { bill: id, out } => match out {
                Some(path) => {
                    let number = export::export_bill(ctx, &id, File::create(&path)?).await?;
                    print(
                        &serde_json::json!({ "number": number, "path": path }),
                        pretty,
                    )
                }
                None => {
                    export::export_bill(ctx, &id, io::stdout().lock()).await?;
                    Ok(())
                }
            },
        },
    }
}

/// Writes a command result to stdout as JSON.
fn print<T: Serialize>(value: &T, pretty: bool) -> Result<(), AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", rendered)?;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout stays machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=ridebill=trace` - Show trace for ridebill crates only
/// - Default: `info,ridebill=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ridebill=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.ridebill.ridebill/ridebill.db`
/// - **Windows**: `%APPDATA%\ridebill\ridebill\data\ridebill.db`
/// - **Linux**: `~/.local/share/ridebill/ridebill.db`
///
/// `--db` or `RIDEBILL_DB_PATH` take precedence.
pub fn database_path(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }

    let proj_dirs =
        ProjectDirs::from("com", "ridebill", "ridebill").ok_or(ConfigError::NoDataDirectory)?;
    let data_dir = proj_dirs.data_dir();

    // Create directory if it doesn't exist
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("ridebill.db"))
}
