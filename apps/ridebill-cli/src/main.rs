//! # RideBill CLI Entry Point
//!
//! ```text
//! ridebill client add --name "Hotel Miramar"
//! ridebill transfer add --client <id> --date 2026-03-14 --price 45
//! ridebill bill preview --client <id> --all-unbilled
//! ridebill bill create  --client <id> --all-unbilled
//! ridebill bill export  INVOICE-2026-0001 --out invoice.csv
//! ```
//!
//! Results are printed to stdout as JSON. Failures print
//! `{"code": ..., "message": ...}` to stderr and exit non-zero.

use clap::Parser;

use ridebill_cli::cli::Cli;

#[tokio::main]
async fn main() {
    ridebill_cli::init_tracing();

    let cli = Cli::parse();

    if let Err(err) = ridebill_cli::run(cli).await {
        match serde_json::to_string(&err) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", err),
        }
        std::process::exit(err.exit_code());
    }
}
