//! # Seed Data Generator
//!
//! Populates the database with demo clients and unbilled transfers.
//!
//! ## Usage
//! ```bash
//! # 5 clients (default)
//! cargo run -p ridebill-db --bin seed
//!
//! # More clients
//! cargo run -p ridebill-db --bin seed -- --clients 20
//!
//! # Specify database path
//! cargo run -p ridebill-db --bin seed -- --db ./data/ridebill.db
//! ```
//!
//! Each client gets a month of transfers mixing point-to-point rides and
//! hourly dispositions, some with extras, discounts and partner commissions.

use chrono::{Duration, NaiveTime, Utc};
use ridebill_core::{
    Adjustment, Collaborator, ExtraCharge, Money, NewClient, Percent, ServiceType, TransferDraft,
};
use ridebill_db::{Database, DbConfig};
use rust_decimal::Decimal;
use std::env;

const CLIENTS: &[(&str, &str)] = &[
    ("Hotel Miramar", "bookings@miramar.example"),
    ("Blue Coast Travel", "ops@bluecoast.example"),
    ("Sierra Events", "events@sierra.example"),
    ("Palm Residences", "concierge@palm.example"),
    ("Northwind Corporate", "travel@northwind.example"),
    ("Lighthouse Weddings", "hello@lighthouse.example"),
    ("Atlas Tours", "desk@atlas.example"),
];

const ROUTES: &[(&str, &str)] = &[
    ("Airport T1", "Old Town"),
    ("Airport T2", "Marina"),
    ("Cruise Port", "Airport T1"),
    ("Train Station", "Golf Resort"),
    ("Old Town", "Convention Center"),
];

const PARTNERS: &[&str] = &["Acme Cabs", "Coastline Drivers"];

/// Transfers created per client.
const TRANSFERS_PER_CLIENT: usize = 12;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut clients: usize = 5;
    let mut db_path = String::from("./ridebill_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" | "-c" => {
                if i + 1 < args.len() {
                    clients = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("RideBill Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --clients <N>  Number of clients to generate (default: 5)");
                println!("  -d, --db <PATH>    Database file path (default: ./ridebill_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 RideBill Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Clients:  {}", clients);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.clients().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} clients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating clients and transfers...");

    let start = std::time::Instant::now();
    let mut transfers = 0;

    for n in 0..clients {
        let (name, email) = CLIENTS[n % CLIENTS.len()];
        let name = if n < CLIENTS.len() {
            name.to_string()
        } else {
            format!("{} #{}", name, n / CLIENTS.len() + 1)
        };

        let client = db
            .clients()
            .create(&NewClient {
                name,
                email: Some(email.to_string()),
                ..Default::default()
            })
            .await?;

        for k in 0..TRANSFERS_PER_CLIENT {
            let draft = generate_transfer(&client.id, n * TRANSFERS_PER_CLIENT + k);
            if let Err(e) = db.transfers().insert(&draft).await {
                eprintln!("Failed to insert transfer for {}: {}", client.name, e);
                continue;
            }
            transfers += 1;
        }

        println!("  {} ({} transfers)", client.name, TRANSFERS_PER_CLIENT);
    }

    println!();
    println!("✓ Generated {} clients and {} transfers in {:?}", clients, transfers, start.elapsed());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single transfer with varied pricing inputs.
fn generate_transfer(client_id: &str, seed: usize) -> TransferDraft {
    let today = Utc::now().date_naive();
    let date = today - Duration::days((seed % 30) as i64);
    let (origin, destination) = ROUTES[seed % ROUTES.len()];

    let hourly = seed % 4 == 0;
    let (service_type, price, hours) = if hourly {
        (ServiceType::Hourly, Money::from_cents(3500 + (seed % 3) as i64 * 500), Some(2 + (seed % 5) as i64))
    } else {
        (ServiceType::PointToPoint, Money::from_cents(4500 + (seed * 37 % 60) as i64 * 100), None)
    };

    let discount = match seed % 5 {
        1 => Adjustment::Percentage(Percent::new(Decimal::from(10))),
        3 => Adjustment::Fixed(Money::from_cents(500)),
        _ => Adjustment::None,
    };

    let extra_charges = if seed % 3 == 0 {
        vec![ExtraCharge::new("Child seat", Money::from_cents(1000))]
    } else {
        vec![]
    };

    let (collaborator, commission) = if seed % 6 == 5 {
        (
            Some(Collaborator::Partner(PARTNERS[seed % PARTNERS.len()].to_string())),
            Adjustment::Percentage(Percent::new(Decimal::from(15))),
        )
    } else {
        (Some(Collaborator::SelfService), Adjustment::None)
    };

    TransferDraft {
        client_id: client_id.to_string(),
        date,
        pickup_time: NaiveTime::from_hms_opt(6 + (seed % 14) as u32, ((seed % 4) * 15) as u32, 0),
        origin: Some(origin.to_string()),
        destination: Some(destination.to_string()),
        passengers: 1 + (seed % 4) as i64,
        service_type,
        price,
        hours,
        discount,
        extra_charges,
        commission,
        collaborator,
        notes: None,
    }
}
