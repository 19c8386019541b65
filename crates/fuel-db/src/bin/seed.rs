//! # Seed Data Generator
//!
//! Populates a development database with a price history and refuels.
//!
//! ## Usage
//! ```bash
//! # 50 refuels into ./fuel_dev.db (default)
//! cargo run -p fuel-db --bin seed
//!
//! # Custom amount
//! cargo run -p fuel-db --bin seed -- --count 500
//!
//! # Database path and device id from a station.toml
//! cargo run -p fuel-db --bin seed -- --config ./station.toml
//! ```
//!
//! ## Generated Data
//! - An opening price, changed once halfway through
//! - A counter starting at 0
//! - Refuels following a fixed cycle: confirm, confirm, cancel, leave pending

use chrono::{Duration, Utc};
use fuel_core::{FuelStation, Money};
use fuel_db::{init_tracing, Database, DbConfig, StationConfig};
use std::env;
use std::path::PathBuf;

/// Opening price per liter, in cents.
const OPENING_PRICE_CENTS: i64 = 5240;

/// Amounts cycled through for generated refuels, in whole currency units.
const AMOUNTS: &[i64] = &[200, 350, 500, 750, 1000, 1500, 2000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Fuel Station Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of refuels to generate (default: 50)");
                println!("  -d, --db <PATH>      Database file path (default: ./fuel_dev.db)");
                println!("      --config <PATH>  station.toml to read device id and db path from");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => StationConfig::load(Some(path))?,
        None => {
            let mut config = StationConfig::default();
            config.station.device_id = "seed".to_string();
            config.database.path = PathBuf::from("./fuel_dev.db");
            config
        }
    };
    if let Some(path) = db_path {
        config.database.path = PathBuf::from(path);
    }

    println!("⛽ Fuel Station Seed Data Generator");
    println!("===================================");
    println!("Database: {}", config.database.path.display());
    println!("Device:   {}", config.device_id());
    println!("Refuels:  {}", count);
    println!();

    let db = Database::new(DbConfig::from_station_config(&config)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let station = db.station(config.device_id(), config.policy());

    if station.get_price().await.is_ok() {
        println!("⚠ Database already has an active price");
        println!("  Skipping seed to avoid mixing histories.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let opening = station
        .init_price(Money::from_cents(OPENING_PRICE_CENTS))
        .await?;
    println!("✓ Opening price {}", opening.price_per_liter);
    station.set_counter(0).await?;

    println!();
    println!("Generating refuels...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut failed = 0;

    for n in 0..count {
        if n == count / 2 && n > 0 {
            let price = station
                .change_price(Money::from_cents(OPENING_PRICE_CENTS + 130))
                .await?;
            println!("  Price changed to {}", price.price_per_liter);
        }

        match seed_refuel(&station, n).await {
            Ok(()) => generated += 1,
            Err(e) => {
                eprintln!("Failed to seed refuel {}: {}", n, e);
                failed += 1;
            }
        }

        if generated > 0 && generated % 25 == 0 {
            println!("  Generated {} refuels...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} refuels in {:?} ({} failed)", generated, elapsed, failed);

    let stats = station
        .statistics(Utc::now() - Duration::days(1), Utc::now() + Duration::minutes(1))
        .await?;

    println!();
    println!("Statistics:");
    println!("  Confirmed: {}", stats.confirmed_count);
    println!("  Cancelled: {}", stats.cancelled_count);
    println!("  Pending:   {}", stats.pending_count);
    println!("  Revenue:   {}", stats.total_revenue);
    println!("  Liters:    {:.2}", stats.total_liters);
    println!("  Counter:   {}", station.get_counter().await?.current_value);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Creates one refuel and moves it along the confirm/cancel cycle.
///
/// Pending refuels never reach the counter, so each create is keyed in
/// against the live counter reading.
async fn seed_refuel(station: &FuelStation, n: usize) -> Result<(), Box<dyn std::error::Error>> {
    let amount = Money::from_major_minor(AMOUNTS[n % AMOUNTS.len()], 0);
    let counter = station.get_counter().await?.current_value;
    let op = station.create_refuel(amount, counter).await?;

    match n % 4 {
        0 | 1 => {
            station.confirm_refuel(&op.id).await?;
        }
        2 => {
            station.confirm_refuel(&op.id).await?;
            station.cancel_refuel(&op.id, "seed: customer dispute").await?;
        }
        _ => {}
    }

    Ok(())
}
