//! # fuel-db: SQLite Storage for the Fuel Station Ledger
//!
//! Implements the fuel-core store traits on SQLite with sqlx, and loads the
//! station configuration that says where the database lives.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Fuel Station Data Flow                            │
//! │                                                                         │
//! │  Caller (seed binary, service, tests)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FuelStation (fuel-core) ── Arc<dyn Store> ──┐                          │
//! │                                              ▼                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     fuel-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ PriceRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CounterRepo   │    │ 001_initial_ │  │   │
//! │  │   │ station(..)   │    │ OperationRepo │    │   schema.sql │  │   │
//! │  │   │               │    │ EventRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file from StationConfig ([database] path)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `station.toml` + `FUEL_*` environment overrides
//! - [`pool`] - Connection pool creation and station wiring
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Store trait implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuel_db::{Database, DbConfig, StationConfig};
//!
//! fuel_db::init_tracing();
//! let config = StationConfig::load(None)?;
//! let db = Database::new(DbConfig::from_station_config(&config)).await?;
//! let station = db.station(config.device_id(), config.policy());
//!
//! station.init_price(Money::from_major_minor(52, 40)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, StationConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{CounterRepository, EventRepository, OperationRepository, PriceRepository};

use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info,fuel=debug,sqlx=warn`.
/// Safe to call more than once: later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fuel=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
