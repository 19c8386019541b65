//! # Repository Module
//!
//! SQLite implementations of the fuel-core store traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Store Trait → Repository                             │
//! │                                                                         │
//! │  fuel-core (RefuelWorkflow, ledgers)                                   │
//! │       │                                                                 │
//! │       │  Arc<dyn OperationStore>::transition_status(..)                 │
//! │       ▼                                                                 │
//! │  OperationRepository                                                   │
//! │  ├── inherent methods return DbResult<T>                               │
//! │  └── trait impl converts DbError → StoreError                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PriceRepository`] - Active price and history
//! - [`CounterRepository`] - Singleton counter row
//! - [`OperationRepository`] - Refuel operations
//! - [`EventRepository`] - Event journal

pub mod counter;
pub mod event;
pub mod operation;
pub mod price;

pub use counter::CounterRepository;
pub use event::EventRepository;
pub use operation::OperationRepository;
pub use price::PriceRepository;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// Appends the half-open `[from, to)` window on `created_at`.
pub(crate) fn push_window(
    query: &mut QueryBuilder<'_, Sqlite>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) {
    if let Some(from) = from {
        query.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = to {
        query.push(" AND created_at < ").push_bind(to);
    }
}

/// Appends `LIMIT`/`OFFSET`. SQLite needs a LIMIT before OFFSET, so an
/// offset alone uses `LIMIT -1` (no limit).
pub(crate) fn push_page(
    query: &mut QueryBuilder<'_, Sqlite>,
    limit: Option<u32>,
    offset: Option<u32>,
) {
    match (limit, offset) {
        (None, None) => {}
        (limit, offset) => {
            query
                .push(" LIMIT ")
                .push_bind(limit.map_or(-1, i64::from))
                .push(" OFFSET ")
                .push_bind(i64::from(offset.unwrap_or(0)));
        }
    }
}
