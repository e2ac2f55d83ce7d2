//! Storage query primitive consumed by the catalog core.
//!
//! A store evaluates a [`QueryDescription`] (predicates, sort, skip/take) and
//! separately counts matches under the same predicates. Record writes belong to
//! the store's own API and are not part of this trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::query::{Predicate, QueryDescription};
use crate::models::ListingSummary;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Raw observations over active listings, before fallbacks are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveAggregate {
    pub price: Option<(f64, f64)>,
    pub year: Option<(i32, i32)>,
    pub mileage: Option<(i64, i64)>,
    pub brands: Vec<String>,
    pub fuels: Vec<String>,
    pub transmissions: Vec<String>,
    pub count: u64,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Matching listings for one page, in the query's sort order.
    async fn find(&self, query: &QueryDescription) -> Result<Vec<ListingSummary>, StoreError>;

    /// Number of listings matching `predicates`, ignoring pagination.
    async fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError>;

    /// Min/max, distinct values and count over active listings.
    async fn aggregate_active(&self) -> Result<ActiveAggregate, StoreError>;
}
