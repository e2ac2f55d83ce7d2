//! Catalog query and filter subsystem.

pub mod bounds;
pub mod criteria;
pub mod query;
pub mod range;
pub mod service;

pub use bounds::{FallbackBounds, FilterBoundsAggregator, FilterBoundsSnapshot};
pub use criteria::{CatalogParams, FilterCriteria, SortKey, SortOrder};
pub use query::{QueryBuilder, QueryDescription, Visibility};
pub use range::{RangeBound, RangeFilter};
pub use service::{CatalogQueryService, QueryError};
