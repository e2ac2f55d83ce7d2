//! Client side of the catalog: filter state, debouncing and range inputs.

pub mod controller;
pub mod fetcher;
pub mod filters;
pub mod range_input;
pub mod runtime;

pub use controller::{Effect, FilterController, FilterEdit, Outcome, Phase, ViewState};
pub use fetcher::{CatalogFetcher, FetchError, HttpCatalogFetcher};
pub use filters::{ActiveFilter, FilterKind, QuickFilter};
pub use range_input::DualRangeInput;
pub use runtime::{DEFAULT_DEBOUNCE, FilterSession};
