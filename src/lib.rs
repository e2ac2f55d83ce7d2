//! BusMarket catalog: query and filter subsystem for a used-bus marketplace.
//!
//! The server half (`catalog`, `store`, `routes`) turns flat query parameters
//! into a bounded, sorted, paginated result page and reports the live filter
//! bounds. The `client` half reconciles rapidly changing filter input into a
//! minimal number of well-formed catalog queries.

use axum::extract::FromRef;
use std::sync::Arc;

pub mod auth_middleware;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

use crate::catalog::CatalogQueryService;
use crate::config::Settings;

pub use routes::create_router;

// Shared application state handed to every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub catalog: Arc<CatalogQueryService>,
}
