// Catalog Query Service: builds the query against the live bounds snapshot and
// runs the page fetch and the match count together.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use super::bounds::{FilterBoundsAggregator, FilterBoundsSnapshot};
use super::criteria::FilterCriteria;
use super::query::{QueryBuilder, Visibility};
use crate::models::ResultPage;
use crate::store::{CatalogStore, StoreError};

/// Distinct from an empty result: the catalog could not be queried at all.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("catalog query failed: {0}")]
    Failed(#[from] StoreError),
}

#[derive(Clone)]
pub struct CatalogQueryService {
    store: Arc<dyn CatalogStore>,
    aggregator: FilterBoundsAggregator,
}

impl CatalogQueryService {
    pub fn new(store: Arc<dyn CatalogStore>, aggregator: FilterBoundsAggregator) -> Self {
        CatalogQueryService { store, aggregator }
    }

    /// Current filter bounds; falls back rather than failing.
    pub async fn bounds(&self) -> FilterBoundsSnapshot {
        self.aggregator.snapshot().await
    }

    pub async fn execute(&self, criteria: &FilterCriteria, visibility: Visibility) -> Result<ResultPage, QueryError> {
        let bounds = self.aggregator.snapshot().await;
        let query = QueryBuilder::new(&bounds).visibility(visibility).build(criteria);
        debug!(?query, "Built catalog query");

        let (listings, total) = futures::future::try_join(
            self.store.find(&query),
            self.store.count(&query.predicates),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Catalog query failed");
            QueryError::from(e)
        })?;

        info!(
            page = criteria.page,
            returned = listings.len(),
            total,
            "Catalog query complete"
        );
        Ok(ResultPage::new(listings, criteria.page.max(1), query.take, total))
    }
}
