//! Filter-bounds aggregation: the legal range of each numeric attribute and
//! the distinct values of each categorical attribute over active listings.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::range::RangeBound;
use crate::config::CatalogSettings;
use crate::store::{ActiveAggregate, CatalogStore};

/// Advisory snapshot used to seed and bound filter inputs. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBoundsSnapshot {
    pub price_range: RangeBound<f64>,
    pub year_range: RangeBound<i32>,
    pub mileage_range: RangeBound<i64>,
    pub total_listings: u64,
    pub brands: Vec<String>,
    pub fuels: Vec<String>,
    pub transmissions: Vec<String>,
}

/// Values substituted when the active catalog is empty or unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackBounds {
    pub price: RangeBound<f64>,
    pub year: RangeBound<i32>,
    pub mileage: RangeBound<i64>,
    pub brands: Vec<String>,
    pub fuels: Vec<String>,
    pub transmissions: Vec<String>,
}

impl FallbackBounds {
    pub fn from_settings(settings: &CatalogSettings) -> Self {
        let current_year = Utc::now().year();
        FallbackBounds {
            price: RangeBound::new(settings.fallback_price_min, settings.fallback_price_max),
            year: RangeBound::new(settings.fallback_year_min, current_year),
            mileage: RangeBound::new(settings.fallback_mileage_min, settings.fallback_mileage_max),
            brands: settings.fallback_brands.clone(),
            fuels: settings.fallback_fuels.clone(),
            transmissions: settings.fallback_transmissions.clone(),
        }
    }

    /// The snapshot reported when nothing could be observed.
    pub fn snapshot(&self) -> FilterBoundsSnapshot {
        FilterBoundsSnapshot {
            price_range: self.price,
            year_range: self.year,
            mileage_range: self.mileage,
            total_listings: 0,
            brands: self.brands.clone(),
            fuels: self.fuels.clone(),
            transmissions: self.transmissions.clone(),
        }
    }

    /// Merges observations with fallbacks, attribute by attribute.
    pub fn merge(&self, aggregate: ActiveAggregate) -> FilterBoundsSnapshot {
        FilterBoundsSnapshot {
            price_range: observed_or(aggregate.price, self.price),
            year_range: observed_or(aggregate.year, self.year),
            mileage_range: observed_or(aggregate.mileage, self.mileage),
            total_listings: aggregate.count,
            brands: distinct_or(aggregate.brands, &self.brands),
            fuels: distinct_or(aggregate.fuels, &self.fuels),
            transmissions: distinct_or(aggregate.transmissions, &self.transmissions),
        }
    }
}

impl Default for FallbackBounds {
    fn default() -> Self {
        FallbackBounds::from_settings(&CatalogSettings::default())
    }
}

fn observed_or<T: super::range::RangeValue>(observed: Option<(T, T)>, fallback: RangeBound<T>) -> RangeBound<T> {
    observed.map(|(min, max)| RangeBound::new(min, max)).unwrap_or(fallback)
}

fn distinct_or(observed: Vec<String>, fallback: &[String]) -> Vec<String> {
    let mut values: Vec<String> = observed
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    if values.is_empty() { fallback.to_vec() } else { values }
}

/// Computes [`FilterBoundsSnapshot`]s from the store. Never fails.
#[derive(Clone)]
pub struct FilterBoundsAggregator {
    store: Arc<dyn CatalogStore>,
    fallback: FallbackBounds,
}

impl FilterBoundsAggregator {
    pub fn new(store: Arc<dyn CatalogStore>, fallback: FallbackBounds) -> Self {
        FilterBoundsAggregator { store, fallback }
    }

    pub fn fallback(&self) -> &FallbackBounds {
        &self.fallback
    }

    pub async fn snapshot(&self) -> FilterBoundsSnapshot {
        match self.store.aggregate_active().await {
            Ok(aggregate) => {
                debug!(count = aggregate.count, "Aggregated active listing bounds");
                self.fallback.merge(aggregate)
            }
            Err(e) => {
                warn!(error = %e, "Bounds aggregation failed, using fallback snapshot");
                self.fallback.snapshot()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::query::{Predicate, QueryDescription};
    use crate::models::ListingSummary;
    use crate::store::{MemoryStore, StoreError};
    use crate::test_support::listing;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct UnreachableStore;

    #[async_trait]
    impl CatalogStore for UnreachableStore {
        async fn find(&self, _query: &QueryDescription) -> Result<Vec<ListingSummary>, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
        async fn count(&self, _predicates: &[Predicate]) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
        async fn aggregate_active(&self) -> Result<ActiveAggregate, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn empty_catalog_reports_fallback_snapshot() {
        let aggregator = FilterBoundsAggregator::new(Arc::new(MemoryStore::default()), FallbackBounds::default());
        let snapshot = aggregator.snapshot().await;

        assert_eq!(snapshot.price_range, RangeBound::new(50_000.0, 1_000_000.0));
        assert_eq!(snapshot.year_range.min(), 2010);
        assert_eq!(snapshot.year_range.max(), Utc::now().year());
        assert_eq!(snapshot.mileage_range, RangeBound::new(0, 500_000));
        assert_eq!(snapshot.total_listings, 0);
        assert_eq!(snapshot.brands, vec!["Mercedes-Benz", "Volvo", "Scania", "MAN", "Iveco"]);
    }

    #[tokio::test]
    async fn unreachable_store_degrades_to_fallback() {
        let fallback = FallbackBounds::default();
        let aggregator = FilterBoundsAggregator::new(Arc::new(UnreachableStore), fallback.clone());
        assert_eq!(aggregator.snapshot().await, fallback.snapshot());
    }

    #[tokio::test]
    async fn bounds_cover_only_active_listings() {
        let mut sold = listing("sold", 5_000.0);
        sold.status = crate::models::ListingStatus::Sold;
        sold.brand = "Scania".into();
        let store = MemoryStore::new(vec![
            listing("a", 85_000.0),
            listing("b", 720_000.0),
            sold,
        ]);
        let aggregator = FilterBoundsAggregator::new(Arc::new(store), FallbackBounds::default());
        let snapshot = aggregator.snapshot().await;

        assert_eq!(snapshot.price_range, RangeBound::new(85_000.0, 720_000.0));
        assert_eq!(snapshot.total_listings, 2);
        assert_eq!(snapshot.brands, vec!["Volvo"]);
    }

    #[test]
    fn missing_attribute_falls_back_alone() {
        let fallback = FallbackBounds::default();
        let snapshot = fallback.merge(ActiveAggregate {
            price: Some((85_000.0, 720_000.0)),
            year: Some((2012, 2020)),
            mileage: None,
            brands: vec!["Volvo".into(), "Marcopolo".into(), "Volvo".into()],
            fuels: Vec::new(),
            transmissions: vec!["  ".into()],
            count: 2,
        });

        assert_eq!(snapshot.mileage_range, fallback.mileage);
        assert_eq!(snapshot.brands, vec!["Marcopolo", "Volvo"]);
        assert_eq!(snapshot.fuels, fallback.fuels);
        assert_eq!(snapshot.transmissions, fallback.transmissions);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(FallbackBounds::default().snapshot()).unwrap();
        assert_eq!(json["priceRange"], serde_json::json!({"min": 50000.0, "max": 1000000.0}));
        assert_eq!(json["totalListings"], 0);
    }
}
