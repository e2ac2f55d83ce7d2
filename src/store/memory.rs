// In-process catalog store. Evaluates query descriptions directly over a
// vector of listings; used for tests and for running without a database.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::RwLock;

use super::{ActiveAggregate, CatalogStore, StoreError};
use crate::catalog::criteria::{SortKey, SortOrder};
use crate::catalog::query::{CategoryField, Predicate, QueryDescription, SortSpec, SEARCH_FIELDS, TextField};
use crate::models::{Listing, ListingStatus, ListingSummary};

#[derive(Default)]
pub struct MemoryStore {
    listings: RwLock<Vec<Listing>>,
}

impl MemoryStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        MemoryStore { listings: RwLock::new(listings) }
    }

    // Upserts by id; subsequent queries observe the write
    pub fn insert(&self, listing: Listing) -> Result<(), StoreError> {
        let mut listings = self.write()?;
        match listings.iter_mut().find(|l| l.id == listing.id) {
            Some(existing) => *existing = listing,
            None => listings.push(listing),
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Listing>>, StoreError> {
        self.listings
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Listing>>, StoreError> {
        self.listings
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn text_field(listing: &Listing, field: TextField) -> Option<&str> {
    match field {
        TextField::Title => Some(&listing.title),
        TextField::Description => Some(&listing.description),
        TextField::Brand => Some(&listing.brand),
        TextField::Model => Some(&listing.model),
        TextField::Location => listing.location.as_deref(),
    }
}

pub(crate) fn matches(listing: &Listing, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Status(status) => listing.status == *status,
        Predicate::Text(term) => SEARCH_FIELDS
            .iter()
            .any(|field| contains(text_field(listing, *field), term)),
        Predicate::Category { field, value } => {
            let haystack = match field {
                CategoryField::Brand => Some(listing.brand.as_str()),
                CategoryField::Fuel => listing.fuel.as_deref(),
                CategoryField::Transmission => listing.transmission.as_deref(),
            };
            contains(haystack, value)
        }
        Predicate::Price(cmp) => cmp.accepts(listing.price),
        Predicate::Year(cmp) => cmp.accepts(listing.year),
        // A listing without mileage never satisfies a mileage bound
        Predicate::Mileage(cmp) => listing.mileage.is_some_and(|m| cmp.accepts(m)),
        Predicate::Featured => listing.featured,
    }
}

pub(crate) fn compare(a: &Listing, b: &Listing, sort: &SortSpec) -> Ordering {
    let by_key = match sort.key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Price => a.price.total_cmp(&b.price),
        SortKey::Year => a.year.cmp(&b.year),
        // None sorts before any value, as in SQL ascending order
        SortKey::Mileage => a.mileage.cmp(&b.mileage),
    };
    let by_key = match sort.order {
        SortOrder::Asc => by_key,
        SortOrder::Desc => by_key.reverse(),
    };
    b.featured
        .cmp(&a.featured)
        .then(by_key)
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find(&self, query: &QueryDescription) -> Result<Vec<ListingSummary>, StoreError> {
        let listings = self.read()?;
        let mut hits: Vec<&Listing> = listings
            .iter()
            .filter(|l| query.predicates.iter().all(|p| matches(l, p)))
            .collect();
        hits.sort_by(|a, b| compare(a, b, &query.sort));
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(skip)
            .take(query.take as usize)
            .map(Listing::summary)
            .collect())
    }

    async fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let listings = self.read()?;
        Ok(listings
            .iter()
            .filter(|l| predicates.iter().all(|p| matches(l, p)))
            .count() as u64)
    }

    async fn aggregate_active(&self) -> Result<ActiveAggregate, StoreError> {
        let listings = self.read()?;
        let mut aggregate = ActiveAggregate::default();

        for listing in listings.iter().filter(|l| l.status == ListingStatus::Active) {
            aggregate.count += 1;
            aggregate.price = Some(widen(aggregate.price, listing.price));
            aggregate.year = Some(widen(aggregate.year, listing.year));
            if let Some(mileage) = listing.mileage {
                aggregate.mileage = Some(widen(aggregate.mileage, mileage));
            }
            aggregate.brands.push(listing.brand.clone());
            aggregate.fuels.extend(listing.fuel.clone());
            aggregate.transmissions.extend(listing.transmission.clone());
        }

        for values in [&mut aggregate.brands, &mut aggregate.fuels, &mut aggregate.transmissions] {
            values.retain(|v| !v.trim().is_empty());
            values.sort();
            values.dedup();
        }
        Ok(aggregate)
    }
}

fn widen<T: PartialOrd + Copy>(current: Option<(T, T)>, value: T) -> (T, T) {
    match current {
        None => (value, value),
        Some((min, max)) => (
            if value < min { value } else { min },
            if value > max { value } else { max },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::bounds::FallbackBounds;
    use crate::catalog::criteria::FilterCriteria;
    use crate::catalog::query::QueryBuilder;
    use crate::catalog::range::RangeFilter;
    use crate::test_support::{fleet, listing};
    use pretty_assertions::assert_eq;

    fn ids(rows: &[ListingSummary]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    async fn run(store: &MemoryStore, criteria: FilterCriteria) -> Vec<ListingSummary> {
        let bounds = FallbackBounds::default().snapshot();
        let query = QueryBuilder::new(&bounds).build(&criteria);
        store.find(&query).await.unwrap()
    }

    #[tokio::test]
    async fn featured_listings_surface_first() {
        let store = MemoryStore::new(fleet());
        let rows = run(&store, FilterCriteria::default()).await;
        assert!(rows[0].featured);
        assert!(rows.iter().skip_while(|r| r.featured).all(|r| !r.featured));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_fields() {
        let store = MemoryStore::new(fleet());
        let rows = run(&store, FilterCriteria { search: Some("CURITIBA".into()), ..FilterCriteria::default() }).await;
        assert_eq!(ids(&rows), vec!["irizar"]);
    }

    #[tokio::test]
    async fn missing_mileage_fails_mileage_bounds() {
        let mut no_odo = listing("no-odo", 100_000.0);
        no_odo.mileage = None;
        let store = MemoryStore::new(vec![no_odo, listing("odo", 100_000.0)]);
        let rows = run(
            &store,
            FilterCriteria { mileage: RangeFilter::new(Some(1), None), ..FilterCriteria::default() },
        )
        .await;
        assert_eq!(ids(&rows), vec!["odo"]);
    }

    #[tokio::test]
    async fn insert_is_visible_to_next_query() {
        let store = MemoryStore::default();
        assert_eq!(store.count(&[]).await.unwrap(), 0);
        store.insert(listing("new", 90_000.0)).unwrap();
        assert_eq!(store.count(&[]).await.unwrap(), 1);
        store.insert(listing("new", 95_000.0)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn aggregate_skips_inactive_and_missing_values() {
        let mut retired = listing("retired", 1.0);
        retired.status = ListingStatus::Inactive;
        let mut no_odo = listing("no-odo", 300_000.0);
        no_odo.mileage = None;
        no_odo.fuel = None;
        let store = MemoryStore::new(vec![listing("a", 85_000.0), no_odo, retired]);

        let aggregate = store.aggregate_active().await.unwrap();
        assert_eq!(aggregate.count, 2);
        assert_eq!(aggregate.price, Some((85_000.0, 300_000.0)));
        assert_eq!(aggregate.mileage, Some((150_000, 150_000)));
        assert_eq!(aggregate.fuels, vec!["Diesel"]);
    }
}
