//! Query Builder: maps a [`FilterCriteria`] onto a deterministic, side-effect
//! free [`QueryDescription`] (predicates + sort + skip/take window).
//!
//! Each criteria field maps to at most one predicate kind. Numeric bounds
//! equal to the live snapshot bound are omitted, so a default-spanning range
//! never narrows results after the catalog's true bounds move.

use serde::Serialize;

use super::bounds::FilterBoundsSnapshot;
use super::criteria::{FilterCriteria, SortKey, SortOrder};
use super::range::{RangeBound, RangeFilter, RangeValue};
use crate::models::ListingStatus;

/// Which statuses a caller may see. Decided by the authorization gate before
/// the builder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// All statuses, or only the given one.
    Privileged(Option<ListingStatus>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextField {
    Title,
    Description,
    Brand,
    Model,
    Location,
}

/// Fields searched by free text, in evaluation order.
pub const SEARCH_FIELDS: [TextField; 5] = [
    TextField::Title,
    TextField::Description,
    TextField::Brand,
    TextField::Model,
    TextField::Location,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CategoryField {
    Brand,
    Fuel,
    Transmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Comparison<T> {
    AtLeast(T),
    AtMost(T),
}

impl<T: RangeValue> Comparison<T> {
    pub fn accepts(&self, value: T) -> bool {
        match *self {
            Comparison::AtLeast(min) => value >= min,
            Comparison::AtMost(max) => value <= max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Predicate {
    Status(ListingStatus),
    /// Case-insensitive containment in any of [`SEARCH_FIELDS`]; term is lowercased.
    Text(String),
    /// Case-insensitive containment; value is lowercased.
    Category { field: CategoryField, value: String },
    Price(Comparison<f64>),
    Year(Comparison<i32>),
    Mileage(Comparison<i64>),
    Featured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

/// Full description of one catalog query. Sorting is always featured first,
/// then `sort`, then id ascending as a total-order tiebreaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescription {
    pub predicates: Vec<Predicate>,
    pub sort: SortSpec,
    pub skip: u64,
    pub take: u32,
}

impl QueryDescription {
    pub fn has_price_predicate(&self) -> bool {
        self.predicates.iter().any(|p| matches!(p, Predicate::Price(_)))
    }
}

pub struct QueryBuilder<'a> {
    bounds: &'a FilterBoundsSnapshot,
    visibility: Visibility,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(bounds: &'a FilterBoundsSnapshot) -> Self {
        QueryBuilder { bounds, visibility: Visibility::Public }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn build(&self, criteria: &FilterCriteria) -> QueryDescription {
        let mut predicates = Vec::new();

        match self.visibility {
            Visibility::Public => predicates.push(Predicate::Status(ListingStatus::Active)),
            Visibility::Privileged(Some(status)) => predicates.push(Predicate::Status(status)),
            Visibility::Privileged(None) => {}
        }

        if let Some(term) = lowered(criteria.search.as_deref()) {
            predicates.push(Predicate::Text(term));
        }
        if let Some(value) = lowered(criteria.brand.as_deref()) {
            predicates.push(Predicate::Category { field: CategoryField::Brand, value });
        }

        range_predicates(&criteria.price, &self.bounds.price_range, &mut predicates, Predicate::Price);
        range_predicates(&criteria.year, &self.bounds.year_range, &mut predicates, Predicate::Year);
        range_predicates(&criteria.mileage, &self.bounds.mileage_range, &mut predicates, Predicate::Mileage);

        if let Some(value) = lowered(criteria.fuel.as_deref()) {
            predicates.push(Predicate::Category { field: CategoryField::Fuel, value });
        }
        if let Some(value) = lowered(criteria.transmission.as_deref()) {
            predicates.push(Predicate::Category { field: CategoryField::Transmission, value });
        }
        if criteria.featured_only {
            predicates.push(Predicate::Featured);
        }

        let page_size = criteria.page_size.max(1);
        QueryDescription {
            predicates,
            sort: SortSpec { key: criteria.sort_by, order: criteria.sort_order },
            skip: u64::from(criteria.page.max(1) - 1) * u64::from(page_size),
            take: page_size,
        }
    }
}

fn lowered(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
}

// Emits `>= min` / `<= max` only where the caller's bound differs from the
// snapshot bound on that side.
fn range_predicates<T: RangeValue>(
    filter: &RangeFilter<T>,
    bound: &RangeBound<T>,
    predicates: &mut Vec<Predicate>,
    wrap: fn(Comparison<T>) -> Predicate,
) {
    if let Some(min) = filter.min.filter(|min| *min != bound.min()) {
        predicates.push(wrap(Comparison::AtLeast(min)));
    }
    if let Some(max) = filter.max.filter(|max| *max != bound.max()) {
        predicates.push(wrap(Comparison::AtMost(max)));
    }
}
