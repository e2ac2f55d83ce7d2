//! Active-filter badges and one-click quick filters.

use serde::Serialize;

use super::controller::FilterEdit;
use crate::catalog::criteria::{FilterCriteria, SortKey, SortOrder};
use crate::catalog::range::{RangeBound, RangeFilter, RangeValue};
use crate::catalog::FilterBoundsSnapshot;

const BUDGET_PRICE_CEILING: f64 = 200_000.0;
const NEW_VEHICLE_YEARS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    Search,
    Brand,
    Fuel,
    Transmission,
    Featured,
    Price,
    Year,
    Mileage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveFilter {
    pub kind: FilterKind,
    pub label: String,
}

/// Filters currently narrowing the results. A numeric range counts only when
/// it is narrower than the snapshot bound.
pub fn active_filters(criteria: &FilterCriteria, bounds: &FilterBoundsSnapshot) -> Vec<ActiveFilter> {
    let mut active = Vec::new();
    let mut push = |kind, label: String| active.push(ActiveFilter { kind, label });

    if let Some(search) = &criteria.search {
        push(FilterKind::Search, format!("Search: {}", search));
    }
    if let Some(brand) = &criteria.brand {
        push(FilterKind::Brand, format!("Brand: {}", brand));
    }
    if let Some(fuel) = &criteria.fuel {
        push(FilterKind::Fuel, format!("Fuel: {}", fuel));
    }
    if let Some(transmission) = &criteria.transmission {
        push(FilterKind::Transmission, format!("Transmission: {}", transmission));
    }
    if criteria.featured_only {
        push(FilterKind::Featured, "Featured only".to_string());
    }
    if let Some(r) = narrowed(&criteria.price, &bounds.price_range) {
        push(FilterKind::Price, format!("Price: R$ {:.0} - R$ {:.0}", r.min(), r.max()));
    }
    if let Some(r) = narrowed(&criteria.year, &bounds.year_range) {
        push(FilterKind::Year, format!("Year: {} - {}", r.min(), r.max()));
    }
    if let Some(r) = narrowed(&criteria.mileage, &bounds.mileage_range) {
        push(FilterKind::Mileage, format!("Mileage: {} - {} km", r.min(), r.max()));
    }
    active
}

fn narrowed<T: RangeValue>(filter: &RangeFilter<T>, bound: &RangeBound<T>) -> Option<RangeBound<T>> {
    let resolved = filter.resolve(bound);
    (resolved.min() > bound.min() || resolved.max() < bound.max()).then_some(resolved)
}

/// The edit that removes exactly one active filter. Ranges are reopened on
/// both ends, i.e. they span whatever the live bounds are.
pub fn removal(kind: FilterKind) -> FilterEdit {
    match kind {
        FilterKind::Search => FilterEdit::Search(None),
        FilterKind::Brand => FilterEdit::Brand(None),
        FilterKind::Fuel => FilterEdit::Fuel(None),
        FilterKind::Transmission => FilterEdit::Transmission(None),
        FilterKind::Featured => FilterEdit::FeaturedOnly(false),
        FilterKind::Price => FilterEdit::Price(RangeFilter::unbounded()),
        FilterKind::Year => FilterEdit::Year(RangeFilter::unbounded()),
        FilterKind::Mileage => FilterEdit::Mileage(RangeFilter::unbounded()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilter {
    /// Newest listings first.
    Recent,
    /// Toggles featured-only.
    Featured,
    /// Cheapest end of the catalog, up to R$ 200.000.
    Budget,
    /// Model years from three years ago to now.
    New,
}

impl QuickFilter {
    pub fn edit(self, criteria: &FilterCriteria, bounds: &FilterBoundsSnapshot, current_year: i32) -> FilterEdit {
        match self {
            QuickFilter::Recent => FilterEdit::Sort(SortKey::CreatedAt, SortOrder::Desc),
            QuickFilter::Featured => FilterEdit::FeaturedOnly(!criteria.featured_only),
            QuickFilter::Budget => {
                let price = bounds.price_range;
                let ceiling = price.max().min(BUDGET_PRICE_CEILING).max(price.min());
                FilterEdit::Price(RangeFilter::new(Some(price.min()), Some(ceiling)))
            }
            QuickFilter::New => {
                let years = bounds.year_range;
                FilterEdit::Year(RangeFilter::new(
                    Some(years.clamp(current_year - NEW_VEHICLE_YEARS)),
                    Some(years.clamp(current_year)),
                ))
            }
        }
    }
}
