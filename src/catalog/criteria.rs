//! Search, filter, sort and paging selections for one catalog query.
//!
//! `CatalogParams` is the flat wire shape (every field an optional string so a
//! malformed value never rejects the request); `FilterCriteria` is the closed,
//! coerced value the query builder consumes.

use serde::{Deserialize, Serialize};

use super::range::RangeFilter;
use crate::config::CatalogSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Price,
    Year,
    Mileage,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "createdAt",
            SortKey::Price => "price",
            SortKey::Year => "year",
            SortKey::Mileage => "mileage",
        }
    }

    /// Unknown keys fall back to `createdAt`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "price" => SortKey::Price,
            "year" => SortKey::Year,
            "mileage" => SortKey::Mileage,
            _ => SortKey::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

/// Flat query-string parameters of the catalog operation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParams {
    pub search: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_year: Option<String>,
    pub max_year: Option<String>,
    pub min_mileage: Option<String>,
    pub max_mileage: Option<String>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub featured: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Everything a caller selected for a single query. Replaced wholesale per
/// query, never patched field by field across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub brand: Option<String>,
    pub price: RangeFilter<f64>,
    pub year: RangeFilter<i32>,
    pub mileage: RangeFilter<i64>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    pub featured_only: bool,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria {
            search: None,
            brand: None,
            price: RangeFilter::unbounded(),
            year: RangeFilter::unbounded(),
            mileage: RangeFilter::unbounded(),
            fuel: None,
            transmission: None,
            featured_only: false,
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: CatalogSettings::default().default_page_size,
        }
    }
}

impl FilterCriteria {
    /// Coerces wire parameters. Never fails: malformed numbers become absent,
    /// bad paging falls back to page 1 and the default page size.
    pub fn from_params(params: &CatalogParams, default_page_size: u32, max_page_size: u32) -> Self {
        let max_page_size = max_page_size.max(1);
        let page_size = params
            .limit
            .as_deref()
            .and_then(parse_u32)
            .filter(|limit| *limit > 0)
            .unwrap_or(default_page_size)
            .clamp(1, max_page_size);

        FilterCriteria {
            search: non_blank(params.search.as_deref()),
            brand: non_blank(params.brand.as_deref()),
            price: RangeFilter::new(
                params.min_price.as_deref().and_then(parse_f64),
                params.max_price.as_deref().and_then(parse_f64),
            ),
            year: RangeFilter::new(
                params.min_year.as_deref().and_then(parse_int).and_then(|y| i32::try_from(y).ok()),
                params.max_year.as_deref().and_then(parse_int).and_then(|y| i32::try_from(y).ok()),
            ),
            mileage: RangeFilter::new(
                params.min_mileage.as_deref().and_then(parse_int),
                params.max_mileage.as_deref().and_then(parse_int),
            ),
            fuel: non_blank(params.fuel.as_deref()),
            transmission: non_blank(params.transmission.as_deref()),
            featured_only: params.featured.as_deref().is_some_and(|f| f.trim() == "true"),
            sort_by: params.sort_by.as_deref().map(SortKey::parse_lenient).unwrap_or_default(),
            sort_order: params.sort_order.as_deref().map(SortOrder::parse_lenient).unwrap_or_default(),
            page: params.page.as_deref().and_then(parse_u32).filter(|p| *p >= 1).unwrap_or(1),
            page_size,
        }
    }

    /// Inverse of `from_params`, emitting only the fields that are set.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(brand) = &self.brand {
            pairs.push(("brand", brand.clone()));
        }
        push_range(&mut pairs, "minPrice", "maxPrice", &self.price);
        push_range(&mut pairs, "minYear", "maxYear", &self.year);
        push_range(&mut pairs, "minMileage", "maxMileage", &self.mileage);
        if let Some(fuel) = &self.fuel {
            pairs.push(("fuel", fuel.clone()));
        }
        if let Some(transmission) = &self.transmission {
            pairs.push(("transmission", transmission.clone()));
        }
        pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        if self.featured_only {
            pairs.push(("featured", "true".to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.page_size.to_string()));
        pairs
    }

    /// Rows to skip for the current page. Page is treated as at least 1.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }
}

fn push_range<T: ToString + Copy>(
    pairs: &mut Vec<(&'static str, String)>,
    min_key: &'static str,
    max_key: &'static str,
    range: &RangeFilter<T>,
) {
    if let Some(min) = range.min {
        pairs.push((min_key, min.to_string()));
    }
    if let Some(max) = range.max {
        pairs.push((max_key, max.to_string()));
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// Integers also accept a decimal form and truncate it ("2015.0" -> 2015)
fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        parse_f64(raw)
            .filter(|v| v.abs() < i64::MAX as f64)
            .map(|v| v.trunc() as i64)
    })
}

fn parse_u32(raw: &str) -> Option<u32> {
    parse_int(raw).and_then(|v| u32::try_from(v).ok())
}
