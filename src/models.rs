// Catalog data structures shared by the store, the query service and the client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// Lifecycle status of a listing. Only `Active` is visible to unprivileged callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Inactive => "inactive",
            ListingStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ListingStatus::Active),
            "inactive" => Ok(ListingStatus::Inactive),
            "sold" => Ok(ListingStatus::Sold),
            other => Err(format!("unknown listing status '{}'", other)),
        }
    }
}

// Reference to a hosted image; `order` 0 is the primary image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingImage {
    pub id: String,
    pub url: String,
    pub public_id: Option<String>,
    pub order: i32,
}

// A vehicle for sale as persisted by the storage collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: Option<i64>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub whatsapp: Option<String>, // Seller contact handle
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<ListingImage>,
}

impl Listing {
    // Lowest-order image, the only one list views carry
    pub fn primary_image(&self) -> Option<&ListingImage> {
        self.images.iter().min_by_key(|image| image.order)
    }

    pub fn summary(&self) -> ListingSummary {
        ListingSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            price: self.price,
            brand: self.brand.clone(),
            model: self.model.clone(),
            year: self.year,
            mileage: self.mileage,
            fuel: self.fuel.clone(),
            transmission: self.transmission.clone(),
            capacity: self.capacity,
            location: self.location.clone(),
            whatsapp: self.whatsapp.clone(),
            featured: self.featured,
            status: self.status,
            created_at: self.created_at,
            primary_image: self.primary_image().cloned(),
        }
    }
}

// List-view projection of a listing: key specs plus the primary image only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: Option<i64>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub whatsapp: Option<String>,
    pub featured: bool,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub primary_image: Option<ListingImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        // limit is clamped to >= 1 upstream; guard anyway so pages stays defined
        let pages = if limit == 0 { 0 } else { total.div_ceil(u64::from(limit)) };
        Pagination { page, limit, total, pages }
    }
}

// One page of catalog results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub listings: Vec<ListingSummary>,
    pub pagination: Pagination,
}

impl ResultPage {
    pub fn new(listings: Vec<ListingSummary>, page: u32, limit: u32, total: u64) -> Self {
        ResultPage {
            listings,
            pagination: Pagination::new(page, limit, total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pagination.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn image(id: &str, order: i32) -> ListingImage {
        ListingImage {
            id: id.to_string(),
            url: format!("https://img.example/{}.jpg", id),
            public_id: None,
            order,
        }
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(3, 12, 25).pages, 3);
        assert_eq!(Pagination::new(1, 12, 24).pages, 2);
        assert_eq!(Pagination::new(1, 12, 1).pages, 1);
    }

    #[test]
    fn zero_matches_means_zero_pages() {
        let page = ResultPage::new(Vec::new(), 1, 12, 0);
        assert_eq!(page.pagination.pages, 0);
        assert!(page.is_empty());
    }

    proptest! {
        #[test]
        fn pages_cover_total_exactly(total in 0u64..100_000, limit in 1u32..200) {
            let pages = Pagination::new(1, limit, total).pages;
            let limit = u64::from(limit);
            if total == 0 {
                prop_assert_eq!(pages, 0);
            } else {
                // every match fits, and the last page is never empty
                prop_assert!(pages * limit >= total);
                prop_assert!((pages - 1) * limit < total);
                let last = total - (pages - 1) * limit;
                prop_assert!((1..=limit).contains(&last));
            }
        }
    }

    #[test]
    fn summary_keeps_only_lowest_order_image() {
        let listing = Listing {
            id: "l1".into(),
            title: "Marcopolo Paradiso".into(),
            description: String::new(),
            price: 350_000.0,
            brand: "Volvo".into(),
            model: "B12R".into(),
            year: 2015,
            mileage: Some(400_000),
            fuel: Some("Diesel".into()),
            transmission: None,
            capacity: Some(46),
            location: None,
            whatsapp: None,
            featured: false,
            status: ListingStatus::Active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            images: vec![image("b", 2), image("a", 0), image("c", 1)],
        };

        let summary = listing.summary();
        assert_eq!(summary.primary_image.map(|i| i.id), Some("a".to_string()));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(" Sold ".parse::<ListingStatus>(), Ok(ListingStatus::Sold));
        assert!("retired".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn pagination_serializes_with_wire_names() {
        let json = serde_json::to_value(Pagination::new(1, 12, 13)).unwrap();
        assert_eq!(json, serde_json::json!({"page": 1, "limit": 12, "total": 13, "pages": 2}));
    }
}
