//! SQLite-backed catalog store.
//!
//! Query descriptions are translated into parameterised SQL:
//!
//! ```sql
//! status = ?                                   -- Status
//! (instr(unicode_lower(title), ?) > 0 OR ...)  -- Text over the search fields
//! instr(unicode_lower(fuel), ?) > 0            -- Category
//! price >= ? / price <= ?                      -- Price / Year / Mileage
//! featured = 1                                 -- Featured
//! ORDER BY featured DESC, <key> <dir>, id ASC LIMIT ? OFFSET ?
//! ```
//!
//! SQLite's own `lower()` folds ASCII only, so every connection registers
//! `unicode_lower`, which applies the same lowercasing as the query builder.
//!
//! rusqlite is blocking, so every call runs on the blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{ActiveAggregate, CatalogStore, StoreError};
use crate::catalog::criteria::{SortKey, SortOrder};
use crate::catalog::query::{CategoryField, Comparison, Predicate, QueryDescription, SEARCH_FIELDS, TextField};
use crate::models::{Listing, ListingImage, ListingStatus, ListingSummary};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    id           TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    price        REAL NOT NULL,
    brand        TEXT NOT NULL,
    model        TEXT NOT NULL,
    year         INTEGER NOT NULL,
    mileage      INTEGER,
    fuel         TEXT,
    transmission TEXT,
    capacity     INTEGER,
    location     TEXT,
    whatsapp     TEXT,
    featured     INTEGER NOT NULL DEFAULT 0,
    status       TEXT NOT NULL DEFAULT 'active',
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_listings_status_featured ON listings (status, featured);
CREATE TABLE IF NOT EXISTS listing_images (
    id          TEXT PRIMARY KEY,
    listing_id  TEXT NOT NULL REFERENCES listings (id) ON DELETE CASCADE,
    url         TEXT NOT NULL,
    public_id   TEXT,
    sort_order  INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_listing_images_listing ON listing_images (listing_id, sort_order);
"#;

const SUMMARY_COLUMNS: &str = r#"
    l.id, l.title, l.price, l.brand, l.model, l.year, l.mileage, l.fuel, l.transmission,
    l.capacity, l.location, l.whatsapp, l.featured, l.status, l.created_at,
    pi.id, pi.url, pi.public_id, pi.sort_order
"#;

// Primary image = lowest sort_order, ties broken by id
const PRIMARY_IMAGE_JOIN: &str = r#"
    LEFT JOIN listing_images pi ON pi.id = (
        SELECT i.id FROM listing_images i
        WHERE i.listing_id = l.id
        ORDER BY i.sort_order ASC, i.id ASC
        LIMIT 1
    )
"#;

const LOWER_FN: &str = "unicode_lower";

// Registers LOWER_FN; NULL stays NULL so missing columns never match
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        LOWER_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

/// A WHERE clause (without the keyword) plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<Value>,
}

impl SqlFilter {
    pub fn translate(predicates: &[Predicate]) -> Self {
        let mut params = Vec::new();
        let parts: Vec<String> = predicates
            .iter()
            .map(|p| translate_predicate(p, &mut params))
            .collect();
        let clause = if parts.is_empty() { "1 = 1".to_string() } else { parts.join(" AND ") };
        SqlFilter { clause, params }
    }
}

fn text_column(field: TextField) -> &'static str {
    match field {
        TextField::Title => "l.title",
        TextField::Description => "l.description",
        TextField::Brand => "l.brand",
        TextField::Model => "l.model",
        TextField::Location => "l.location",
    }
}

fn category_column(field: CategoryField) -> &'static str {
    match field {
        CategoryField::Brand => "l.brand",
        CategoryField::Fuel => "l.fuel",
        CategoryField::Transmission => "l.transmission",
    }
}

fn comparison<T: Into<Value> + Copy>(column: &str, cmp: &Comparison<T>, params: &mut Vec<Value>) -> String {
    match cmp {
        Comparison::AtLeast(v) => {
            params.push((*v).into());
            format!("{} >= ?", column)
        }
        Comparison::AtMost(v) => {
            params.push((*v).into());
            format!("{} <= ?", column)
        }
    }
}

fn translate_predicate(predicate: &Predicate, params: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::Status(status) => {
            params.push(Value::Text(status.as_str().to_string()));
            "l.status = ?".to_string()
        }
        Predicate::Text(term) => {
            let parts: Vec<String> = SEARCH_FIELDS
                .iter()
                .map(|field| {
                    params.push(Value::Text(term.clone()));
                    format!("instr({}({}), ?) > 0", LOWER_FN, text_column(*field))
                })
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Predicate::Category { field, value } => {
            params.push(Value::Text(value.clone()));
            format!("instr({}({}), ?) > 0", LOWER_FN, category_column(*field))
        }
        Predicate::Price(cmp) => comparison("l.price", cmp, params),
        Predicate::Year(cmp) => comparison("l.year", cmp, params),
        Predicate::Mileage(cmp) => comparison("l.mileage", cmp, params),
        Predicate::Featured => "l.featured = 1".to_string(),
    }
}

fn order_by(key: SortKey, order: SortOrder) -> String {
    let column = match key {
        SortKey::CreatedAt => "l.created_at",
        SortKey::Price => "l.price",
        SortKey::Year => "l.year",
        SortKey::Mileage => "l.mileage",
    };
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!("l.featured DESC, {} {}, l.id ASC", column, direction)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingSummary> {
    let status: String = row.get(13)?;
    let image_id: Option<String> = row.get(15)?;
    let primary_image = match image_id {
        Some(id) => Some(ListingImage {
            id,
            url: row.get(16)?,
            public_id: row.get(17)?,
            order: row.get(18)?,
        }),
        None => None,
    };
    Ok(ListingSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        brand: row.get(3)?,
        model: row.get(4)?,
        year: row.get(5)?,
        mileage: row.get(6)?,
        fuel: row.get(7)?,
        transmission: row.get(8)?,
        capacity: row.get(9)?,
        location: row.get(10)?,
        whatsapp: row.get(11)?,
        featured: row.get(12)?,
        // Unknown statuses are never eligible for public queries anyway
        status: status.parse().unwrap_or(ListingStatus::Inactive),
        created_at: row.get::<_, DateTime<Utc>>(14)?,
        primary_image,
    })
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_functions(&conn)?;
        conn.execute_batch(SCHEMA)?;
        info!("SQLite catalog schema ready");
        Ok(SqliteStore { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))?;
            f(&mut guard)
        })
        .await?
    }

    /// Inserts or replaces a listing together with its images.
    pub async fn upsert(&self, listing: Listing) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO listings (id, title, description, price, brand, model, year, mileage,
                    fuel, transmission, capacity, location, whatsapp, featured, status, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title, description = excluded.description,
                    price = excluded.price, brand = excluded.brand, model = excluded.model,
                    year = excluded.year, mileage = excluded.mileage, fuel = excluded.fuel,
                    transmission = excluded.transmission, capacity = excluded.capacity,
                    location = excluded.location, whatsapp = excluded.whatsapp,
                    featured = excluded.featured, status = excluded.status,
                    created_at = excluded.created_at
                "#,
                params![
                    listing.id,
                    listing.title,
                    listing.description,
                    listing.price,
                    listing.brand,
                    listing.model,
                    listing.year,
                    listing.mileage,
                    listing.fuel,
                    listing.transmission,
                    listing.capacity,
                    listing.location,
                    listing.whatsapp,
                    listing.featured,
                    listing.status.as_str(),
                    listing.created_at,
                ],
            )?;
            tx.execute("DELETE FROM listing_images WHERE listing_id = ?1", params![listing.id])?;
            for image in &listing.images {
                tx.execute(
                    "INSERT INTO listing_images (id, listing_id, url, public_id, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![image.id, listing.id, image.url, image.public_id, image.order],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let any: Option<i64> = conn
                .query_row("SELECT 1 FROM listings LIMIT 1", [], |row| row.get(0))
                .optional()?;
            Ok(any.is_none())
        })
        .await
    }
}

fn distinct_active(conn: &Connection, column: &str) -> Result<Vec<String>, StoreError> {
    let sql = format!(
        "SELECT DISTINCT {col} FROM listings WHERE status = 'active' AND {col} IS NOT NULL AND trim({col}) <> '' ORDER BY {col} ASC",
        col = column
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn pair<T>(min: Option<T>, max: Option<T>) -> Option<(T, T)> {
    min.zip(max)
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn find(&self, query: &QueryDescription) -> Result<Vec<ListingSummary>, StoreError> {
        let filter = SqlFilter::translate(&query.predicates);
        let sql = format!(
            "SELECT {} FROM listings l {} WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            SUMMARY_COLUMNS,
            PRIMARY_IMAGE_JOIN,
            filter.clause,
            order_by(query.sort.key, query.sort.order)
        );
        debug!(sql = %sql, params = filter.params.len(), "Running catalog find");

        let mut params = filter.params;
        params.push(Value::Integer(i64::from(query.take)));
        params.push(Value::Integer(i64::try_from(query.skip).unwrap_or(i64::MAX)));

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params), summary_from_row)?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
        .await
    }

    async fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let filter = SqlFilter::translate(predicates);
        let sql = format!("SELECT COUNT(*) FROM listings l WHERE {}", filter.clause);
        self.with_conn(move |conn| {
            let total: i64 = conn.query_row(&sql, params_from_iter(filter.params), |row| row.get(0))?;
            Ok(total.max(0) as u64)
        })
        .await
    }

    async fn aggregate_active(&self) -> Result<ActiveAggregate, StoreError> {
        self.with_conn(|conn| {
            let mut aggregate = conn.query_row(
                r#"
                SELECT MIN(price), MAX(price), MIN(year), MAX(year), MIN(mileage), MAX(mileage), COUNT(*)
                FROM listings WHERE status = 'active'
                "#,
                [],
                |row| {
                    Ok(ActiveAggregate {
                        price: pair(row.get(0)?, row.get(1)?),
                        year: pair(row.get(2)?, row.get(3)?),
                        mileage: pair(row.get(4)?, row.get(5)?),
                        count: row.get::<_, i64>(6)?.max(0) as u64,
                        ..ActiveAggregate::default()
                    })
                },
            )?;
            aggregate.brands = distinct_active(conn, "brand")?;
            aggregate.fuels = distinct_active(conn, "fuel")?;
            aggregate.transmissions = distinct_active(conn, "transmission")?;
            Ok(aggregate)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::bounds::FallbackBounds;
    use crate::catalog::criteria::FilterCriteria;
    use crate::catalog::query::QueryBuilder;
    use crate::catalog::range::RangeFilter;
    use crate::store::MemoryStore;
    use crate::test_support::fleet;
    use pretty_assertions::assert_eq;

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for listing in fleet() {
            store.upsert(listing).await.unwrap();
        }
        store
    }

    #[test]
    fn translates_text_search_over_all_fields() {
        let filter = SqlFilter::translate(&[Predicate::Text("volvo".into())]);
        assert_eq!(filter.clause.matches(" OR ").count(), 4);
        assert_eq!(filter.params.len(), 5);
    }

    #[test]
    fn empty_predicates_match_everything() {
        let filter = SqlFilter::translate(&[]);
        assert_eq!(filter.clause, "1 = 1");
        assert!(filter.params.is_empty());
    }

    #[tokio::test]
    async fn agrees_with_memory_store() {
        let sqlite = seeded().await;
        let memory = MemoryStore::new(fleet());
        let bounds = FallbackBounds::default().snapshot();

        let cases = vec![
            FilterCriteria::default(),
            FilterCriteria { search: Some("paradiso".into()), ..FilterCriteria::default() },
            FilterCriteria {
                price: RangeFilter::new(Some(100_000.0), Some(600_000.0)),
                sort_by: SortKey::Price,
                sort_order: SortOrder::Asc,
                ..FilterCriteria::default()
            },
            FilterCriteria { sort_by: SortKey::Mileage, sort_order: SortOrder::Asc, ..FilterCriteria::default() },
            FilterCriteria { fuel: Some("diesel".into()), featured_only: true, ..FilterCriteria::default() },
            FilterCriteria { page: 2, page_size: 2, ..FilterCriteria::default() },
            FilterCriteria { search: Some("MICRO-ÔNIBUS".into()), ..FilterCriteria::default() },
            FilterCriteria { search: Some("ônibus rodoviário".into()), ..FilterCriteria::default() },
            FilterCriteria { fuel: Some("ELÉTRICO".into()), ..FilterCriteria::default() },
            FilterCriteria { transmission: Some("automática".into()), ..FilterCriteria::default() },
        ];

        for criteria in cases {
            let query = QueryBuilder::new(&bounds).build(&criteria);
            let from_sql = sqlite.find(&query).await.unwrap();
            let from_memory = memory.find(&query).await.unwrap();
            assert_eq!(from_sql, from_memory, "criteria: {:?}", criteria);
            assert_eq!(
                sqlite.count(&query.predicates).await.unwrap(),
                memory.count(&query.predicates).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn accented_text_matches_regardless_of_case() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut upper = crate::test_support::listing("upper", 300_000.0);
        upper.title = "ÔNIBUS RODOVIÁRIO LEITO".into();
        upper.fuel = Some("ELÉTRICO".into());
        store.upsert(upper).await.unwrap();
        store.upsert(crate::test_support::listing("plain", 310_000.0)).await.unwrap();

        let bounds = FallbackBounds::default().snapshot();
        let by_title = QueryBuilder::new(&bounds)
            .build(&FilterCriteria { search: Some("ônibus rodoviário".into()), ..FilterCriteria::default() });
        assert_eq!(store.count(&by_title.predicates).await.unwrap(), 2);

        let by_fuel = QueryBuilder::new(&bounds)
            .build(&FilterCriteria { fuel: Some("elétrico".into()), ..FilterCriteria::default() });
        let rows = store.find(&by_fuel).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["upper"]);
    }

    #[tokio::test]
    async fn aggregate_matches_memory_store() {
        let sqlite = seeded().await;
        let memory = MemoryStore::new(fleet());
        assert_eq!(sqlite.aggregate_active().await.unwrap(), memory.aggregate_active().await.unwrap());
    }

    #[tokio::test]
    async fn upsert_replaces_images_and_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.is_empty().await.unwrap());

        let mut listing = fleet().remove(0);
        store.upsert(listing.clone()).await.unwrap();
        listing.price = 1.0;
        listing.images.truncate(1);
        store.upsert(listing.clone()).await.unwrap();

        let bounds = FallbackBounds::default().snapshot();
        let query = QueryBuilder::new(&bounds)
            .visibility(crate::catalog::query::Visibility::Privileged(None))
            .build(&FilterCriteria::default());
        let rows = store.find(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, 1.0);
        assert_eq!(rows[0], listing.summary());
    }
}
