// Application configuration
// Layered: defaults -> optional config.toml -> APP__* environment variables

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    pub database_path: String,
    // JSON array of listings, loaded only into an empty store
    pub seed_path: Option<String>,
    // HS256 secret used to verify admin bearer tokens
    pub admin_jwt_secret: Option<String>,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

// Catalog tuning: paging limits and the fallback snapshot used when the
// active catalog is empty or unreachable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub default_page_size: u32,
    pub admin_page_size: u32,
    pub max_page_size: u32,
    pub fallback_price_min: f64,
    pub fallback_price_max: f64,
    pub fallback_year_min: i32,
    pub fallback_mileage_min: i64,
    pub fallback_mileage_max: i64,
    pub fallback_brands: Vec<String>,
    pub fallback_fuels: Vec<String>,
    pub fallback_transmissions: Vec<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_page_size: 12,
            admin_page_size: 20,
            max_page_size: 100,
            fallback_price_min: 50_000.0,
            fallback_price_max: 1_000_000.0,
            fallback_year_min: 2010,
            fallback_mileage_min: 0,
            fallback_mileage_max: 500_000,
            fallback_brands: to_strings(&["Mercedes-Benz", "Volvo", "Scania", "MAN", "Iveco"]),
            fallback_fuels: to_strings(&["Diesel", "Gasolina", "Elétrico", "Híbrido"]),
            fallback_transmissions: to_strings(&["Manual", "Automática", "Automatizada"]),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("database_path", "busmarket.sqlite")?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Double underscore so field names keep their own underscores,
            // e.g. APP__CATALOG__MAX_PAGE_SIZE
            .add_source(Environment::with_prefix("APP").prefix_separator("__").separator("__"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
