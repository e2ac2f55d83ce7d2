// Client access to the catalog HTTP API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::catalog::{FallbackBounds, FilterBoundsSnapshot, FilterCriteria};
use crate::models::ResultPage;

#[derive(Error, Debug)]
pub enum FetchError {
    // Connection, timeout or body decoding failure
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Catalog responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Catalog fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch(&self, criteria: &FilterCriteria) -> Result<ResultPage, FetchError>;

    async fn fetch_bounds(&self) -> Result<FilterBoundsSnapshot, FetchError>;
}

/// Bounds for seeding a session; the fallback snapshot when the stats call fails.
pub async fn bounds_or_fallback(fetcher: &dyn CatalogFetcher, fallback: &FallbackBounds) -> FilterBoundsSnapshot {
    match fetcher.fetch_bounds().await {
        Ok(bounds) => bounds,
        Err(e) => {
            tracing::warn!("Failed to fetch filter bounds, using fallback: {}", e);
            fallback.snapshot()
        }
    }
}

// Shape of the API's error body
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct HttpCatalogFetcher {
    client: Client,
    base_url: String,
}

impl HttpCatalogFetcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("busmarket-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpCatalogFetcher { client, base_url }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unexpected status").to_string());
            tracing::warn!("GET {} returned {}: {}", url, status, message);
            return Err(FetchError::Status { status: status.as_u16(), message });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    async fn fetch(&self, criteria: &FilterCriteria) -> Result<ResultPage, FetchError> {
        self.get_json("/api/listings", &criteria.to_query_pairs()).await
    }

    async fn fetch_bounds(&self) -> Result<FilterBoundsSnapshot, FetchError> {
        self.get_json("/api/listings/stats", &[]).await
    }
}
