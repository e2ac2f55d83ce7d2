// Handlers for the catalog API

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use crate::{
    AppState,
    auth_middleware::AdminUser,
    catalog::{CatalogParams, FilterCriteria, Visibility},
    error::AppError,
    models::ListingStatus,
};

// Admin query: the public parameters plus an optional status
#[derive(Deserialize, Debug)]
pub struct AdminListingsQuery {
    status: Option<String>,
    #[serde(flatten)]
    params: CatalogParams,
}

// --- API Handlers ---

pub async fn list_listings(
    State(app_state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/listings - Request received: {:?}", params);
    let catalog = &app_state.settings.catalog;
    let criteria = FilterCriteria::from_params(&params, catalog.default_page_size, catalog.max_page_size);

    let page = app_state.catalog.execute(&criteria, Visibility::Public).await?;
    Ok(Json(page))
}

// Never fails: degraded aggregation is reported as the fallback snapshot
pub async fn listing_stats(State(app_state): State<AppState>) -> impl IntoResponse {
    tracing::info!("[HANDLER] /api/listings/stats - Request received.");
    Json(app_state.catalog.bounds().await)
}

pub async fn admin_list_listings(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<AdminListingsQuery>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("[HANDLER] /api/admin/listings - Request from admin {}: {:?}", admin.user_id, query);
    let catalog = &app_state.settings.catalog;
    let criteria = FilterCriteria::from_params(&query.params, catalog.admin_page_size, catalog.max_page_size);

    // An unrecognised status widens to all statuses rather than rejecting
    let status = query.status.as_deref().and_then(|s| match s.parse::<ListingStatus>() {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::warn!("[HANDLER] /api/admin/listings - Ignoring status filter: {}", e);
            None
        }
    });

    let page = app_state.catalog.execute(&criteria, Visibility::Privileged(status)).await?;
    Ok(Json(page))
}
