// Route definitions

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod api;

pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/listings", get(api::list_listings))
        .route("/listings/stats", get(api::listing_stats))
        // Routes requiring authentication
        .route("/admin/listings", get(api::admin_list_listings));

    Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
