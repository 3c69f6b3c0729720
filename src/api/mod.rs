mod error;
mod stations;

pub use error::{ApiError, ErrorResponse};
pub use stations::StationsResponse;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let station_routes = Router::new().route(
        "/stations",
        get(stations::list_stations).options(stations::preflight),
    );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", station_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
