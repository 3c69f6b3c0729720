//! Ingestion proxy surface for charging-station data.
//!
//! The dashboard calls this endpoint directly from the browser, so every
//! response (success, failure, preflight) carries the permissive
//! cross-origin header set.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::chargemap::{StationQuery, StationRecord};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct StationsResponse {
    pub stations: Vec<StationRecord>,
    pub total: usize,
}

/// Cross-origin headers the dashboard depends on.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers
}

/// Answer cross-origin preflight immediately: success, empty body.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, cors_headers())
}

/// GET /api/stations: query the upstream directory and return the
/// normalized result set.
pub async fn list_stations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stations = state.chargemap.fetch_stations(&query).await.map_err(|e| {
        tracing::error!(error = %e, countrycode = %query.countrycode, "station lookup failed");
        ApiError::from(e).with_headers(cors_headers())
    })?;

    let total = stations.len();
    tracing::debug!(total, countrycode = %query.countrycode, "station lookup succeeded");

    Ok((
        StatusCode::OK,
        cors_headers(),
        Json(StationsResponse { stations, total }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChargeMapConfig, Config};
    use axum::{routing::get, Router};

    async fn spawn_app(upstream: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let config = Config {
            chargemap: ChargeMapConfig {
                base_url: format!("http://{}/poi", upstream_addr),
                api_key: None,
                request_timeout_secs: 5,
            },
            ..Config::default()
        };
        let chargemap = crate::chargemap::ChargeMapClient::new(&config.chargemap).unwrap();
        let state = Arc::new(AppState::new(config, chargemap));
        let app = crate::api::create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn sample_upstream() -> Router {
        Router::new().route(
            "/poi",
            get(|| async {
                Json(serde_json::json!([
                    { "ID": 1, "AddressInfo": { "Title": "Posto A" }, "NumberOfPoints": 2 },
                    { "ID": 2 }
                ]))
            }),
        )
    }

    #[tokio::test]
    async fn test_stations_success_shape_and_headers() {
        let base = spawn_app(sample_upstream()).await;
        let response = reqwest::get(format!("{}/api/stations?countrycode=BR", base))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );

        let body: StationsResponse = response.json().await.unwrap();
        assert_eq!(body.total, 2);
        assert_eq!(body.stations.len(), 2);
        assert_eq!(body.stations[0].title, "Posto A");
        assert_eq!(body.stations[0].num_points, 2);
        assert_eq!(body.stations[1].title, crate::chargemap::UNNAMED_STATION);
    }

    #[tokio::test]
    async fn test_preflight_is_empty_with_cors_headers() {
        let base = spawn_app(sample_upstream()).await;
        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("{}/api/stations", base))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        let headers = response.headers().clone();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            headers.get("access-control-allow-headers").unwrap(),
            "authorization, x-client-info, apikey, content-type"
        );
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "GET, POST, OPTIONS"
        );
        assert!(response.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_yields_500_with_error_body() {
        let upstream = Router::new().route(
            "/poi",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = spawn_app(upstream).await;

        let response = reqwest::get(format!("{}/api/stations", base)).await.unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );

        let body: serde_json::Value = response.json().await.unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(!message.is_empty());
    }
}
