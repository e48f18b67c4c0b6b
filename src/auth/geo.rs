//! Country-based access gate
//!
//! Reads the visitor country set by the edge proxy. Requests without a
//! country header pass through.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;
use crate::config::GeoBlockConfig;

/// Headers carrying the ISO country code, in lookup order
const COUNTRY_HEADERS: &[&str] = &["x-vercel-ip-country", "cf-ipcountry"];

fn request_country(headers: &HeaderMap) -> Option<String> {
    COUNTRY_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_ascii_uppercase())
            .filter(|value| !value.is_empty())
    })
}

/// The blocked country, if the request must be refused
pub fn blocked_country(headers: &HeaderMap, config: &GeoBlockConfig) -> Option<String> {
    if !config.enabled {
        return None;
    }

    let country = request_country(headers)?;
    let allowed = config
        .allowed_countries
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&country));
    (!allowed).then_some(country)
}

/// Middleware refusing requests from countries outside the allow list
pub async fn geo_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(country) = blocked_country(request.headers(), &state.config.geo_block) {
        tracing::info!(%country, path = %request.uri().path(), "Request blocked by geo gate");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Access denied",
                "message": "This service is not available in your region.",
            })),
        )
            .into_response();
    }

    next.run(request).await
}
