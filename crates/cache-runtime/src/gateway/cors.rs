//! CORS for the read-through gateway.
//!
//! Browsers on the listed origins may `GET` node info and snapshots.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Request headers a browser may send.
fn allowed_headers() -> Vec<HeaderName> {
    vec![
        header::ORIGIN,
        header::DNT,
        header::USER_AGENT,
        HeaderName::from_static("x-requested-with"),
        header::IF_MODIFIED_SINCE,
        header::CACHE_CONTROL,
        header::CONTENT_TYPE,
        header::RANGE,
    ]
}

/// Create the CORS layer for `origins`. `"*"` allows any origin.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(allowed_headers())
        .expose_headers([header::CONTENT_LENGTH]);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}
