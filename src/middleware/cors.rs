use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// CORS for the web app origin; falls back to any origin if it does not parse.
pub fn webapp_cors(webapp_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE]);

    match HeaderValue::from_str(webapp_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            tracing::warn!(webapp_url, "invalid WEBAPP_URL for CORS, allowing any origin");
            layer.allow_origin(Any)
        }
    }
}
