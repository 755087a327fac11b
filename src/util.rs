use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize dotenv and structured tracing based on RUST_LOG.
///
/// Supports an explicit env file path via ENV_FILE, then falls back to the
/// standard `.env` discovery in the working directory. Logs the source used.
pub fn init_tracing() {
    let mut env_source: String = "none".into();

    if let Ok(p) = std::env::var("ENV_FILE") {
        let p = p.trim();
        if !p.is_empty() && std::path::Path::new(p).is_file() && dotenvy::from_filename(p).is_ok() {
            env_source = format!("{p} (ENV_FILE)");
        }
    }
    if env_source == "none" && dotenvy::dotenv().is_ok() {
        env_source = ".env".into();
    }

    // Respects RUST_LOG potentially provided by the env file
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("Environment loaded from: {}", env_source);
}

/// Build an HTTP client honoring proxy and timeout environment variables.
///
/// Environment:
/// - BLOGFORGE_NO_PROXY = 1|true|yes|on   -> disable all proxies
/// - BLOGFORGE_PROXY_URL = <url>          -> proxy for all schemes
/// - HTTP_TIMEOUT_SECONDS                 -> overall request timeout (u64)
pub fn build_http_client_from_env() -> reqwest::Client {
    let mut builder = reqwest::Client::builder();

    if let Ok(secs) = std::env::var("HTTP_TIMEOUT_SECONDS") {
        if let Ok(n) = secs.trim().parse::<u64>() {
            builder = builder.timeout(std::time::Duration::from_secs(n));
        }
    }

    let no_proxy = std::env::var("BLOGFORGE_NO_PROXY")
        .map(|v| v.trim().to_ascii_lowercase())
        .map(|v| v == "1" || v == "true" || v == "yes" || v == "on")
        .unwrap_or(false);

    if no_proxy {
        builder = builder.no_proxy();
    } else if let Ok(url) = std::env::var("BLOGFORGE_PROXY_URL") {
        let u = url.trim();
        if !u.is_empty() {
            if let Ok(p) = reqwest::Proxy::all(u) {
                builder = builder.proxy(p);
            }
        }
    }

    builder = builder.user_agent(format!("blogforge/{}", env!("CARGO_PKG_VERSION")));

    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

/// Build a JSON error response with the given HTTP status and message.
pub fn error_response(status: StatusCode, msg: &str) -> Response {
    let body = serde_json::json!({ "error": msg });
    (status, axum::Json(body)).into_response()
}

/// Build a CORS layer from environment variables.
///
/// - CORS_ALLOWED_ORIGINS: "*" or comma-separated origins
/// - CORS_ALLOWED_METHODS: "*" or comma-separated methods
/// - CORS_ALLOWED_HEADERS: "*" or comma-separated request header names
///
/// Defaults are permissive (Any) when not configured.
pub fn cors_layer_from_env() -> tower_http::cors::CorsLayer {
    let mut layer = tower_http::cors::CorsLayer::new();

    match std::env::var("CORS_ALLOWED_ORIGINS") {
        Ok(origins) if origins.trim() != "*" => {
            let vals: Vec<http::HeaderValue> = origins
                .split(',')
                .filter_map(|p| http::HeaderValue::from_str(p.trim()).ok())
                .collect();
            if vals.is_empty() {
                layer = layer.allow_origin(tower_http::cors::Any);
            } else {
                layer = layer.allow_origin(tower_http::cors::AllowOrigin::list(vals));
            }
        }
        _ => layer = layer.allow_origin(tower_http::cors::Any),
    }

    match std::env::var("CORS_ALLOWED_METHODS") {
        Ok(methods) if methods.trim() != "*" => {
            let vals: Vec<http::Method> = methods
                .split(',')
                .filter_map(|p| {
                    http::Method::from_bytes(p.trim().to_ascii_uppercase().as_bytes()).ok()
                })
                .collect();
            if vals.is_empty() {
                layer = layer.allow_methods(tower_http::cors::Any);
            } else {
                layer = layer.allow_methods(tower_http::cors::AllowMethods::list(vals));
            }
        }
        _ => layer = layer.allow_methods(tower_http::cors::Any),
    }

    match std::env::var("CORS_ALLOWED_HEADERS") {
        Ok(headers) if headers.trim() != "*" => {
            let vals: Vec<http::header::HeaderName> = headers
                .split(',')
                .filter_map(|p| http::header::HeaderName::try_from(p.trim()).ok())
                .collect();
            if vals.is_empty() {
                layer = layer.allow_headers(tower_http::cors::Any);
            } else {
                layer = layer.allow_headers(tower_http::cors::AllowHeaders::list(vals));
            }
        }
        _ => layer = layer.allow_headers(tower_http::cors::Any),
    }

    layer
}
