//! Application bootstrap: middleware, CORS policy, lifecycle hooks and the
//! serve loop.
//!
//! `main.rs` builds the [`AppState`] once, hands it to [`build_app`] and then
//! to [`serve`]; nothing here owns configuration of its own.

use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::CorsConfig;
use crate::{routes, AppState, Config};

/// Response header carrying the id assigned by [`log_requests`].
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ---

/// Assemble the full application router: routes, CORS and request logging.
///
/// Fails if the configured CORS origins, methods or headers are not valid
/// HTTP values.
pub fn build_app(state: AppState) -> Result<Router> {
    // ---
    let cors = cors_layer(&state.config.cors)?;

    Ok(routes::router(state)
        .layer(cors)
        .layer(middleware::from_fn(log_requests)))
}

/// Translate the configured cross-origin policy into a [`CorsLayer`].
///
/// A `*` entry means "any". Browsers reject a literal wildcard on credentialed
/// requests, so with credentials enabled a wildcard mirrors the request instead.
pub fn cors_layer(cors: &CorsConfig) -> Result<CorsLayer> {
    // ---
    let is_wildcard = |items: &[String]| items.iter().any(|item| item == "*");
    let credentials = cors.allow_credentials;

    let origins = if is_wildcard(&cors.origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        let origins = cors
            .origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin {origin:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    let methods = if is_wildcard(&cors.allow_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::any()
        }
    } else {
        let methods = cors
            .allow_methods
            .iter()
            .map(|method| {
                // Method names are case-sensitive; "get" would parse as an extension
                method
                    .to_ascii_uppercase()
                    .parse::<Method>()
                    .with_context(|| format!("Invalid CORS method {method:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowMethods::list(methods)
    };

    let headers = if is_wildcard(&cors.allow_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        }
    } else {
        let headers = cors
            .allow_headers
            .iter()
            .map(|header| {
                header
                    .parse::<HeaderName>()
                    .with_context(|| format!("Invalid CORS header {header:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowHeaders::list(headers)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials))
}

/// Log every request line and its outcome.
///
/// ```text
/// INFO GET /health/
/// INFO ↳ 200
/// ```
async fn log_requests(request: Request, next: Next) -> Response {
    // ---
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    info!(%request_id, "{} {}", request.method(), request.uri().path());

    let mut response = next.run(request).await;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(%request_id, latency_ms, "↳ {}", response.status().as_u16());

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// ---

/// Startup hook, run once before the first request is accepted.
pub fn on_startup(config: &Config, listener: &TcpListener) -> Result<()> {
    // ---
    info!("Starting {} backend...", config.app.name);

    // Database pool and AI rule loading are simulated until those layers exist
    info!("Database connected (simulated)");
    if config.ai_engine.enabled {
        info!("AI engine ready (simulated)");
    } else {
        info!("AI engine disabled");
    }

    let addr = listener.local_addr()?;
    info!("Backend operational on http://{}", addr);
    if config.docs.enable_swagger {
        info!("Documentation: http://{}{}", addr, config.docs.docs_url);
    }
    Ok(())
}

/// Shutdown hook, run once after the server stopped accepting requests.
pub fn on_shutdown(config: &Config) {
    info!("Stopping {} backend...", config.app.name);
    info!("Connections closed");
}

/// Serve `app` on `listener` until Ctrl-C or SIGTERM, running the lifecycle
/// hooks around the serve loop.
pub async fn serve(listener: TcpListener, app: Router, config: &Config) -> Result<()> {
    // ---
    on_startup(config, &listener)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    on_shutdown(config);
    Ok(())
}

async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
