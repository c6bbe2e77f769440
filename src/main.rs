//! Application entry point for the NovaCRM backend service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading and validating configuration from `.env` and the environment
//! - Initializing structured logging/tracing
//! - Building the Tokio runtime with the configured worker count
//! - Binding the listener and serving the API via `app` (EMBP pattern)
//!
//! Invalid configuration aborts startup before anything is bound.
//!
//! # Environment Variables
//! See `config` for the application keys. Logging additionally honours:
//! - `RUST_LOG` (optional) – overrides the configured `LOG_LEVEL`
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `FORCE_COLOR` (optional) – force ANSI colors on or off
use std::env;

use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use tokio::net::TcpListener;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use novacrm_backend::config::{self, LogFormat, LoggingConfig};
use novacrm_backend::{app, AppState, Config};

// ---

fn main() -> Result<()> {
    // ---
    let cfg = config::load_from_env()?;

    init_tracing(&cfg.logging);
    cfg.log_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.server.workers)
        .enable_all()
        .build()?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> Result<()> {
    // ---
    let listener = TcpListener::bind((cfg.server.host.as_str(), cfg.server.port))
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to bind {}:{}: {}",
                cfg.server.host,
                cfg.server.port,
                e
            )
        })?;

    // Startup instant is recorded here, before the first request is accepted
    let state = AppState::new(cfg);
    let app = app::build_app(state.clone())?;

    app::serve(listener, app, &state.config).await
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - `LOG_FORMAT=json` for JSON lines, `text` for the compact human format
/// - Color output (text format only) controlled by TTY detection and `FORCE_COLOR`:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level from `RUST_LOG` when set, otherwise from `LOG_LEVEL`
///
/// With `LOG_TO_CONSOLE=false` no subscriber is installed.
fn init_tracing(logging: &LoggingConfig) {
    // ---
    if !logging.to_console {
        return;
    }

    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(logging.level.as_filter_directive())
    };

    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(use_color).compact().init(),
    }
}
