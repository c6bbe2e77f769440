//! Shared, read-only application state handed to every route.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::Config;

// ---

/// Readiness checks for the critical dependencies behind the API.
///
/// Implementations must be cheap; they run on every detailed health and
/// readiness request.
pub trait DependencyProbe: Send + Sync {
    fn database_ready(&self) -> bool;
    fn ai_engine_ready(&self) -> bool;
}

/// Reports every dependency as ready.
///
/// Stands in until the database pool and the AI engine client exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedDependencies;

impl DependencyProbe for SimulatedDependencies {
    fn database_ready(&self) -> bool {
        true
    }

    fn ai_engine_ready(&self) -> bool {
        true
    }
}

/// State shared by all handlers.
///
/// The configuration and startup instant are fixed when the state is built,
/// before the listener accepts traffic.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub started_at: Instant,
    pub dependencies: Arc<dyn DependencyProbe>,
}

impl AppState {
    // ---
    pub fn new(config: Config) -> Self {
        Self::with_dependencies(config, Arc::new(SimulatedDependencies))
    }

    pub fn with_dependencies(config: Config, dependencies: Arc<dyn DependencyProbe>) -> Self {
        Self {
            config: Arc::new(config),
            started_at: Instant::now(),
            dependencies,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
