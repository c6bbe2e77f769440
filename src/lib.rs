//! NovaCRM backend service.
//!
//! Hosts the HTTP surface of the CRM and, eventually, its AI compliance
//! engine (PII and secret detection, GDPR and AI Act auditing). Today it
//! serves the root and health endpoints on top of a validated configuration
//! record.
//!
//! Module boundaries follow the Explicit Module Boundary Pattern (EMBP):
//! - `config`: environment driven settings and their validation
//! - `models`: pure domain values
//! - `state`: shared read-only state and dependency probes
//! - `routes`: HTTP handlers behind a single gateway router
//! - `app`: middleware, CORS, lifecycle hooks and the serve loop

pub mod app;
pub mod config;
pub mod models;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};

// Re-exported so routes/*.rs depend only on the crate root, not on the
// modules that define these types.
pub use models::{HealthStatus, Status};
pub use state::{AppState, DependencyProbe, SimulatedDependencies};
