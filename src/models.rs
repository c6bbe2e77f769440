//! Domain values for the NovaCRM backend.
//!
//! Pure data with no HTTP or database dependencies; the routes translate
//! these into response bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

// ---

/// Overall state reported by a health evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Healthy => "healthy",
            Status::Degraded => "degraded",
            Status::Unhealthy => "unhealthy",
        }
    }
}

/// One evaluation of system health.
///
/// Built fresh for every health check and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    // ---
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    /// Application version, copied from the configuration metadata.
    pub version: String,
}

impl HealthStatus {
    // ---
    pub fn new(status: Status, timestamp: DateTime<Utc>, version: impl Into<String>) -> Self {
        Self {
            status,
            timestamp,
            version: version.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == Status::Healthy
    }

    /// ISO-8601 (RFC 3339) rendering of the evaluation time, microsecond precision.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Project into a `status` / `timestamp` / `version` mapping.
    pub fn to_projection(&self) -> Map<String, Value> {
        // ---
        let mut projection = Map::new();
        projection.insert("status".into(), Value::from(self.status.as_str()));
        projection.insert("timestamp".into(), Value::from(self.timestamp_iso()));
        projection.insert("version".into(), Value::from(self.version.as_str()));
        projection
    }
}
