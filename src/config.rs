//! Configuration loader for the NovaCRM backend service.
//!
//! This module centralizes all runtime configuration values and their defaults.
//! Values are merged from three layers, highest precedence first:
//!
//! 1. ambient process environment variables
//! 2. the optional `.env` file in the working directory
//! 3. the compiled defaults below
//!
//! Keys are case-insensitive and unrecognized keys are ignored. Construction
//! runs in two phases: every field is parsed and checked against its own
//! constraint first, then rules spanning several fields (secret key versus
//! environment) run against the already-validated record. Any violation fails
//! the whole construction; nothing is clamped.
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Conventional name of the environment file read at startup.
pub const ENV_FILE: &str = ".env";

/// Secret key shipped as the development default. Never valid in production.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-me-in-production";

const DEV_SECRET_MARKER: &str = "dev-secret-key";
const MIN_SECRET_KEY_LEN: usize = 32;

const ASYNC_PG_SCHEME: &str = "postgresql+asyncpg";
const SYNC_PG_SCHEME: &str = "postgresql";

// ---

/// Errors raised while building the [`Config`].
///
/// Every variant except [`ConfigError::EnvFile`] is a validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{key} must be {bound}, got {value}")]
    OutOfRange {
        key: &'static str,
        bound: String,
        value: i64,
    },

    #[error("SECRET_KEY must contain at least {min} characters, got {len}")]
    SecretKeyTooShort { len: usize, min: usize },

    #[error(
        "default development SECRET_KEY detected in production; generate a random key of at least 32 characters"
    )]
    InsecureSecretKey,
}

impl ConfigError {
    /// True for every error caused by a field or cross-field rule, as opposed
    /// to an unreadable environment file.
    pub fn is_validation(&self) -> bool {
        !matches!(self, ConfigError::EnvFile { .. })
    }
}

/// Declare a closed set of configuration values parsed from exact strings.
macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "expected one of [{}], got {:?}",
                        [$($text),+].join(", "),
                        other
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

config_enum! {
    /// Runtime environment the process is deployed into.
    Environment {
        Development => "development",
        Staging => "staging",
        Production => "production",
        Testing => "testing",
    }
}

config_enum! {
    /// Risk category under the EU AI Act.
    AiActRiskLevel {
        Unacceptable => "unacceptable",
        High => "high",
        Limited => "limited",
        Minimal => "minimal",
    }
}

config_enum! {
    LogLevel {
        Debug => "DEBUG",
        Info => "INFO",
        Warning => "WARNING",
        Error => "ERROR",
        Critical => "CRITICAL",
    }
}

config_enum! {
    LogFormat {
        Json => "json",
        Text => "text",
    }
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

// ---

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    pub environment: Environment,
    /// Debug mode; must be disabled in production deployments.
    pub debug: bool,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub cors: CorsConfig,
    pub ai_engine: AiEngineConfig,
    pub compliance: ComplianceConfig,
    pub logging: LoggingConfig,
    pub testing: TestingConfig,
    pub performance: PerformanceConfig,
    pub docs: DocsConfig,
    pub app: AppMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Auto-reload requested by the developer tooling; informational only.
    pub reload: bool,
    /// Number of runtime worker threads.
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_overflow: u32,
    /// Log every SQL statement.
    pub echo: bool,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub secret_key: String,
    /// Token signing algorithm, e.g. `HS256`.
    pub algorithm: String,
    pub access_token_expire_minutes: u32,
    pub refresh_token_expire_days: u32,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("secret_key", &"****")
            .field("algorithm", &self.algorithm)
            .field(
                "access_token_expire_minutes",
                &self.access_token_expire_minutes,
            )
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub origins: Vec<String>,
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AiEngineConfig {
    pub url: String,
    pub path: String,
    pub timeout_secs: u64,
    pub enabled: bool,
}

/// PII/secret detection, audit trail and regulatory toggles.
#[derive(Debug, Clone)]
pub struct ComplianceConfig {
    pub pii_detection: bool,
    pub pii_mask_char: String,
    pub pii_detection_patterns: Vec<String>,
    pub secret_detection: bool,
    pub secret_detection_patterns: Vec<String>,
    pub audit_trail: bool,
    pub audit_log_path: String,
    pub audit_retention_days: u32,
    pub gdpr_enabled: bool,
    pub gdpr_data_retention_days: u32,
    pub gdpr_right_to_erasure: bool,
    pub ia_act_enabled: bool,
    pub ia_act_risk_level: AiActRiskLevel,
    pub iso27001_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub path: String,
    pub file_max_bytes: u64,
    pub file_backup_count: u32,
    pub to_console: bool,
    pub to_file: bool,
}

#[derive(Debug, Clone)]
pub struct TestingConfig {
    pub database_url: String,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub enable_cache: bool,
    pub redis_url: String,
    pub cache_ttl_secs: u64,
    pub enable_rate_limiting: bool,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone)]
pub struct DocsConfig {
    pub enable_swagger: bool,
    pub enable_redoc: bool,
    pub enable_openapi: bool,
    pub docs_url: String,
    pub redoc_url: String,
}

#[derive(Debug, Clone)]
pub struct AppMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub api_prefix: String,
    pub contact_email: String,
}

// ---

/// Parse an integer key, enforce `min..=max`, and convert into the field type.
macro_rules! bounded_env {
    ($raw:expr, $key:expr, $default:expr, $min:expr) => {
        bounded_env!($raw, $key, $default, $min, i64::MAX)
    };
    ($raw:expr, $key:expr, $default:expr, $min:expr, $max:expr) => {
        $raw.integer($key, $default, $min, $max)?
            .try_into()
            .map_err(|e: std::num::TryFromIntError| ConfigError::Invalid {
                key: $key,
                reason: e.to_string(),
            })?
    };
}

/// Merged key/value view over the `.env` file and the process environment.
#[derive(Debug, Default)]
struct RawSettings {
    values: HashMap<String, String>,
}

impl RawSettings {
    // ---
    fn merge<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.values.insert(key.to_ascii_lowercase(), value);
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                reason: format!("expected a boolean, got {raw:?}"),
            }),
        }
    }

    fn integer(
        &self,
        key: &'static str,
        default: i64,
        min: i64,
        max: i64,
    ) -> Result<i64, ConfigError> {
        let value = match self.get(key) {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("{e} ({raw:?})"),
            })?,
            None => default,
        };

        if value < min || value > max {
            let bound = if max == i64::MAX {
                format!(">= {min}")
            } else {
                format!("between {min} and {max}")
            };
            return Err(ConfigError::OutOfRange { key, bound, value });
        }
        Ok(value)
    }

    fn choice<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr<Err = String>,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|reason| ConfigError::Invalid { key, reason }),
            None => Ok(default),
        }
    }

    /// List-valued keys are JSON arrays of strings.
    fn list(&self, key: &'static str, default: &[&str]) -> Result<Vec<String>, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default.iter().map(|s| s.to_string()).collect());
        };
        serde_json::from_str::<Vec<String>>(raw).map_err(|e| ConfigError::Invalid {
            key,
            reason: format!("expected a JSON array of strings: {e}"),
        })
    }
}

// ---

/// Load configuration from `.env` and the process environment.
///
/// A missing `.env` file is not an error. Returns a [`ConfigError`] if the
/// file cannot be parsed or any value violates its constraint.
pub fn load_from_env() -> Result<Config, ConfigError> {
    // ---
    // Non UTF-8 variables cannot name a recognized key, skip them
    let vars = env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
    load_from_sources(Some(Path::new(ENV_FILE)), vars)
}

/// Build a [`Config`] from an optional environment file and an explicit set
/// of variables. `vars` take precedence over the file, and the file over the
/// compiled defaults.
pub fn load_from_sources<I>(env_file: Option<&Path>, vars: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    // ---
    let mut raw = RawSettings::default();
    if let Some(path) = env_file {
        raw.merge(read_env_file(path)?);
    }
    raw.merge(vars);

    let config = Config::from_raw(&raw)?;
    config.check_cross_field_rules()?;
    Ok(config)
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    // ---
    let env_file_error = |source| ConfigError::EnvFile {
        path: path.display().to_string(),
        source,
    };

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(env_file_error(e)),
    };
    iter.collect::<Result<Vec<_>, _>>().map_err(env_file_error)
}

/// Normalize the allowed CORS origins into an ordered list of strings.
///
/// Strings are parsed as JSON first: an array is used as-is and any other JSON
/// value becomes a one-element list. A string that is not JSON is taken as a
/// single literal origin. An array is passed through unchanged and every other
/// value is wrapped using its string form.
pub fn normalize_cors_origins(raw: &Value) -> Result<Vec<String>, ConfigError> {
    // ---
    match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => origin_strings(&items),
            Ok(scalar) => Ok(vec![value_as_text(&scalar)]),
            Err(_) => Ok(vec![text.clone()]),
        },
        Value::Array(items) => origin_strings(items),
        other => Ok(vec![value_as_text(other)]),
    }
}

fn origin_strings(items: &[Value]) -> Result<Vec<String>, ConfigError> {
    items
        .iter()
        .map(|item| match item {
            Value::String(origin) => Ok(origin.clone()),
            other => Err(ConfigError::Invalid {
                key: "CORS_ORIGINS",
                reason: format!("origins must be strings, got {other}"),
            }),
        })
        .collect()
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace the userinfo portion of a connection URL with `****`.
fn redact_credentials(url: &str) -> String {
    // ---
    // Passwords may contain '/', so only the query or fragment ends the search
    let authority_start = url.find("://").map_or(0, |pos| pos + 3);
    let before_query = url[authority_start..]
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    match before_query.rfind('@') {
        Some(at_pos) => format!(
            "{}****{}",
            &url[..authority_start],
            &url[authority_start + at_pos..]
        ),
        None => url.to_string(),
    }
}

// ---

impl Config {
    /// Phase one: parse every key and enforce its own constraint.
    fn from_raw(raw: &RawSettings) -> Result<Self, ConfigError> {
        // ---
        let environment = raw.choice("ENVIRONMENT", Environment::Development)?;

        let server = ServerConfig {
            host: raw.string("HOST", "0.0.0.0"),
            port: bounded_env!(raw, "PORT", 8000, 1, 65535),
            reload: raw.flag("RELOAD", true)?,
            workers: bounded_env!(raw, "WORKERS", 1, 1),
        };

        let database = DatabaseConfig {
            url: raw.string("DATABASE_URL", "sqlite:///./nova_crm.db"),
            pool_size: bounded_env!(raw, "DATABASE_POOL_SIZE", 5, 1),
            max_overflow: bounded_env!(raw, "DATABASE_MAX_OVERFLOW", 10, 0),
            echo: raw.flag("DATABASE_ECHO", false)?,
        };

        let secret_key = raw.string("SECRET_KEY", DEV_SECRET_KEY);
        let len = secret_key.chars().count();
        if len < MIN_SECRET_KEY_LEN {
            return Err(ConfigError::SecretKeyTooShort {
                len,
                min: MIN_SECRET_KEY_LEN,
            });
        }
        let security = SecurityConfig {
            secret_key,
            algorithm: raw.string("ALGORITHM", "HS256"),
            access_token_expire_minutes: bounded_env!(raw, "ACCESS_TOKEN_EXPIRE_MINUTES", 30, 1),
            refresh_token_expire_days: bounded_env!(raw, "REFRESH_TOKEN_EXPIRE_DAYS", 7, 1),
        };

        let origins = match raw.get("CORS_ORIGINS") {
            Some(text) => normalize_cors_origins(&Value::String(text.to_string()))?,
            None => vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        };
        let cors = CorsConfig {
            origins,
            allow_credentials: raw.flag("CORS_ALLOW_CREDENTIALS", true)?,
            allow_methods: raw.list(
                "CORS_ALLOW_METHODS",
                &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"],
            )?,
            allow_headers: raw.list("CORS_ALLOW_HEADERS", &["*"])?,
        };

        let ai_engine = AiEngineConfig {
            url: raw.string("AI_ENGINE_URL", "http://localhost:8001"),
            path: raw.string("AI_ENGINE_PATH", "../ai"),
            timeout_secs: bounded_env!(raw, "AI_ENGINE_TIMEOUT", 30, 1),
            enabled: raw.flag("ENABLE_AI_ENGINE", true)?,
        };

        let pii_mask_char = raw.string("PII_MASK_CHAR", "*");
        if pii_mask_char.chars().count() > 1 {
            return Err(ConfigError::Invalid {
                key: "PII_MASK_CHAR",
                reason: format!("must be at most one character, got {pii_mask_char:?}"),
            });
        }
        let compliance = ComplianceConfig {
            pii_detection: raw.flag("ENABLE_PII_DETECTION", true)?,
            pii_mask_char,
            pii_detection_patterns: raw.list(
                "PII_DETECTION_PATTERNS",
                &["email", "phone", "ssn", "credit_card", "iban"],
            )?,
            secret_detection: raw.flag("ENABLE_SECRET_DETECTION", true)?,
            secret_detection_patterns: raw.list(
                "SECRET_DETECTION_PATTERNS",
                &["api_key", "token", "password", "secret"],
            )?,
            audit_trail: raw.flag("ENABLE_AUDIT_TRAIL", true)?,
            audit_log_path: raw.string("AUDIT_LOG_PATH", "./logs/audit"),
            audit_retention_days: bounded_env!(raw, "AUDIT_RETENTION_DAYS", 90, 1),
            gdpr_enabled: raw.flag("GDPR_ENABLED", true)?,
            gdpr_data_retention_days: bounded_env!(raw, "GDPR_DATA_RETENTION_DAYS", 365, 1),
            gdpr_right_to_erasure: raw.flag("GDPR_RIGHT_TO_ERASURE", true)?,
            ia_act_enabled: raw.flag("IA_ACT_ENABLED", true)?,
            ia_act_risk_level: raw.choice("IA_ACT_RISK_LEVEL", AiActRiskLevel::Limited)?,
            iso27001_enabled: raw.flag("ISO27001_ENABLED", false)?,
        };

        let logging = LoggingConfig {
            level: raw.choice("LOG_LEVEL", LogLevel::Info)?,
            format: raw.choice("LOG_FORMAT", LogFormat::Json)?,
            path: raw.string("LOG_PATH", "./logs"),
            file_max_bytes: bounded_env!(raw, "LOG_FILE_MAX_BYTES", 10_485_760, 1024),
            file_backup_count: bounded_env!(raw, "LOG_FILE_BACKUP_COUNT", 5, 0),
            to_console: raw.flag("LOG_TO_CONSOLE", true)?,
            to_file: raw.flag("LOG_TO_FILE", true)?,
        };

        let testing = TestingConfig {
            database_url: raw.string("TEST_DATABASE_URL", "sqlite:///./test_nova_crm.db"),
            log_level: raw.choice("TEST_LOG_LEVEL", LogLevel::Warning)?,
        };

        let performance = PerformanceConfig {
            enable_cache: raw.flag("ENABLE_CACHE", false)?,
            redis_url: raw.string("REDIS_URL", "redis://localhost:6379/0"),
            cache_ttl_secs: bounded_env!(raw, "CACHE_TTL", 300, 1),
            enable_rate_limiting: raw.flag("ENABLE_RATE_LIMITING", false)?,
            rate_limit_per_minute: bounded_env!(raw, "RATE_LIMIT_PER_MINUTE", 60, 1),
        };

        let docs = DocsConfig {
            enable_swagger: raw.flag("ENABLE_SWAGGER", true)?,
            enable_redoc: raw.flag("ENABLE_REDOC", true)?,
            enable_openapi: raw.flag("ENABLE_OPENAPI", true)?,
            docs_url: raw.string("API_DOCS_URL", "/docs"),
            redoc_url: raw.string("API_REDOC_URL", "/redoc"),
        };

        let app = AppMetadata {
            name: raw.string("APP_NAME", "NovaCRM"),
            version: raw.string("APP_VERSION", env!("CARGO_PKG_VERSION")),
            description: raw.string(
                "APP_DESCRIPTION",
                "CRM moderne avec moteur IA de conformité",
            ),
            api_prefix: raw.string("API_PREFIX", "/api/v1"),
            contact_email: raw.string("CONTACT_EMAIL", "admin@novacrm.local"),
        };

        Ok(Config {
            environment,
            debug: raw.flag("DEBUG", true)?,
            server,
            database,
            security,
            cors,
            ai_engine,
            compliance,
            logging,
            testing,
            performance,
            docs,
            app,
        })
    }

    /// Phase two: rules that depend on more than one validated field.
    fn check_cross_field_rules(&self) -> Result<(), ConfigError> {
        // ---
        if self.is_production() && self.security.secret_key.contains(DEV_SECRET_MARKER) {
            return Err(ConfigError::InsecureSecretKey);
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn is_testing(&self) -> bool {
        self.environment == Environment::Testing
    }

    /// Database connection string.
    ///
    /// Schema-migration tools do not understand the async `postgresql+asyncpg`
    /// driver scheme; with `for_migration_tool` set it is rewritten to plain
    /// `postgresql`. No other rewriting happens.
    pub fn database_url(&self, for_migration_tool: bool) -> String {
        // ---
        if for_migration_tool && self.database.url.contains(ASYNC_PG_SCHEME) {
            self.database.url.replace(ASYNC_PG_SCHEME, SYNC_PG_SCHEME)
        } else {
            self.database.url.clone()
        }
    }

    /// Database URL safe to print: credentials replaced by `****`.
    pub fn redacted_database_url(&self) -> String {
        redact_credentials(&self.database.url)
    }

    /// Non-fatal findings about the loaded configuration.
    pub fn warnings(&self) -> Vec<String> {
        // ---
        let mut warnings = Vec::new();
        if self.is_production() && self.database.url.starts_with("sqlite") {
            warnings.push(
                "SQLite database configured in production; PostgreSQL is recommended".to_string(),
            );
        }
        if self.is_production() && self.debug {
            warnings.push("DEBUG is enabled in production".to_string());
        }
        warnings
    }

    /// Log the loaded configuration for diagnostic purposes.
    ///
    /// Database credentials and the secret key are never emitted.
    pub fn log_config(&self) {
        // ---
        let toggle = |enabled: bool| if enabled { "Enabled" } else { "Disabled" };

        tracing::info!("{} - Configuration loaded:", self.app.name);
        tracing::info!("  Environment     : {}", self.environment);
        tracing::info!("  Debug Mode      : {}", self.debug);
        tracing::info!("  Host:Port       : {}:{}", self.server.host, self.server.port);
        tracing::info!("  Workers         : {}", self.server.workers);
        tracing::info!("  Database        : {}", self.redacted_database_url());
        tracing::info!("  CORS Origins    : {:?}", self.cors.origins);
        tracing::info!("  AI Engine       : {}", toggle(self.ai_engine.enabled));
        tracing::info!("  PII Detection   : {}", toggle(self.compliance.pii_detection));
        tracing::info!("  GDPR Compliance : {}", toggle(self.compliance.gdpr_enabled));
        tracing::info!(
            "  IA Act          : {} (Risk: {})",
            toggle(self.compliance.ia_act_enabled),
            self.compliance.ia_act_risk_level
        );
        tracing::info!("  Log Level       : {}", self.logging.level);
        if self.docs.enable_swagger {
            tracing::info!("  Swagger UI      : {}", self.docs.docs_url);
        } else {
            tracing::info!("  Swagger UI      : Disabled");
        }

        for warning in self.warnings() {
            tracing::warn!("{warning}");
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const STRONG_KEY: &str = "k3y-for-unit-tests-0123456789abcdef";

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        load_from_sources(None, vars(pairs))
    }

    #[test]
    fn test_defaults() {
        // ---
        let cfg = load(&[]).unwrap();

        assert_eq!(cfg.environment, Environment::Development);
        assert!(cfg.debug);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.workers, 1);
        assert_eq!(cfg.database.url, "sqlite:///./nova_crm.db");
        assert_eq!(cfg.database.pool_size, 5);
        assert_eq!(cfg.database.max_overflow, 10);
        assert_eq!(cfg.security.secret_key, DEV_SECRET_KEY);
        assert_eq!(cfg.security.algorithm, "HS256");
        assert_eq!(
            cfg.cors.origins,
            vec!["http://localhost:3000", "http://localhost:8000"]
        );
        assert_eq!(cfg.cors.allow_headers, vec!["*"]);
        assert_eq!(cfg.compliance.ia_act_risk_level, AiActRiskLevel::Limited);
        assert_eq!(cfg.logging.level, LogLevel::Info);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.app.version, "1.0.0");
        assert_eq!(cfg.app.api_prefix, "/api/v1");
    }

    #[test]
    fn test_short_secret_key_rejected() {
        // ---
        let err = load(&[("SECRET_KEY", "too-short")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SecretKeyTooShort { len: 9, min: 32 }
        ));
        assert!(err.is_validation());

        // Exactly 32 characters is accepted
        let key = "a".repeat(32);
        assert!(load(&[("SECRET_KEY", &key)]).is_ok());
    }

    #[test]
    fn test_dev_secret_rejected_in_production() {
        // ---
        let err = load(&[("ENVIRONMENT", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecretKey));

        // Any key containing the marker is rejected, whatever else is set
        let err = load(&[
            ("ENVIRONMENT", "production"),
            ("SECRET_KEY", "prefix-dev-secret-key-with-more-than-32-chars"),
            ("PORT", "9000"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecretKey));

        let cfg = load(&[("ENVIRONMENT", "production"), ("SECRET_KEY", STRONG_KEY)]).unwrap();
        assert!(cfg.is_production());
    }

    #[test]
    fn test_dev_secret_accepted_outside_production() {
        // ---
        for env in ["development", "staging", "testing"] {
            let cfg = load(&[("ENVIRONMENT", env), ("SECRET_KEY", DEV_SECRET_KEY)]).unwrap();
            assert_eq!(cfg.environment.as_str(), env);
        }
    }

    #[test]
    fn test_environment_predicates() {
        // ---
        let dev = load(&[]).unwrap();
        assert!(dev.is_development() && !dev.is_production() && !dev.is_testing());

        let testing = load(&[("ENVIRONMENT", "testing")]).unwrap();
        assert!(testing.is_testing() && !testing.is_development());

        let staging = load(&[("ENVIRONMENT", "staging")]).unwrap();
        assert!(!staging.is_development() && !staging.is_production() && !staging.is_testing());
    }

    #[test]
    fn test_unknown_environment_rejected() {
        // ---
        let err = load(&[("ENVIRONMENT", "qa")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ENVIRONMENT", .. }));
    }

    #[test]
    fn test_keys_are_case_insensitive_and_unknown_keys_ignored() {
        // ---
        let cfg = load(&[
            ("port", "9001"),
            ("Database_Pool_Size", "12"),
            ("SOMETHING_UNRELATED", "whatever"),
        ])
        .unwrap();
        assert_eq!(cfg.server.port, 9001);
        assert_eq!(cfg.database.pool_size, 12);
    }

    #[test]
    fn test_numeric_bounds_enforced() {
        // ---
        let cases = [
            ("PORT", "0"),
            ("PORT", "65536"),
            ("WORKERS", "0"),
            ("DATABASE_POOL_SIZE", "0"),
            ("DATABASE_MAX_OVERFLOW", "-1"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "0"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "0"),
            ("AUDIT_RETENTION_DAYS", "0"),
            ("GDPR_DATA_RETENTION_DAYS", "0"),
            ("LOG_FILE_MAX_BYTES", "1023"),
        ];
        for (key, value) in cases {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::OutOfRange { .. }),
                "{key}={value} should be out of range, got {err:?}"
            );
        }

        let cfg = load(&[("PORT", "65535"), ("DATABASE_MAX_OVERFLOW", "0")]).unwrap();
        assert_eq!(cfg.server.port, 65535);
        assert_eq!(cfg.database.max_overflow, 0);
    }

    #[test]
    fn test_malformed_values_rejected() {
        // ---
        assert!(matches!(
            load(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::Invalid { key: "PORT", .. }
        ));
        assert!(matches!(
            load(&[("DEBUG", "maybe")]).unwrap_err(),
            ConfigError::Invalid { key: "DEBUG", .. }
        ));
        assert!(matches!(
            load(&[("IA_ACT_RISK_LEVEL", "extreme")]).unwrap_err(),
            ConfigError::Invalid { key: "IA_ACT_RISK_LEVEL", .. }
        ));
        assert!(matches!(
            load(&[("PII_MASK_CHAR", "##")]).unwrap_err(),
            ConfigError::Invalid { key: "PII_MASK_CHAR", .. }
        ));
        assert!(matches!(
            load(&[("CORS_ALLOW_METHODS", "GET,POST")]).unwrap_err(),
            ConfigError::Invalid { key: "CORS_ALLOW_METHODS", .. }
        ));
    }

    #[test]
    fn test_boolean_spellings() {
        // ---
        let cfg = load(&[("DEBUG", "off"), ("DATABASE_ECHO", "Yes"), ("RELOAD", "0")]).unwrap();
        assert!(!cfg.debug);
        assert!(cfg.database.echo);
        assert!(!cfg.server.reload);
    }

    #[test]
    fn test_normalize_cors_origins() {
        // ---
        let list = normalize_cors_origins(&json!(r#"["http://a","http://b"]"#)).unwrap();
        assert_eq!(list, vec!["http://a", "http://b"]);

        let bare = normalize_cors_origins(&json!("http://a")).unwrap();
        assert_eq!(bare, vec!["http://a"]);

        let already = normalize_cors_origins(&json!(["http://b", "http://a"])).unwrap();
        assert_eq!(already, vec!["http://b", "http://a"]);

        // JSON scalar inside a string is wrapped
        let quoted = normalize_cors_origins(&json!(r#""http://c""#)).unwrap();
        assert_eq!(quoted, vec!["http://c"]);

        // Anything else is coerced through its string form
        let number = normalize_cors_origins(&json!(8080)).unwrap();
        assert_eq!(number, vec!["8080"]);

        assert!(normalize_cors_origins(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_cors_origins_from_environment() {
        // ---
        let cfg = load(&[("CORS_ORIGINS", r#"["https://app.novacrm.io","http://localhost:3000"]"#)])
            .unwrap();
        assert_eq!(
            cfg.cors.origins,
            vec!["https://app.novacrm.io", "http://localhost:3000"]
        );

        let cfg = load(&[("CORS_ORIGINS", "https://app.novacrm.io")]).unwrap();
        assert_eq!(cfg.cors.origins, vec!["https://app.novacrm.io"]);
    }

    #[test]
    fn test_database_url_for_migration_tool() {
        // ---
        let cfg = load(&[("DATABASE_URL", "postgresql+asyncpg://u:p@h/db")]).unwrap();
        assert_eq!(cfg.database_url(true), "postgresql://u:p@h/db");
        assert_eq!(cfg.database_url(false), "postgresql+asyncpg://u:p@h/db");

        let cfg = load(&[("DATABASE_URL", "postgresql://u:p@h/db")]).unwrap();
        assert_eq!(cfg.database_url(true), "postgresql://u:p@h/db");

        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.database_url(true), "sqlite:///./nova_crm.db");
    }

    #[test]
    fn test_redacted_database_url() {
        // ---
        assert_eq!(
            redact_credentials("postgresql+asyncpg://nova:s3cr@t@db.internal:5432/crm"),
            "postgresql+asyncpg://****@db.internal:5432/crm"
        );
        assert_eq!(
            redact_credentials("sqlite:///./nova_crm.db"),
            "sqlite:///./nova_crm.db"
        );
        assert_eq!(
            redact_credentials("postgresql://nova:pa/ss@db.internal:5432/crm"),
            "postgresql://****@db.internal:5432/crm"
        );
        assert_eq!(
            redact_credentials("postgresql://db.internal/crm?owner=a@b"),
            "postgresql://db.internal/crm?owner=a@b"
        );
    }

    #[test]
    fn test_secret_key_not_in_debug_output() {
        // ---
        let cfg = load(&[("SECRET_KEY", STRONG_KEY)]).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains(STRONG_KEY));
    }

    #[test]
    fn test_sqlite_in_production_warns() {
        // ---
        let cfg = load(&[
            ("ENVIRONMENT", "production"),
            ("SECRET_KEY", STRONG_KEY),
            ("DEBUG", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.warnings().len(), 1);

        let cfg = load(&[
            ("ENVIRONMENT", "production"),
            ("SECRET_KEY", STRONG_KEY),
            ("DEBUG", "false"),
            ("DATABASE_URL", "postgresql://u:p@h/db"),
        ])
        .unwrap();
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn test_debug_in_production_warns() {
        // ---
        let cfg = load(&[("ENVIRONMENT", "production"), ("SECRET_KEY", STRONG_KEY)]).unwrap();
        let warnings = cfg.warnings();

        // SQLite default plus DEBUG defaulting to true
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("DEBUG")));

        let cfg = load(&[("SECRET_KEY", STRONG_KEY)]).unwrap();
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn test_redacted_url_in_loaded_config() {
        // ---
        let url = "postgresql://nova:pa/ss@db.internal:5432/crm";
        let cfg = load(&[("DATABASE_URL", url)]).unwrap();
        let shown = cfg.redacted_database_url();
        assert!(!shown.contains("pa/ss"));
        assert!(!shown.contains("nova"));
    }

    #[test]
    fn test_env_file_precedence() {
        // ---
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PORT=9100").unwrap();
        writeln!(file, "APP_NAME=NovaCRM-Staging").unwrap();
        writeln!(file, "ENVIRONMENT=staging").unwrap();

        let cfg = load_from_sources(Some(file.path()), vars(&[("PORT", "9200")])).unwrap();

        // Process environment beats the file, the file beats defaults
        assert_eq!(cfg.server.port, 9200);
        assert_eq!(cfg.app.name, "NovaCRM-Staging");
        assert_eq!(cfg.environment, Environment::Staging);
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_sources(Some(&dir.path().join(".env")), vars(&[])).unwrap();
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn test_malformed_env_file_rejected() {
        // ---
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SECRET_KEY=\"abc").unwrap();

        let err = load_from_sources(Some(file.path()), vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_env_file_validation_applies() {
        // ---
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SECRET_KEY=short").unwrap();

        let err = load_from_sources(Some(file.path()), vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::SecretKeyTooShort { .. }));
    }
}
