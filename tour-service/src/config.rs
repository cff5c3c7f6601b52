//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `TOURS_`, nesting separator `__`,
//!    e.g. `TOURS_SERVICE__PORT=9000`, `TOURS_JWT__SECRET=...`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/tour-service/config.toml
//! 4. System directory: /etc/tour-service/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::handlers::QueryLimits;

const APP_NAME: &str = "tour-service";
const ENV_PREFIX: &str = "TOURS_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// List query bounds
    #[serde(default)]
    pub query: QueryConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Seed data configuration
    #[serde(default)]
    pub data: DataConfig,
}

/// How errors are presented to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Full error detail in responses
    #[default]
    Development,
    /// Only operational error messages reach clients
    Production,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Error presentation mode
    #[serde(default)]
    pub environment: Environment,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: String,

    /// Lifetime of issued tokens in seconds
    #[serde(default = "default_jwt_expires_in")]
    pub expires_in_secs: i64,

    /// Cookie consulted when no bearer token is sent
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// JWT issuer to set and validate
    #[serde(default)]
    pub issuer: Option<String>,
}

/// Page size bounds for list endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl From<QueryConfig> for QueryLimits {
    fn from(config: QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit.max(1),
            max_limit: config.max_limit.max(1),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in KB
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive, or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Header carrying the request id
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_kb: default_body_limit_kb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
            request_id_header: default_request_id_header(),
        }
    }
}

/// Seed data configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON file with `tours`, `users`, `reviews` and `bookings` arrays,
    /// imported at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_jwt_expires_in() -> i64 {
    90 * 24 * 60 * 60
}

fn default_cookie_name() -> String {
    "jwt".to_string()
}

fn default_limit() -> u32 {
    crate::handlers::DEFAULT_LIMIT
}

fn default_max_limit() -> u32 {
    crate::handlers::MAX_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_body_limit_kb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Environment variables (`TOURS_` prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories; environment variables still apply.
    pub fn load_from(path: &str) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Config file paths in priority order (highest first)
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_NAME).join("config.toml"));
        paths
    }

    pub fn is_production(&self) -> bool {
        self.service.environment == Environment::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_NAME.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: Environment::default(),
            },
            jwt: JwtConfig {
                secret: String::new(),
                expires_in_secs: default_jwt_expires_in(),
                cookie_name: default_cookie_name(),
                issuer: None,
            },
            query: QueryConfig::default(),
            middleware: MiddlewareConfig::default(),
            data: DataConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.environment, Environment::Development);
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.query.max_limit, 1000);
        assert_eq!(config.jwt.cookie_name, "jwt");
        assert!(!config.is_production());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "tours-test"
port = 9001
environment = "production"

[jwt]
secret = "file-secret"

[query]
max_limit = 50
"#
        )
        .unwrap();

        let config = Config::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.service.name, "tours-test");
        assert_eq!(config.service.port, 9001);
        assert!(config.is_production());
        assert_eq!(config.jwt.secret, "file-secret");
        assert_eq!(config.query.max_limit, 50);
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.middleware.body_limit_kb, 10);
    }

    #[test]
    fn test_query_limits_conversion_never_zero() {
        let limits: QueryLimits = QueryConfig {
            default_limit: 0,
            max_limit: 0,
        }
        .into();
        assert_eq!(limits.default_limit, 1);
        assert_eq!(limits.max_limit, 1);
    }
}
