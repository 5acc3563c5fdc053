//! Application configuration loaded from environment variables.

use std::env;

use quill_core::pagination::DEFAULT_PER_PAGE;
use quill_infra::{JwtConfig, MediaConfig};

#[cfg(feature = "postgres")]
use quill_infra::DatabaseConfig;

#[cfg(feature = "rate-limit")]
use quill_infra::RateLimitConfig;

use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    /// Apply pending schema migrations at startup.
    pub run_migrations: bool,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub posts_per_page: u64,
    #[cfg(feature = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    /// Key the rate limiter on forwarded client addresses (only behind a reverse proxy).
    #[cfg(feature = "rate-limit")]
    pub trust_proxy: bool,
    pub telemetry: TelemetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            #[cfg(feature = "postgres")]
            database: None,
            run_migrations: false,
            jwt: JwtConfig::default(),
            media: MediaConfig::default(),
            posts_per_page: DEFAULT_PER_PAGE,
            #[cfg(feature = "rate-limit")]
            rate_limit: RateLimitConfig::default(),
            #[cfg(feature = "rate-limit")]
            trust_proxy: false,
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        #[cfg(feature = "postgres")]
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS").unwrap_or(20),
            min_connections: parsed("DB_MIN_CONNECTIONS").unwrap_or(2),
        });

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            #[cfg(feature = "postgres")]
            database,
            run_migrations: env::var("RUN_MIGRATIONS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.run_migrations),
            jwt: JwtConfig::from_env(),
            media: MediaConfig::from_env(),
            posts_per_page: parsed("POSTS_PER_PAGE").unwrap_or(defaults.posts_per_page),
            #[cfg(feature = "rate-limit")]
            rate_limit: RateLimitConfig::from_env(),
            #[cfg(feature = "rate-limit")]
            trust_proxy: env::var("TRUST_PROXY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.trust_proxy),
            telemetry: TelemetryConfig::from_env(),
        }
    }

    /// Largest JSON body accepted: a base64 avatar at the size limit plus headroom.
    pub fn json_limit(&self) -> usize {
        self.media.max_avatar_bytes / 3 * 4 + 64 * 1024
    }
}
