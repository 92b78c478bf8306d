//! Configuration management for topic-sync-api.
//!
//! Loads configuration from environment variables with fail-fast validation.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;
use topic_sync::roster::ID_PLACEHOLDER;
use topic_sync::store::TopicLink;

/// Shortest accepted HS256 secret, in bytes.
pub const MIN_AUTH_SECRET_LEN: usize = 32;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),
}

impl ConfigError {
    fn invalid(var: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

/// Where topic links and reference endpoints are read from.
#[derive(Debug, Clone)]
pub enum LinkSource {
    /// `TOPIC_LINKS` and `REFERENCE_ENDPOINTS` from the environment.
    Static {
        links: Vec<TopicLink>,
        endpoints: HashMap<String, String>,
    },
    /// The `topics` and `reference_lookups` tables.
    #[cfg(feature = "postgres")]
    Database { url: String },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the forum
    pub forum_base_url: String,

    /// Forum API key sent as `Api-Key`
    pub forum_api_key: String,

    /// Account the API key acts as (default: "system")
    pub forum_api_username: String,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout: Duration,

    /// Upper bound on concurrent grant/revoke calls per topic
    pub mutation_concurrency: usize,

    pub link_source: LinkSource,

    /// HS256 secret used to verify caller tokens
    pub auth_secret: String,

    /// Expected `iss` claim, if any
    pub auth_issuer: Option<String>,

    /// Log level filter (RUST_LOG)
    pub rust_log: String,

    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("forum_base_url", &self.forum_base_url)
            .field("forum_api_key", &"[redacted]")
            .field("forum_api_username", &self.forum_api_username)
            .field("request_timeout", &self.request_timeout)
            .field("mutation_concurrency", &self.mutation_concurrency)
            .field("auth_secret", &"[redacted]")
            .field("auth_issuer", &self.auth_issuer)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required variables are missing
    /// - Values are invalid (e.g., a template without `{id}`, port 0)
    ///
    /// # Required Variables
    ///
    /// - `FORUM_BASE_URL` - Forum base URL
    /// - `FORUM_API_KEY` - Forum API key
    /// - `AUTH_SECRET` - HS256 token secret (at least 32 bytes)
    /// - `REFERENCE_ENDPOINTS` - JSON object of reference type to roster URL
    ///   template, unless `DATABASE_URL` is used
    ///
    /// # Optional Variables
    ///
    /// - `FORUM_API_USERNAME` - Acting forum account (default: "system")
    /// - `REQUEST_TIMEOUT_SECS` - Outbound request timeout (default: 30)
    /// - `MUTATION_CONCURRENCY` - Concurrent access changes per topic (default: 8)
    /// - `TOPIC_LINKS` - JSON array of `{reference, referenceId, topicId}` (default: [])
    /// - `DATABASE_URL` - PostgreSQL connection string (feature `postgres`)
    /// - `AUTH_ISSUER` - Expected token issuer
    /// - `RUST_LOG` - Log level filter (default: "info")
    /// - `HOST` - Bind address (default: "0.0.0.0")
    /// - `PORT` - Listen port (default: 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        let forum_base_url = required("FORUM_BASE_URL")?;
        if !forum_base_url.starts_with("http://") && !forum_base_url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "FORUM_BASE_URL",
                "must start with http:// or https://",
            ));
        }

        let forum_api_key = required("FORUM_API_KEY")?;
        let forum_api_username = var("FORUM_API_USERNAME")
            .unwrap_or_else(|| topic_sync::SYSTEM_USERNAME.to_string());

        let timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()?;
        if timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "REQUEST_TIMEOUT_SECS",
                "must be at least 1",
            ));
        }

        let mutation_concurrency: usize = var("MUTATION_CONCURRENCY")
            .unwrap_or_else(|| "8".to_string())
            .parse()?;
        if mutation_concurrency == 0 {
            return Err(ConfigError::invalid(
                "MUTATION_CONCURRENCY",
                "must be at least 1",
            ));
        }

        let link_source = Self::link_source(&var)?;

        let auth_secret = required("AUTH_SECRET")?;
        if auth_secret.len() < MIN_AUTH_SECRET_LEN {
            return Err(ConfigError::invalid(
                "AUTH_SECRET",
                format!("must be at least {MIN_AUTH_SECRET_LEN} bytes"),
            ));
        }
        let auth_issuer = var("AUTH_ISSUER").filter(|s| !s.is_empty());

        let rust_log = var("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "3000".to_string()).parse()?;
        if port == 0 {
            return Err(ConfigError::invalid(
                "PORT",
                "Port must be between 1 and 65535",
            ));
        }

        Ok(Self {
            forum_base_url,
            forum_api_key,
            forum_api_username,
            request_timeout: Duration::from_secs(timeout_secs),
            mutation_concurrency,
            link_source,
            auth_secret,
            auth_issuer,
            rust_log,
            host,
            port,
        })
    }

    fn link_source<F>(var: &F) -> Result<LinkSource, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(source) = database_source(var) {
            return Ok(source);
        }

        let endpoints: HashMap<String, String> = match var("REFERENCE_ENDPOINTS") {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| ConfigError::invalid("REFERENCE_ENDPOINTS", e.to_string()))?,
            None => return Err(ConfigError::MissingVar("REFERENCE_ENDPOINTS".to_string())),
        };
        if let Some((reference, _)) = endpoints
            .iter()
            .find(|(_, template)| !template.contains(ID_PLACEHOLDER))
        {
            return Err(ConfigError::invalid(
                "REFERENCE_ENDPOINTS",
                format!("template for '{reference}' has no {ID_PLACEHOLDER} placeholder"),
            ));
        }

        let links: Vec<TopicLink> = match var("TOPIC_LINKS") {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| ConfigError::invalid("TOPIC_LINKS", e.to_string()))?,
            None => Vec::new(),
        };

        Ok(LinkSource::Static { links, endpoints })
    }

    /// Get the server bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(feature = "postgres")]
fn database_source<F>(var: &F) -> Option<LinkSource>
where
    F: Fn(&str) -> Option<String>,
{
    var("DATABASE_URL").map(|url| LinkSource::Database { url })
}

#[cfg(not(feature = "postgres"))]
fn database_source<F>(_var: &F) -> Option<LinkSource>
where
    F: Fn(&str) -> Option<String>,
{
    None
}
