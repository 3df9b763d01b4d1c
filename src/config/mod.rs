//! Configuration management.
//!
//! Settings come from an optional TOML file, then `CITEFLEX__SECTION__KEY` environment
//! overrides. API keys additionally fall back to their conventional environment variables.
//!
//! ```toml
//! [api_keys]
//! courtlistener = "your-token"
//!
//! [routing]
//! confidence_threshold = 0.7
//! ai_enabled = true
//!
//! [cascade]
//! provider_timeout_secs = 10
//! min_confidence = 0.5
//!
//! [cascade.plans]
//! journal = ["crossref", "openalex"]
//!
//! [providers.semantic_scholar]
//! requests_per_second = 1.0
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 86400
//! ```

pub mod tables;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Type detection and AI escalation
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Provider cascade behaviour
    #[serde(default)]
    pub cascade: CascadeConfig,

    /// Per-provider settings keyed by provider id
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Lookup cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound HTTP
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Settings for one provider (defaults when not configured)
    pub fn provider(&self, id: &str) -> ProviderConfig {
        self.providers.get(id).cloned().unwrap_or_default()
    }
}

/// API keys for external services
///
/// Keys missing from the config file are read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// Gemini key for the AI classifier
    pub gemini: Option<String>,

    /// CourtListener API token
    pub courtlistener: Option<String>,

    /// NCBI E-utilities key (optional, raises the rate limit)
    pub pubmed: Option<String>,

    /// Semantic Scholar API key (optional, for higher rate limits)
    pub semantic_scholar: Option<String>,

    /// Google Custom Search API key
    pub google_cse_key: Option<String>,

    /// Google Custom Search engine id
    pub google_cse_id: Option<String>,
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            gemini: env_key("GEMINI_API_KEY"),
            courtlistener: env_key("CL_API_KEY"),
            pubmed: env_key("PUBMED_API_KEY"),
            semantic_scholar: env_key("SEMANTIC_SCHOLAR_API_KEY"),
            google_cse_key: env_key("GOOGLE_CSE_API_KEY"),
            google_cse_id: env_key("GOOGLE_CSE_ID"),
        }
    }
}

/// Confidence routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Pattern confidence at or above which the AI classifier is skipped
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,

    /// Whether to escalate low-confidence detections to the AI classifier
    #[serde(default = "default_true")]
    pub ai_enabled: bool,

    #[serde(default = "default_timeout_secs")]
    pub ai_timeout_secs: u64,

    #[serde(default = "default_ai_model")]
    pub ai_model: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            ai_enabled: true,
            ai_timeout_secs: default_timeout_secs(),
            ai_model: default_ai_model(),
        }
    }
}

impl RoutingConfig {
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

fn default_threshold() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_ai_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Cascade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Upper bound on a single provider call
    #[serde(default = "default_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Minimum match confidence for providers without their own minimum
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Queries resolved at once by `resolve_many`
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-type provider order overrides, keyed by reference type
    #[serde(default)]
    pub plans: HashMap<String, Vec<String>>,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_timeout_secs(),
            min_confidence: default_min_confidence(),
            max_concurrent: default_max_concurrent(),
            plans: HashMap::new(),
        }
    }
}

impl CascadeConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_max_concurrent() -> usize {
    4
}

/// Settings for a single provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides the provider's own minimum match confidence
    #[serde(default)]
    pub min_confidence: Option<f64>,

    /// Client-side rate limit (unlimited when absent)
    #[serde(default)]
    pub requests_per_second: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: None,
            requests_per_second: None,
        }
    }
}

/// Lookup cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Cache root (defaults to the platform cache directory)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: None,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    86400 // 24 hours
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Contact address for polite API pools (Crossref, OpenAlex)
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            contact_email: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("citeflex/{}", env!("CARGO_PKG_VERSION"))
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Load configuration from an optional TOML file plus `CITEFLEX__*` environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("CITEFLEX")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Locate a config file: `./citeflex.toml`, then `<config_dir>/citeflex/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("citeflex.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("citeflex").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Write configuration as TOML, creating parent directories
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Default lookup cache root: `<cache_dir>/citeflex`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("citeflex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.routing.confidence_threshold, 0.7);
        assert!(config.routing.ai_enabled);
        assert_eq!(config.cascade.min_confidence, 0.5);
        assert_eq!(config.cascade.provider_timeout(), Duration::from_secs(10));
        assert!(!config.cache.enabled);
        assert!(config.provider("crossref").enabled);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("citeflex.toml");
        std::fs::write(
            &path,
            r#"
[api_keys]
courtlistener = "file-token"

[routing]
confidence_threshold = 0.8
ai_enabled = false

[cascade]
provider_timeout_secs = 3

[cascade.plans]
journal = ["crossref", "openalex"]

[providers.semantic_scholar]
enabled = false
requests_per_second = 1.0

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.api_keys.courtlistener.as_deref(), Some("file-token"));
        assert_eq!(config.routing.confidence_threshold, 0.8);
        assert!(!config.routing.ai_enabled);
        assert_eq!(config.cascade.provider_timeout_secs, 3);
        assert_eq!(
            config.cascade.plans.get("journal"),
            Some(&vec!["crossref".to_string(), "openalex".to_string()])
        );
        assert!(!config.provider("semantic_scholar").enabled);
        assert_eq!(config.provider("semantic_scholar").requests_per_second, Some(1.0));
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.cascade.min_confidence = 0.6;
        config.http.contact_email = Some("me@example.org".to_string());
        save_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.cascade.min_confidence, 0.6);
        assert_eq!(loaded.http.contact_email.as_deref(), Some("me@example.org"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/citeflex.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
