//! Configuration management for the DocHub backend
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// GitHub API configuration
    pub github: GithubConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Sync pipeline configuration
    pub sync: SyncConfig,

    /// Chat / language model configuration
    pub chat: ChatConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    /// GitHub REST API base URL
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Raw content base URL
    #[serde(default = "default_github_raw_base")]
    pub raw_base: String,

    /// Optional bearer token (unauthenticated access is rate-limited hard)
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient fetch failures
    #[serde(default = "default_github_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: ollama, openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for cloud embedding services
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Concurrent file downloads within one sync
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// Concurrent document chunk/embed jobs within one sync
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,

    /// Maximum chunk size in characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Minimum chunk size in characters (smaller fragments are merged)
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Language model provider: ollama, openai, mock
    #[serde(default = "default_chat_provider")]
    pub provider: String,

    /// API key for cloud providers
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_chat_retries")]
    pub max_retries: u32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Chunks retrieved per message
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Title prefix length derived from the first user message
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Proceed with empty context when retrieval fails (false surfaces the error)
    #[serde(default = "default_degrade_on_search_failure")]
    pub degrade_on_search_failure: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_github_api_base() -> String { "https://api.github.com".to_string() }
fn default_github_raw_base() -> String { "https://raw.githubusercontent.com".to_string() }
fn default_github_timeout() -> u64 { 30 }
fn default_github_retries() -> u32 { 3 }
fn default_embedding_provider() -> String { "ollama".to_string() }
fn default_embedding_model() -> String { "nomic-embed-text".to_string() }
fn default_embedding_dimension() -> usize { 768 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_download_concurrency() -> usize { 5 }
fn default_embed_concurrency() -> usize { 5 }
fn default_max_chunk_size() -> usize { 1600 }
fn default_min_chunk_size() -> usize { 64 }
fn default_chat_provider() -> String { "ollama".to_string() }
fn default_chat_model() -> String { "llama3.1".to_string() }
fn default_chat_timeout() -> u64 { 60 }
fn default_chat_retries() -> u32 { 3 }
fn default_max_tokens() -> u32 { 2000 }
fn default_temperature() -> f32 { 0.7 }
fn default_top_k() -> usize { 5 }
fn default_title_max_chars() -> usize { 50 }
fn default_degrade_on_search_failure() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "dochub".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/dochub".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            github: GithubConfig {
                api_base: default_github_api_base(),
                raw_base: default_github_raw_base(),
                token: None,
                timeout_secs: default_github_timeout(),
                max_retries: default_github_retries(),
            },
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
            },
            sync: SyncConfig {
                download_concurrency: default_download_concurrency(),
                embed_concurrency: default_embed_concurrency(),
                max_chunk_size: default_max_chunk_size(),
                min_chunk_size: default_min_chunk_size(),
            },
            chat: ChatConfig {
                provider: default_chat_provider(),
                api_key: None,
                api_base: None,
                model: default_chat_model(),
                timeout_secs: default_chat_timeout(),
                max_retries: default_chat_retries(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
                top_k: default_top_k(),
                title_max_chars: default_title_max_chars(),
                degrade_on_search_failure: default_degrade_on_search_failure(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.chat.top_k, 5);
        assert!(config.chat.degrade_on_search_failure);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/dochub");
    }

    #[test]
    fn test_sync_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.sync.download_concurrency, 5);
        assert_eq!(config.sync.embed_concurrency, 5);
        assert!(config.sync.min_chunk_size < config.sync.max_chunk_size);
    }
}
