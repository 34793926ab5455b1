//! Configuration management.
//!
//! All tunables live in one [`Config`] value built from defaults, an
//! optional TOML file, and `REFSMITH_*` environment overrides. The value
//! is constructed once at startup and passed into the components that
//! need it; nothing reads the environment after that.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// PubMed enrichment settings
    #[serde(default)]
    pub pubmed: PubMedConfig,

    /// Retry and concurrency settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Chat-completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature, kept low for deterministic extraction
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sent as the HTTP-Referer header, identifies the calling site
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Sent as the X-Title header
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            site_url: default_site_url(),
            site_name: default_site_name(),
        }
    }
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "google/gemini-2.0-flash-lite-preview-02-05:free".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_llm_timeout() -> u64 {
    10
}

fn default_site_url() -> String {
    "https://example.com".to_string()
}

fn default_site_name() -> String {
    "refsmith".to_string()
}

/// PubMed E-utilities configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMedConfig {
    /// E-utilities base URL
    #[serde(default = "default_pubmed_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_pubmed_timeout")]
    pub timeout_secs: u64,

    /// Whether enrichment runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            base_url: default_pubmed_base_url(),
            timeout_secs: default_pubmed_timeout(),
            enabled: true,
        }
    }
}

fn default_pubmed_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_pubmed_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Retry and concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attempts per reference, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// References processed in parallel per batch
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Outbound LLM request quota per second
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            max_concurrent: default_max_concurrent(),
            requests_per_second: default_rps(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    1
}

fn default_max_concurrent() -> usize {
    4
}

fn default_rps() -> u32 {
    4
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds a stored download stays retrievable
    #[serde(default = "default_artifact_ttl")]
    pub artifact_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            artifact_ttl_secs: default_artifact_ttl(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_artifact_ttl() -> u64 {
    600
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("REFSMITH"))
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the conventional locations:
/// `./refsmith.toml`, then `~/.config/refsmith/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("refsmith.toml");
    if local.is_file() {
        return Some(local);
    }

    if let Some(home) = std::env::var_os("HOME") {
        let user = PathBuf::from(home)
            .join(".config")
            .join("refsmith")
            .join("config.toml");
        if user.is_file() {
            return Some(user);
        }
    }

    None
}
