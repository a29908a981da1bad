//! Application configuration for the research assistant.
//!
//! User config lives at `~/.arxiv-assistant/arxiv-assistant.toml`.
//! CLI flags override config file values, which override defaults.
//! The config is loaded once at startup and passed by reference afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};
use crate::types::DEFAULT_MODEL;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "arxiv-assistant.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".arxiv-assistant";

// ---------------------------------------------------------------------------
// Config structs (matching arxiv-assistant.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// arXiv API settings.
    #[serde(default)]
    pub arxiv: ArxivConfig,

    /// PDF download settings.
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Model routing table, first match wins.
    #[serde(default = "default_provider_routes")]
    pub providers: Vec<ProviderRoute>,

    /// Step journal settings.
    #[serde(default)]
    pub journal: JournalConfig,

    /// Keep-alive pinger settings.
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            arxiv: ArxivConfig::default(),
            documents: DocumentsConfig::default(),
            providers: default_provider_routes(),
            journal: JournalConfig::default(),
            keepalive: KeepaliveConfig::default(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Model used when a request does not name one.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum number of papers fetched per request.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum number of PDF pages read per paper.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Extract papers concurrently instead of one after another.
    #[serde(default = "default_true")]
    pub concurrent_extraction: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_results: default_max_results(),
            max_pages: default_max_pages(),
            concurrent_extraction: true,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_max_results() -> usize {
    3
}
fn default_max_pages() -> u32 {
    5
}
fn default_true() -> bool {
    true
}

/// `[arxiv]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    /// Query endpoint of the arXiv API.
    #[serde(default = "default_arxiv_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_arxiv_timeout")]
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_base_url(),
            timeout_secs: default_arxiv_timeout(),
        }
    }
}

fn default_arxiv_base_url() -> String {
    "http://export.arxiv.org/api/query".into()
}
fn default_arxiv_timeout() -> u64 {
    30
}

/// `[documents]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// PDF download timeout in seconds.
    #[serde(default = "default_documents_timeout")]
    pub timeout_secs: u64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_documents_timeout(),
        }
    }
}

fn default_documents_timeout() -> u64 {
    60
}

/// `[[providers]]` entry: maps model identifiers to credentials, endpoint, and temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRoute {
    /// Display name used in logs.
    pub name: String,
    /// Substring matched against the model identifier. Empty matches everything.
    #[serde(default)]
    pub model_pattern: String,
    /// Name of the env var holding the API key (never store the key itself).
    pub api_key_env: String,
    /// Fixed OpenAI-compatible base URL (e.g. `https://api.openai.com/v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Env var holding the base URL; consulted when `base_url` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,
    /// Sampling temperature sent with every request on this route.
    pub temperature: f32,
}

impl ProviderRoute {
    /// Whether this route handles `model_id`.
    pub fn matches(&self, model_id: &str) -> bool {
        model_id.contains(&self.model_pattern)
    }
}

/// The built-in routing table: DeepSeek models first, everything else to OpenAI.
pub fn default_provider_routes() -> Vec<ProviderRoute> {
    vec![
        ProviderRoute {
            name: "deepseek".into(),
            model_pattern: "deepseek".into(),
            api_key_env: "DEEPSEEK_API_KEY".into(),
            base_url: None,
            base_url_env: Some("DEEPSEEK_BASE_URL".into()),
            temperature: 0.6,
        },
        ProviderRoute {
            name: "openai".into(),
            model_pattern: String::new(),
            api_key_env: "OPENAI_API_KEY".into(),
            base_url: Some("https://api.openai.com/v1".into()),
            base_url_env: None,
            temperature: 1.0,
        },
    ]
}

/// `[journal]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Path to the step journal database. Defaults to `<config dir>/journal.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl JournalConfig {
    /// Resolve the journal database path.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(config_dir()?.join("journal.db")),
        }
    }
}

/// `[keepalive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// URL pinged on every tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Seconds between pings.
    #[serde(default = "default_keepalive_interval")]
    pub interval_secs: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            url: None,
            interval_secs: default_keepalive_interval(),
        }
    }
}

fn default_keepalive_interval() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.arxiv-assistant/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AssistantError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.arxiv-assistant/arxiv-assistant.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AssistantError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        AssistantError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.providers.is_empty() {
        return Err(AssistantError::config(format!(
            "{}: at least one [[providers]] entry is required",
            path.display()
        )));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AssistantError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AssistantError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AssistantError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
