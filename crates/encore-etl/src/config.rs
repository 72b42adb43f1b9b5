use anyhow::{bail, Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for encore.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (ENCORE_* prefix)
/// 3. Config file (~/.config/encore/config.toml)
/// 4. Built-in defaults (lowest priority)
///
/// The unprefixed `SETLISTFM_API_KEY` and `OPENAI_API_KEY` variables are
/// honoured when no prefixed key was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// setlist.fm API key (required for `setup`).
    ///
    /// Can be set via:
    /// - ENV: ENCORE_SETLISTFM_API_KEY or SETLISTFM_API_KEY
    /// - Config: setlistfm_api_key = "..."
    pub setlistfm_api_key: Option<String>,

    /// OpenAI API key (required for embedding and answering).
    ///
    /// Can be set via:
    /// - ENV: ENCORE_OPENAI_API_KEY or OPENAI_API_KEY
    /// - Config: openai_api_key = "..."
    pub openai_api_key: Option<String>,

    /// Path to the SQLite database holding setlists.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: ENCORE_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/encore/encore.db
    pub database_path: PathBuf,

    /// Path to the SQLite file holding embeddings.
    pub vector_path: PathBuf,

    /// Directory where raw upstream pages are saved.
    pub raw_dir: PathBuf,

    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,

    /// Setlists retrieved per question.
    pub top_k: usize,

    pub max_setlists_per_artist: usize,
    pub embedding_batch_size: usize,

    /// Setlists per upstream page.
    pub page_size: usize,

    /// Minimum gap between upstream requests, in milliseconds.
    pub request_delay_ms: u64,

    /// Artists collected by `setup` when none are given.
    pub default_artists: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            setlistfm_api_key: None,
            openai_api_key: None,
            database_path: default_data_dir().join("encore.db"),
            vector_path: default_data_dir().join("vectors.db"),
            raw_dir: default_data_dir().join("raw"),
            openai_base_url: encore_search::embedder::DEFAULT_API_BASE.to_string(),
            embedding_model: encore_search::embedder::DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: encore_search::chat::DEFAULT_CHAT_MODEL.to_string(),
            top_k: encore_search::retriever::DEFAULT_TOP_K,
            max_setlists_per_artist: 100,
            embedding_batch_size: encore_search::index::DEFAULT_BATCH_SIZE,
            page_size: 20,
            request_delay_ms: 1000,
            default_artists: vec![
                "Grateful Dead".to_string(),
                "Phish".to_string(),
                "Dead & Company".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/encore/config.toml
    /// Reads environment variables with ENCORE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("encore");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let mut config: Self = builder.build().context("Failed to build configuration")?;
        config.apply_env_fallbacks();
        log::debug!("Loaded configuration (file present: {})", config_path.exists());

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    fn apply_env_fallbacks(&mut self) {
        fill_from_env(&mut self.setlistfm_api_key, "SETLISTFM_API_KEY");
        fill_from_env(&mut self.openai_api_key, "OPENAI_API_KEY");
    }

    /// The setlist.fm key, or an error naming how to set it.
    pub fn setlistfm_key(&self) -> Result<&str> {
        match non_empty(self.setlistfm_api_key.as_deref()) {
            Some(key) => Ok(key),
            None => bail!("SETLISTFM_API_KEY not found in environment or config file"),
        }
    }

    /// The OpenAI key, or an error naming how to set it.
    pub fn openai_key(&self) -> Result<&str> {
        match non_empty(self.openai_api_key.as_deref()) {
            Some(key) => Ok(key),
            None => bail!("OPENAI_API_KEY not found in environment or config file"),
        }
    }

    /// Check that both API keys are present.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing key.
    pub fn validate(&self) -> Result<()> {
        self.setlistfm_key()?;
        self.openai_key()?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if non_empty(slot.as_deref()).is_none() {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                *slot = Some(value);
            }
        }
    }
}

/// Get the default data directory.
///
/// Returns: ~/.local/share/encore (or platform equivalent)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("encore")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/encore/config.toml
/// - macOS: ~/Library/Application Support/encore/config.toml
/// - Windows: %APPDATA%\encore\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("encore")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Encore Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (ENCORE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# setlist.fm API key, used by `encore setup` to collect setlists
#
# Apply for a key at: https://www.setlist.fm/settings/api
#
# Can also be set via:
# - Environment: ENCORE_SETLISTFM_API_KEY=... or SETLISTFM_API_KEY=...
setlistfm_api_key = "your-setlistfm-api-key-here"

# OpenAI API key, used for embeddings and answers
#
# Can also be set via:
# - Environment: ENCORE_OPENAI_API_KEY=... or OPENAI_API_KEY=...
openai_api_key = "your-openai-api-key-here"

# Storage locations (default: platform data directory)
#
# Can also be set via:
# - CLI: encore --db /custom/path.db status
# - Environment: ENCORE_DATABASE_PATH=/custom/path.db
#database_path = "/path/to/encore.db"
#vector_path = "/path/to/vectors.db"
#raw_dir = "/path/to/raw"

# Models
#openai_base_url = "https://api.openai.com/v1"
#embedding_model = "text-embedding-3-small"
#chat_model = "gpt-4o-mini"

# Retrieval and collection
#top_k = 5
#max_setlists_per_artist = 100
#embedding_batch_size = 100
#page_size = 20
#request_delay_ms = 1000
#default_artists = ["Grateful Dead", "Phish", "Dead & Company"]
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
