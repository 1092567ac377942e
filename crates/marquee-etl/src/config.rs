use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use marquee_core::{Error, IndexSpec, Metric, RetryPolicy};

/// Configuration for marquee.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (MARQUEE_* prefix)
/// 3. Config file (~/.config/marquee/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenAI API key, used for both embeddings and chat completions.
    ///
    /// Can be set via:
    /// - ENV: MARQUEE_OPENAI_API_KEY
    /// - Config: openai_api_key = "..."
    pub openai_api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints.
    pub openai_base_url: String,

    /// Embedding model identifier.
    pub embedding_model: String,

    /// Pinecone API key.
    ///
    /// Can be set via:
    /// - ENV: MARQUEE_PINECONE_API_KEY
    /// - Config: pinecone_api_key = "..."
    pub pinecone_api_key: Option<String>,

    /// Pinecone pod environment (e.g. "us-west1-gcp"). When unset, new
    /// indexes are created serverless in `pinecone_cloud`/`pinecone_region`.
    pub pinecone_environment: Option<String>,

    pub pinecone_cloud: String,

    pub pinecone_region: String,

    /// Pinecone control-plane URL.
    pub pinecone_controller_url: String,

    /// Plex server URL.
    pub plex_url: String,

    /// Plex authentication token.
    ///
    /// Can be set via:
    /// - ENV: MARQUEE_PLEX_TOKEN
    /// - Config: plex_token = "..."
    pub plex_token: Option<String>,

    /// Vector index name shared by ingestion and query.
    pub index_name: String,

    /// Embedding dimensionality shared by ingestion and query.
    pub dimension: usize,

    pub metric: Metric,

    /// Entries per upsert call.
    pub batch_size: usize,

    /// Nearest neighbours retrieved per query.
    pub top_k: usize,

    /// Retries for transient provider failures.
    pub max_retries: usize,

    /// Records embedded concurrently during a sync.
    pub concurrency: usize,

    /// Per-call timeout for every provider request.
    pub request_timeout_secs: u64,

    pub embedding_requests_per_second: u32,

    /// Plex sections synced when no section is named.
    pub sections: Vec<String>,

    /// Address the HTTP server binds to.
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: String::from("https://api.openai.com/v1"),
            embedding_model: String::from("text-embedding-ada-002"),
            pinecone_api_key: None,
            pinecone_environment: None,
            pinecone_cloud: String::from("aws"),
            pinecone_region: String::from("us-east-1"),
            pinecone_controller_url: String::from("https://api.pinecone.io"),
            plex_url: String::from("http://plex:32400"),
            plex_token: None,
            index_name: String::from("media-library"),
            dimension: 1536,
            metric: Metric::Cosine,
            batch_size: 100,
            top_k: 20,
            max_retries: 3,
            concurrency: 8,
            request_timeout_secs: 30,
            embedding_requests_per_second: 50,
            sections: vec![String::from("Movies"), String::from("TV Shows")],
            bind: String::from("0.0.0.0:8000"),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/marquee/config.toml
    /// Reads environment variables with MARQUEE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration using `config_path` as the config file.
    ///
    /// A missing file is not an error; defaults and environment apply.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("marquee");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Check numeric settings.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the first invalid setting.
    pub fn validate(&self) -> marquee_core::Result<()> {
        let positive = [
            ("dimension", self.dimension),
            ("batch_size", self.batch_size),
            ("top_k", self.top_k),
            ("concurrency", self.concurrency),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{key} must be greater than zero")));
            }
        }
        if self.index_name.trim().is_empty() {
            return Err(Error::Config("index_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// The index name, dimension, and metric both pipelines use.
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec::new(self.index_name.clone(), self.dimension, self.metric)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn openai_api_key(&self) -> marquee_core::Result<&str> {
        required("openai_api_key", self.openai_api_key.as_deref())
    }

    pub fn pinecone_api_key(&self) -> marquee_core::Result<&str> {
        required("pinecone_api_key", self.pinecone_api_key.as_deref())
    }

    pub fn plex_token(&self) -> marquee_core::Result<&str> {
        required("plex_token", self.plex_token.as_deref())
    }
}

fn required<'a>(key: &str, value: Option<&'a str>) -> marquee_core::Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::Config(format!(
                "missing required credential {key} (set MARQUEE_{} or {key} in {})",
                key.to_uppercase(),
                config_file_path().display()
            ))
        })
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/marquee/config.toml
/// - macOS: ~/Library/Application Support/marquee/config.toml
/// - Windows: %APPDATA%\marquee\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marquee")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Marquee Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (MARQUEE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# OpenAI API key (embeddings and answer generation)
# Environment: MARQUEE_OPENAI_API_KEY
openai_api_key = "your-openai-api-key-here"
#embedding_model = "text-embedding-ada-002"

# Pinecone API key (vector index)
# Environment: MARQUEE_PINECONE_API_KEY
pinecone_api_key = "your-pinecone-api-key-here"
# Pod environment for newly created indexes; leave unset for serverless
#pinecone_environment = "us-west1-gcp"

# Plex server and token (media library)
# Environment: MARQUEE_PLEX_URL, MARQUEE_PLEX_TOKEN
plex_url = "http://plex:32400"
plex_token = "your-plex-token-here"

# Vector index shared by ingestion and query. The dimension must match
# the embedding model; an existing index with a different dimension is
# never recreated.
#index_name = "media-library"
#dimension = 1536
#metric = "cosine"

# Pipeline tuning
#batch_size = 100
#top_k = 20
#max_retries = 3
#concurrency = 8
#request_timeout_secs = 30

# Library sections synced by `marquee sync` and GET /get-episode-data
#sections = ["Movies", "TV Shows"]

#bind = "0.0.0.0:8000"
"#
}

/// Create a config file with defaults at `config_path` if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
