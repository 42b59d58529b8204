//! Configuration loading and validation.
//!
//! Configuration is resolved with the following precedence (highest wins):
//!
//! 1. CLI flags (applied by the caller after `Config::load`)
//! 2. Environment variables (`AUTOWIKI_*`)
//! 3. Project config (`<repo>/.autowiki/config.toml`)
//! 4. User config (`$XDG_CONFIG_HOME/autowiki/config.toml`)
//! 5. Compiled-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AutoWikiResult;

/// Top-level configuration for autowiki-core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of persisted graph/tree/vector state.
    #[serde(default = "Config::default_base_dir")]
    pub base_dir: PathBuf,

    /// Indexing-specific settings.
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Search-specific settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Default hashing-embedder settings.
    #[serde(default)]
    pub vector: VectorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: Self::default_base_dir(),
            indexing: IndexingConfig::default(),
            search: SearchConfig::default(),
            vector: VectorConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    fn default_base_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("autowiki")
    }

    /// Load configuration: compiled defaults, overlaid by user config,
    /// overlaid by project config, overlaid by environment variables.
    /// CLI flags are applied by the caller on top of the returned value.
    pub fn load(repo_path: &Path) -> AutoWikiResult<Self> {
        let mut config = Self::default();

        if let Some(user_config_dir) = dirs::config_dir() {
            let user_config_path = user_config_dir.join("autowiki").join("config.toml");
            if user_config_path.exists() {
                config.merge_from_file(&user_config_path)?;
            }
        }

        let project_config_path = repo_path.join(".autowiki").join("config.toml");
        if project_config_path.exists() {
            config.merge_from_file(&project_config_path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Merge values from a TOML config file (non-destructive overlay:
    /// a missing section leaves the current value untouched).
    fn merge_from_file(&mut self, path: &Path) -> AutoWikiResult<()> {
        let content = std::fs::read_to_string(path)?;
        let overlay: toml::Value = toml::from_str(&content)?;

        if let Some(base_dir) = overlay.get("base_dir").and_then(toml::Value::as_str) {
            self.base_dir = PathBuf::from(base_dir);
        }
        if let Some(v) = overlay.get("indexing") {
            if let Ok(parsed) = v.clone().try_into::<IndexingConfig>() {
                self.indexing = parsed;
            }
        }
        if let Some(v) = overlay.get("search") {
            if let Ok(parsed) = v.clone().try_into::<SearchConfig>() {
                self.search = parsed;
            }
        }
        if let Some(v) = overlay.get("vector") {
            if let Ok(parsed) = v.clone().try_into::<VectorConfig>() {
                self.vector = parsed;
            }
        }
        if let Some(v) = overlay.get("logging") {
            if let Ok(parsed) = v.clone().try_into::<LoggingConfig>() {
                self.logging = parsed;
            }
        }
        if let Some(v) = overlay.get("server") {
            if let Ok(parsed) = v.clone().try_into::<ServerConfig>() {
                self.server = parsed;
            }
        }

        Ok(())
    }

    /// Apply `AUTOWIKI_*`/`CHROMA_DB_PATH` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("AUTOWIKI_BASE_DIR") {
            self.base_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("AUTOWIKI_LOG_LEVEL") {
            self.logging.level = level;
        }
        // Retained for drop-in compatibility with the system this crate's
        // VectorStore persistence layout was adapted from.
        if let Ok(chroma_path) = std::env::var("CHROMA_DB_PATH") {
            self.vector.persist_dir = Some(PathBuf::from(chroma_path));
        }
    }

    fn validate(&self) -> AutoWikiResult<()> {
        if self.indexing.text_chunk_overlap >= self.indexing.text_chunk_size {
            return Err(crate::error::AutoWikiError::InputError(format!(
                "indexing.text_chunk_overlap ({}) must be < indexing.text_chunk_size ({})",
                self.indexing.text_chunk_overlap, self.indexing.text_chunk_size
            )));
        }
        Ok(())
    }

    /// Directory holding `<sanitized_id>.json` / `<sanitized_id>_tree.json`.
    pub fn graphs_dir(&self) -> PathBuf {
        self.base_dir.join("graphs")
    }

    /// Directory holding the vector store's per-collection JSON files.
    pub fn vector_dir(&self) -> PathBuf {
        self.vector
            .persist_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("chromadb"))
    }
}

/// Indexing-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Exact-name/prefix ignore set applied during the repository walk.
    #[serde(default = "IndexingConfig::default_ignore_names")]
    pub ignore_names: Vec<String>,

    /// Local-root prefixes used by Python import classification.
    #[serde(default = "IndexingConfig::default_local_root_prefixes")]
    pub local_root_prefixes: Vec<String>,

    /// Text chunker sliding-window size, in characters.
    #[serde(default = "IndexingConfig::default_text_chunk_size")]
    pub text_chunk_size: usize,

    /// Text chunker sliding-window overlap, in characters.
    #[serde(default = "IndexingConfig::default_text_chunk_overlap")]
    pub text_chunk_overlap: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            ignore_names: Self::default_ignore_names(),
            local_root_prefixes: Self::default_local_root_prefixes(),
            text_chunk_size: Self::default_text_chunk_size(),
            text_chunk_overlap: Self::default_text_chunk_overlap(),
        }
    }
}

impl IndexingConfig {
    fn default_ignore_names() -> Vec<String> {
        vec![
            ".git".into(),
            "__pycache__".into(),
            "node_modules".into(),
            ".next".into(),
            "venv".into(),
            ".venv".into(),
            ".DS_Store".into(),
            "dist".into(),
            "build".into(),
            ".pytest_cache".into(),
            "data".into(),
            "temp_repos".into(),
        ]
    }

    fn default_local_root_prefixes() -> Vec<String> {
        vec!["backend".into(), "app".into()]
    }

    fn default_text_chunk_size() -> usize {
        1000
    }

    fn default_text_chunk_overlap() -> usize {
        200
    }
}

/// Search-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default `limit` for `SearchService::search` when unspecified.
    #[serde(default = "SearchConfig::default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::default_limit(),
        }
    }
}

impl SearchConfig {
    fn default_limit() -> usize {
        10
    }
}

/// Vector store / embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Embedding dimensionality used by the default hashing `EmbeddingProvider`.
    #[serde(default = "VectorConfig::default_dimensions")]
    pub dimensions: usize,

    /// Overrides `<base_dir>/chromadb` when set (mirrors `CHROMA_DB_PATH`).
    #[serde(default)]
    pub persist_dir: Option<PathBuf>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimensions: Self::default_dimensions(),
            persist_dir: None,
        }
    }
}

impl VectorConfig {
    fn default_dimensions() -> usize {
        256
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Tracing env-filter directive, e.g. `"info"`, `"autowiki=debug"`.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Whether to emit structured JSON log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".into()
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "ServerConfig::default_addr")]
    pub addr: String,

    /// Bind port.
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
            port: Self::default_port(),
        }
    }
}

impl ServerConfig {
    fn default_addr() -> String {
        "127.0.0.1".into()
    }

    fn default_port() -> u16 {
        9090
    }
}
