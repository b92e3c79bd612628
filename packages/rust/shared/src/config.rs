//! Application configuration for embedplot.
//!
//! User config lives at `~/.embedplot/embedplot.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EmbedplotError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "embedplot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".embedplot";

/// Token in the keyword URL template replaced by the accession id.
pub const ENTRY_ID_PLACEHOLDER: &str = "ENTRY_ID";

// ---------------------------------------------------------------------------
// Config structs (matching embedplot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote endpoints.
    #[serde(default)]
    pub source: SourceConfig,

    /// On-disk locations for the archive, checksum, and plot data.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Keyword lookup settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Projection settings.
    #[serde(default)]
    pub projection: ProjectionConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Where the per-protein embedding archive is published.
    #[serde(default = "default_embeddings_url")]
    pub embeddings_url: String,

    /// Keyword search URL; `ENTRY_ID` is replaced by each accession.
    #[serde(default = "default_keyword_url_template")]
    pub keyword_url_template: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            embeddings_url: default_embeddings_url(),
            keyword_url_template: default_keyword_url_template(),
        }
    }
}

fn default_embeddings_url() -> String {
    "https://ftp.uniprot.org/pub/databases/uniprot/current_release/knowledgebase/embeddings/UP000005640_9606/per-protein.h5".into()
}
fn default_keyword_url_template() -> String {
    "https://rest.uniprot.org/uniprotkb/search?query=accession_id:ENTRY_ID&fields=keyword".into()
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Working directory for the downloaded archive and the checksum file.
    #[serde(default = "default_ingest_dir")]
    pub ingest_dir: String,

    #[serde(default = "default_archive_filename")]
    pub archive_filename: String,

    /// File holding the checksum of the last successfully processed archive.
    #[serde(default = "default_checksum_filename")]
    pub checksum_filename: String,

    /// Directory receiving dated plot data and the latest copy.
    #[serde(default = "default_plotdata_dir")]
    pub plotdata_dir: String,

    /// Dated files are named `<file_prefix>-YYYY-MM-DD.json`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_latest_filename")]
    pub latest_filename: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ingest_dir: default_ingest_dir(),
            archive_filename: default_archive_filename(),
            checksum_filename: default_checksum_filename(),
            plotdata_dir: default_plotdata_dir(),
            file_prefix: default_file_prefix(),
            latest_filename: default_latest_filename(),
        }
    }
}

fn default_ingest_dir() -> String {
    "ingest".into()
}
fn default_archive_filename() -> String {
    "embeddings.h5".into()
}
fn default_checksum_filename() -> String {
    "last_checksum".into()
}
fn default_plotdata_dir() -> String {
    "plotdata".into()
}
fn default_file_prefix() -> String {
    "plotdata".into()
}
fn default_latest_filename() -> String {
    "latest.json".into()
}

/// `[keywords]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Maximum keyword lookups in flight at once.
    #[serde(default = "default_keyword_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout. Absent means requests may wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_keyword_concurrency(),
            request_timeout_secs: None,
        }
    }
}

fn default_keyword_concurrency() -> usize {
    16
}

/// `[projection]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Scale both output axes to unit variance.
    #[serde(default)]
    pub whiten: bool,
}

// ---------------------------------------------------------------------------
// Ingest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime ingest configuration, merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Embedding archive URL.
    pub embeddings_url: Url,
    /// Keyword lookup URL template containing [`ENTRY_ID_PLACEHOLDER`].
    pub keyword_url_template: String,
    pub ingest_dir: PathBuf,
    pub archive_filename: String,
    pub checksum_filename: String,
    pub plotdata_dir: PathBuf,
    pub file_prefix: String,
    pub latest_filename: String,
    /// Worker-pool size for keyword lookups.
    pub keyword_concurrency: usize,
    /// Optional per-request timeout for keyword lookups.
    pub request_timeout_secs: Option<u64>,
    /// Process the archive even if its checksum matches the stored one.
    pub force: bool,
    /// Leave the downloaded archive on disk after the run.
    pub keep_archive: bool,
}

impl IngestConfig {
    /// Where the downloaded archive is written.
    pub fn archive_path(&self) -> PathBuf {
        self.ingest_dir.join(&self.archive_filename)
    }

    /// Where the last processed checksum is persisted.
    pub fn checksum_path(&self) -> PathBuf {
        self.ingest_dir.join(&self.checksum_filename)
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.keyword_concurrency == 0 {
            return Err(EmbedplotError::config("keywords.concurrency must be at least 1"));
        }
        if !self.keyword_url_template.contains(ENTRY_ID_PLACEHOLDER) {
            return Err(EmbedplotError::config(format!(
                "keyword_url_template must contain the {ENTRY_ID_PLACEHOLDER} placeholder"
            )));
        }
        let sample = self.keyword_url_template.replace(ENTRY_ID_PLACEHOLDER, "P00000");
        Url::parse(&sample).map_err(|e| {
            EmbedplotError::config(format!("keyword_url_template is not a valid URL: {e}"))
        })?;
        Ok(())
    }
}

impl TryFrom<&AppConfig> for IngestConfig {
    type Error = EmbedplotError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let embeddings_url = Url::parse(&config.source.embeddings_url).map_err(|e| {
            EmbedplotError::config(format!(
                "invalid embeddings_url '{}': {e}",
                config.source.embeddings_url
            ))
        })?;

        let ingest = Self {
            embeddings_url,
            keyword_url_template: config.source.keyword_url_template.clone(),
            ingest_dir: PathBuf::from(&config.paths.ingest_dir),
            archive_filename: config.paths.archive_filename.clone(),
            checksum_filename: config.paths.checksum_filename.clone(),
            plotdata_dir: PathBuf::from(&config.paths.plotdata_dir),
            file_prefix: config.paths.file_prefix.clone(),
            latest_filename: config.paths.latest_filename.clone(),
            keyword_concurrency: config.keywords.concurrency,
            request_timeout_secs: config.keywords.request_timeout_secs,
            force: false,
            keep_archive: false,
        };
        ingest.validate()?;
        Ok(ingest)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.embedplot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EmbedplotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.embedplot/embedplot.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| EmbedplotError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EmbedplotError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EmbedplotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EmbedplotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EmbedplotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
