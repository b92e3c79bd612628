//! Publishing of the plot payload.
//!
//! Each successful run produces `{prefix}-YYYY-MM-DD.json` and refreshes the
//! fixed "latest" file to mirror it. Both are written to a hidden temp file
//! in the same directory and renamed into place, so readers never observe a
//! half-written or missing "latest".

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use embedplot_shared::{EmbedplotError, IngestConfig, OutputPayload, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

/// Where and under what names payloads are published.
#[derive(Debug, Clone)]
pub struct ResultPublisher {
    plotdata_dir: PathBuf,
    file_prefix: String,
    latest_filename: String,
}

/// What a publish wrote.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub dated_path: PathBuf,
    pub latest_path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

impl ResultPublisher {
    pub fn new(
        plotdata_dir: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
        latest_filename: impl Into<String>,
    ) -> Self {
        Self {
            plotdata_dir: plotdata_dir.into(),
            file_prefix: file_prefix.into(),
            latest_filename: latest_filename.into(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            &config.plotdata_dir,
            &config.file_prefix,
            &config.latest_filename,
        )
    }

    /// `{plotdata_dir}/{prefix}-YYYY-MM-DD.json`
    pub fn dated_path(&self, run_date: NaiveDate) -> PathBuf {
        self.plotdata_dir.join(format!(
            "{}-{}.json",
            self.file_prefix,
            run_date.format("%Y-%m-%d")
        ))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.plotdata_dir.join(&self.latest_filename)
    }

    /// Serialize `payload` to the dated file, then mirror it as "latest".
    ///
    /// A rerun on the same day overwrites that day's file.
    #[instrument(skip_all, fields(run_date = %payload.run_date, entries = payload.entry_ids.len()))]
    pub fn publish(&self, payload: &OutputPayload) -> Result<PublishResult> {
        std::fs::create_dir_all(&self.plotdata_dir)
            .map_err(|e| EmbedplotError::io(&self.plotdata_dir, e))?;

        let content = serde_json::to_vec(payload)
            .map_err(|e| EmbedplotError::Internal(format!("failed to serialize payload: {e}")))?;

        let dated_path = self.dated_path(payload.run_date);
        write_atomic(&dated_path, &content)?;
        debug!(path = %dated_path.display(), size = content.len(), "wrote dated payload");

        let latest_path = self.latest_path();
        write_atomic(&latest_path, &content)?;
        debug!(path = %latest_path.display(), "refreshed latest payload");

        let sha256 = format!("{:x}", Sha256::digest(&content));

        info!(
            dated = %dated_path.display(),
            latest = %latest_path.display(),
            size_bytes = content.len(),
            "payload published"
        );

        Ok(PublishResult {
            dated_path,
            latest_path,
            sha256,
            size_bytes: content.len(),
        })
    }
}

/// Write `content` to `.{name}.tmp` beside `target`, then rename over it.
fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| EmbedplotError::Internal(format!("{} has no parent", target.display())))?;
    let name = target
        .file_name()
        .ok_or_else(|| EmbedplotError::Internal(format!("{} has no file name", target.display())))?;
    let temp = dir.join(format!(".{}.tmp", name.to_string_lossy()));

    if let Err(e) = std::fs::write(&temp, content) {
        let _ = std::fs::remove_file(&temp);
        return Err(EmbedplotError::io(&temp, e));
    }
    std::fs::rename(&temp, target).map_err(|e| EmbedplotError::io(target, e))
}
