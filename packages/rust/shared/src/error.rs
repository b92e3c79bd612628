//! Error types for embedplot.
//!
//! Library crates use [`EmbedplotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all embedplot operations.
///
/// None of these are recovered locally: every variant aborts the ingest run
/// before anything is published or the checksum is committed.
#[derive(Debug, thiserror::Error)]
pub enum EmbedplotError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Non-success status or network failure talking to a remote endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// The embedding archive could not be opened or read.
    #[error("archive error: {0}")]
    Archive(String),

    /// The archive parsed but holds no records.
    #[error("embedding archive is empty: {path:?}")]
    EmptyDataset { path: PathBuf },

    /// Vector width mismatch or a remote response missing expected fields.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A single keyword lookup failed; fatal for the whole run.
    #[error("failed requesting keyword for accession_id {accession}: {source}")]
    Lookup {
        accession: String,
        #[source]
        source: Box<EmbedplotError>,
    },

    /// The projection stage returned something other than one 2-D point per row.
    #[error("projection error: {0}")]
    Projection(String),

    /// Filesystem I/O error (checksum state, archive file, output directory).
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A worker task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EmbedplotError>;

impl EmbedplotError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Attribute an error to the accession whose lookup produced it.
    pub fn lookup(accession: impl Into<String>, source: EmbedplotError) -> Self {
        Self::Lookup {
            accession: accession.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
