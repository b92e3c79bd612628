//! Embedding archive download and extraction.
//!
//! This crate provides:
//! - [`download`]: streams the published archive to disk, hashing as it goes
//! - [`EmbeddingArchive`]: keyed store of fixed-width vectors
//! - [`extract`]: turns an archive into an ordered entry list and a dense matrix
//!
//! The production archive is HDF5 and is only readable when the crate is
//! built with the `hdf5` feature. [`MemoryArchive`] is always available.

pub mod download;
#[cfg(feature = "hdf5")]
mod h5;

use std::path::Path;

use embedplot_shared::{EmbedplotError, EmbeddingMatrix, EntryId, Result};
use tracing::{debug, info, instrument};

pub use download::{DownloadedArchive, download_archive, remove_archive};
#[cfg(feature = "hdf5")]
pub use h5::Hdf5Archive;

// ---------------------------------------------------------------------------
// Archive abstraction
// ---------------------------------------------------------------------------

/// A keyed collection of numeric vectors.
///
/// `keys` order is the order the underlying store enumerates its records;
/// it becomes the entry order of the whole run and must not be re-sorted.
pub trait EmbeddingArchive {
    /// All record keys, in store iteration order.
    fn keys(&self) -> Result<Vec<String>>;

    /// The vector stored under `key`.
    fn read_vector(&self, key: &str) -> Result<Vec<f32>>;
}

/// Opens an archive file into an [`EmbeddingArchive`].
pub trait ArchiveOpener: Send + Sync {
    /// Fails when this opener can never read an archive, so callers can stop
    /// before downloading one.
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<Box<dyn EmbeddingArchive>>;
}

/// Opens archives with the HDF5 backend when compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOpener;

impl ArchiveOpener for DefaultOpener {
    #[cfg(feature = "hdf5")]
    fn open(&self, path: &Path) -> Result<Box<dyn EmbeddingArchive>> {
        Ok(Box::new(Hdf5Archive::open(path)?))
    }

    #[cfg(not(feature = "hdf5"))]
    fn ensure_ready(&self) -> Result<()> {
        Err(EmbedplotError::config(NO_HDF5))
    }

    #[cfg(not(feature = "hdf5"))]
    fn open(&self, path: &Path) -> Result<Box<dyn EmbeddingArchive>> {
        Err(EmbedplotError::config(format!(
            "cannot read {}: {NO_HDF5}",
            path.display()
        )))
    }
}

#[cfg(not(feature = "hdf5"))]
const NO_HDF5: &str = "embedplot was built without HDF5 support (rebuild with `--features hdf5`)";

// ---------------------------------------------------------------------------
// In-memory archive
// ---------------------------------------------------------------------------

/// Ordered in-memory archive. Also acts as its own opener, ignoring the path.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    records: Vec<(String, Vec<f32>)>,
}

impl MemoryArchive {
    pub fn new(records: Vec<(String, Vec<f32>)>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EmbeddingArchive for MemoryArchive {
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records.iter().map(|(key, _)| key.clone()).collect())
    }

    fn read_vector(&self, key: &str) -> Result<Vec<f32>> {
        self.records
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, vector)| vector.clone())
            .ok_or_else(|| EmbedplotError::Archive(format!("no record named '{key}'")))
    }
}

impl ArchiveOpener for MemoryArchive {
    fn open(&self, _path: &Path) -> Result<Box<dyn EmbeddingArchive>> {
        Ok(Box::new(self.clone()))
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Entry ids and their embeddings, row `i` belonging to `entry_ids[i]`.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub entry_ids: Vec<EntryId>,
    pub matrix: EmbeddingMatrix,
}

/// Open the archive at `path` and extract every record.
pub fn extract(opener: &dyn ArchiveOpener, path: &Path) -> Result<Extracted> {
    let archive = opener.open(path)?;
    extract_records(archive.as_ref(), path)
}

/// Read every record of an opened archive.
///
/// The width of the first record fixes the matrix width; any later record
/// of a different width is a schema error. An archive without records is
/// an [`EmbedplotError::EmptyDataset`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_records(archive: &dyn EmbeddingArchive, path: &Path) -> Result<Extracted> {
    let entry_ids = archive.keys()?;

    let Some(first) = entry_ids.first() else {
        return Err(EmbedplotError::EmptyDataset {
            path: path.to_path_buf(),
        });
    };

    let first_vector = archive.read_vector(first)?;
    let width = first_vector.len();
    if width == 0 {
        return Err(EmbedplotError::schema(format!(
            "record '{first}' is an empty vector"
        )));
    }
    let mut matrix = EmbeddingMatrix::with_width(width);
    matrix.push_row(&first_vector)?;

    for key in &entry_ids[1..] {
        let vector = archive.read_vector(key)?;
        if vector.len() != width {
            return Err(EmbedplotError::schema(format!(
                "record '{key}' has width {}, expected {width}",
                vector.len()
            )));
        }
        matrix.push_row(&vector)?;
        debug!(key = %key, "read record");
    }

    info!(entries = entry_ids.len(), width, "embedding archive extracted");

    Ok(Extracted { entry_ids, matrix })
}
