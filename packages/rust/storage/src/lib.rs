//! Persistent run state: the checksum of the last processed archive.
//!
//! The checksum is the only state carried between runs. It is read when a run
//! starts and overwritten only after a run has published its output.
//! [`ChecksumStore`] keeps that access injectable:
//! - [`FileChecksumStore`]: plain-text file, replaced atomically on write
//! - [`MemoryChecksumStore`]: in-process value for tests and dry runs

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use embedplot_shared::{Checksum, EmbedplotError, Result};
use tracing::{debug, info};

/// Read/write access to the last committed checksum.
pub trait ChecksumStore: Send + Sync {
    /// Load the stored checksum. A missing value is an error.
    ///
    /// The value is compared byte for byte with fresh checksums. File-backed
    /// stores drop a single trailing line ending (`\n` or `\r\n`) and
    /// keep everything else, including other whitespace.
    fn load(&self) -> Result<Checksum>;

    /// Replace the stored checksum.
    fn store(&self, checksum: &Checksum) -> Result<()>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Checksum kept as the sole contents of a text file.
#[derive(Debug, Clone)]
pub struct FileChecksumStore {
    path: PathBuf,
}

impl FileChecksumStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checksum".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl ChecksumStore for FileChecksumStore {
    fn load(&self) -> Result<Checksum> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| EmbedplotError::io(&self.path, e))?;
        let checksum = Checksum::new(strip_line_ending(&content));
        debug!(path = %self.path.display(), %checksum, "loaded stored checksum");
        Ok(checksum)
    }

    fn store(&self, checksum: &Checksum) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| EmbedplotError::io(parent, e))?;
            }
        }

        let temp = self.temp_path();
        std::fs::write(&temp, checksum.as_str()).map_err(|e| EmbedplotError::io(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| EmbedplotError::io(&self.path, e))?;

        info!(path = %self.path.display(), %checksum, "checksum committed");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// `content` without one trailing `\n` or `\r\n`.
fn strip_line_ending(content: &str) -> &str {
    content
        .strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(content)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Checksum held in memory.
#[derive(Debug, Default)]
pub struct MemoryChecksumStore {
    value: Mutex<Option<Checksum>>,
}

impl MemoryChecksumStore {
    /// Empty store; `load` fails until something is stored.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checksum(checksum: Checksum) -> Self {
        Self {
            value: Mutex::new(Some(checksum)),
        }
    }

    /// Current value, if any.
    pub fn current(&self) -> Option<Checksum> {
        self.value.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ChecksumStore for MemoryChecksumStore {
    fn load(&self) -> Result<Checksum> {
        let guard = self
            .value
            .lock()
            .map_err(|_| EmbedplotError::Internal("checksum store lock poisoned".into()))?;
        guard.clone().ok_or_else(|| {
            EmbedplotError::io(
                "<memory>",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no checksum stored"),
            )
        })
    }

    fn store(&self, checksum: &Checksum) -> Result<()> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| EmbedplotError::Internal("checksum store lock poisoned".into()))?;
        *guard = Some(checksum.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("embedplot-{label}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = temp_dir("store-roundtrip");
        let store = FileChecksumStore::new(dir.join("last_checksum"));

        store.store(&Checksum::new("abc123")).unwrap();
        assert_eq!(store.load().unwrap(), Checksum::new("abc123"));
        assert_eq!(
            std::fs::read_to_string(dir.join("last_checksum")).unwrap(),
            "abc123"
        );
        // No temp file left behind
        assert!(!dir.join(".last_checksum.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_overwrites_previous_value() {
        let dir = temp_dir("store-overwrite");
        let store = FileChecksumStore::new(dir.join("last_checksum"));

        store.store(&Checksum::new("first")).unwrap();
        store.store(&Checksum::new("second")).unwrap();
        assert_eq!(store.load().unwrap().as_str(), "second");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_ignores_trailing_newline() {
        let dir = temp_dir("store-newline");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("last_checksum");
        std::fs::write(&path, "deadbeef\n").unwrap();

        let store = FileChecksumStore::new(&path);
        assert_eq!(store.load().unwrap().as_str(), "deadbeef");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_strips_only_one_line_ending() {
        let dir = temp_dir("store-line-ending");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("last_checksum");
        let store = FileChecksumStore::new(&path);

        std::fs::write(&path, "deadbeef\r\n").unwrap();
        assert_eq!(store.load().unwrap().as_str(), "deadbeef");

        std::fs::write(&path, "deadbeef\n\n").unwrap();
        assert_eq!(store.load().unwrap().as_str(), "deadbeef\n");

        std::fs::write(&path, "deadbeef \n").unwrap();
        assert_eq!(store.load().unwrap().as_str(), "deadbeef ");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_missing_file_is_io_error() {
        let dir = temp_dir("store-missing");
        let store = FileChecksumStore::new(dir.join("nope"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, EmbedplotError::Io { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_creates_parent_directory() {
        let dir = temp_dir("store-parent");
        let store = FileChecksumStore::new(dir.join("nested").join("last_checksum"));
        store.store(&Checksum::new("xyz")).unwrap();
        assert_eq!(store.load().unwrap().as_str(), "xyz");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_store_behaves_like_file_store() {
        let store = MemoryChecksumStore::new();
        assert!(store.load().is_err());

        store.store(&Checksum::new("one")).unwrap();
        assert_eq!(store.load().unwrap().as_str(), "one");
        assert_eq!(store.current(), Some(Checksum::new("one")));

        let seeded = MemoryChecksumStore::with_checksum(Checksum::new("two"));
        assert_eq!(seeded.load().unwrap().as_str(), "two");
    }
}
