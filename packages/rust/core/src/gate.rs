//! Change detection against the last committed checksum.

use std::sync::Arc;

use embedplot_shared::{Checksum, EmbedplotError, Result};
use embedplot_storage::ChecksumStore;
use tracing::{debug, info, warn};

/// Outcome of comparing a fresh archive against the stored checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub checksum: Checksum,
    /// Stored value at evaluation time; `None` only in forced runs with no state.
    pub previous: Option<Checksum>,
    pub is_new: bool,
}

/// Decides whether an archive needs processing and records processed ones.
///
/// Evaluation never writes. [`ChecksumGate::commit`] is the only mutation and
/// belongs at the very end of a successful run.
#[derive(Clone)]
pub struct ChecksumGate {
    store: Arc<dyn ChecksumStore>,
}

impl ChecksumGate {
    pub fn new(store: Arc<dyn ChecksumStore>) -> Self {
        Self { store }
    }

    /// Hash `raw` and compare against the stored checksum.
    pub fn evaluate(&self, raw: &[u8]) -> Result<GateDecision> {
        self.decide(Checksum::of_bytes(raw))
    }

    /// Compare an already computed checksum. An unreadable store is fatal.
    pub fn decide(&self, checksum: Checksum) -> Result<GateDecision> {
        let previous = self.store.load()?;
        let is_new = previous != checksum;
        debug!(%checksum, %previous, is_new, store = %self.store.describe(), "checksum compared");
        Ok(GateDecision {
            checksum,
            previous: Some(previous),
            is_new,
        })
    }

    /// Like [`decide`](Self::decide) but always reports new data. A missing
    /// stored checksum is tolerated; other read failures are not.
    pub fn force(&self, checksum: Checksum) -> Result<GateDecision> {
        let previous = match self.store.load() {
            Ok(previous) => Some(previous),
            Err(EmbedplotError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                warn!(store = %self.store.describe(), "no stored checksum, continuing (forced run)");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(GateDecision {
            checksum,
            previous,
            is_new: true,
        })
    }

    /// Persist `checksum` as the last processed archive.
    pub fn commit(&self, checksum: &Checksum) -> Result<()> {
        self.store.store(checksum)?;
        info!(%checksum, store = %self.store.describe(), "checksum gate advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use embedplot_storage::{FileChecksumStore, MemoryChecksumStore};

    use super::*;

    fn gate_with(raw: &[u8]) -> (ChecksumGate, Arc<MemoryChecksumStore>) {
        let store = Arc::new(MemoryChecksumStore::with_checksum(Checksum::of_bytes(raw)));
        (ChecksumGate::new(store.clone()), store)
    }

    #[test]
    fn identical_bytes_are_not_new() {
        let (gate, _) = gate_with(b"release 2024_01");
        let decision = gate.evaluate(b"release 2024_01").unwrap();
        assert!(!decision.is_new);
        assert_eq!(decision.checksum, Checksum::of_bytes(b"release 2024_01"));
    }

    #[test]
    fn any_single_byte_mutation_is_new() {
        let raw: Vec<u8> = (0..=255u8).cycle().take(512).collect();
        let (gate, _) = gate_with(&raw);

        for i in 0..raw.len() {
            let mut mutated = raw.clone();
            mutated[i] ^= 0x01;
            assert!(gate.evaluate(&mutated).unwrap().is_new, "mutation at byte {i} went unnoticed");
        }
    }

    #[test]
    fn evaluation_does_not_write() {
        let (gate, store) = gate_with(b"old");
        let decision = gate.evaluate(b"new").unwrap();
        assert!(decision.is_new);
        assert_eq!(store.current(), Some(Checksum::of_bytes(b"old")));
    }

    #[test]
    fn commit_replaces_stored_value() {
        let (gate, store) = gate_with(b"old");
        let decision = gate.evaluate(b"new").unwrap();
        gate.commit(&decision.checksum).unwrap();
        assert_eq!(store.current(), Some(Checksum::of_bytes(b"new")));
        assert!(!gate.evaluate(b"new").unwrap().is_new);
    }

    #[test]
    fn missing_checksum_is_fatal() {
        let gate = ChecksumGate::new(Arc::new(MemoryChecksumStore::new()));
        let err = gate.evaluate(b"anything").unwrap_err();
        assert!(matches!(err, EmbedplotError::Io { .. }));
    }

    #[test]
    fn forced_decision_tolerates_missing_checksum() {
        let gate = ChecksumGate::new(Arc::new(MemoryChecksumStore::new()));
        let decision = gate.force(Checksum::of_bytes(b"first")).unwrap();
        assert!(decision.is_new);
        assert_eq!(decision.previous, None);
    }

    #[test]
    fn forced_decision_is_new_even_when_unchanged() {
        let (gate, _) = gate_with(b"same");
        let decision = gate.force(Checksum::of_bytes(b"same")).unwrap();
        assert!(decision.is_new);
        assert_eq!(decision.previous, Some(Checksum::of_bytes(b"same")));
    }

    #[test]
    fn file_store_round_trip_through_gate() {
        let dir: PathBuf =
            std::env::temp_dir().join(format!("embedplot-gate-{}", uuid::Uuid::now_v7()));
        let path = dir.join("last_checksum");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, format!("{}\n", Checksum::of_bytes(b"v1"))).unwrap();

        let gate = ChecksumGate::new(Arc::new(FileChecksumStore::new(&path)));
        assert!(!gate.evaluate(b"v1").unwrap().is_new);

        let decision = gate.evaluate(b"v2").unwrap();
        assert!(decision.is_new);
        gate.commit(&decision.checksum).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            Checksum::of_bytes(b"v2").as_str()
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
