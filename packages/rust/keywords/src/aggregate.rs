//! Concurrent keyword fan-out and merge.

use std::sync::Arc;

use embedplot_shared::{EmbedplotError, EntryId, KeywordIndex, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::{KeywordLookup, KeywordRecord};

/// Progress callback for the lookup phase.
pub trait LookupProgress: Send + Sync {
    /// Called after each lookup has been merged.
    fn lookup_completed(&self, completed: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentLookupProgress;

impl LookupProgress for SilentLookupProgress {
    fn lookup_completed(&self, _completed: usize, _total: usize) {}
}

/// Look up keywords for every entry and build the keyword index.
///
/// One lookup is issued per entry, at most `concurrency` at a time. Results
/// are merged on the calling task as they arrive, so the index is never
/// shared between workers. The first failed lookup aborts the outstanding
/// ones and is returned as [`EmbedplotError::Lookup`]; no partial index is
/// ever returned.
#[instrument(skip_all, fields(entries = entry_ids.len(), concurrency))]
pub async fn aggregate<L: KeywordLookup>(
    entry_ids: &[EntryId],
    lookup: Arc<L>,
    concurrency: usize,
    progress: &dyn LookupProgress,
) -> Result<KeywordIndex> {
    if concurrency == 0 {
        return Err(EmbedplotError::config("keyword concurrency must be at least 1"));
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for (position, accession) in entry_ids.iter().enumerate() {
        let lookup = Arc::clone(&lookup);
        let semaphore = Arc::clone(&semaphore);
        let accession = accession.clone();

        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => lookup.lookup(&accession).await,
                Err(e) => Err(EmbedplotError::Internal(format!("worker pool closed: {e}"))),
            };
            (position, accession, outcome)
        });
    }

    let total = entry_ids.len();
    let mut completed = 0;
    let mut index = KeywordIndex::new();

    // Returning early drops the JoinSet, which aborts every task still running.
    while let Some(joined) = tasks.join_next().await {
        let (position, accession, outcome) = joined
            .map_err(|e| EmbedplotError::Internal(format!("keyword lookup task failed: {e}")))?;

        let record = outcome.map_err(|e| EmbedplotError::lookup(&accession, e))?;
        merge_record(&mut index, position, &accession, record)?;

        completed += 1;
        progress.lookup_completed(completed, total);
    }

    info!(
        entries = total,
        categories = index.category_count(),
        keywords = index.keyword_count(),
        "keyword lookups complete"
    );

    Ok(index)
}

/// Fold one lookup result into the index under the entry's fixed position.
fn merge_record(
    index: &mut KeywordIndex,
    position: usize,
    requested: &str,
    record: KeywordRecord,
) -> Result<()> {
    if record.primary_accession != requested {
        return Err(EmbedplotError::lookup(
            requested,
            EmbedplotError::schema(format!(
                "response is for accession '{}'",
                record.primary_accession
            )),
        ));
    }

    debug!(accession = requested, position, keywords = record.keywords.len(), "merging keywords");

    for keyword in &record.keywords {
        index.insert(&keyword.category, &keyword.name, position);
    }
    Ok(())
}
