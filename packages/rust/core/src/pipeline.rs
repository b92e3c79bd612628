//! End-to-end ingest: download → gate → extract → keywords → project → publish → commit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use embedplot_archive::{ArchiveOpener, DefaultOpener, Extracted, download_archive, extract, remove_archive};
use embedplot_artifacts::ResultPublisher;
use embedplot_keywords::{KeywordLookup, LookupProgress, UniprotKeywordClient, aggregate};
use embedplot_projection::{PcaProjector, Projector, ensure_aligned};
use embedplot_shared::{
    Checksum, EmbedplotError, IngestConfig, OutputPayload, ProjectionConfig, Result, build_client,
};
use embedplot_storage::{ChecksumStore, FileChecksumStore};
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::gate::{ChecksumGate, GateDecision};

/// Summary of a published run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub run_date: NaiveDate,
    pub checksum: Checksum,
    pub entries: usize,
    pub vector_width: usize,
    pub categories: usize,
    pub keywords: usize,
    pub dated_path: PathBuf,
    pub latest_path: PathBuf,
    pub payload_sha256: String,
    pub elapsed: Duration,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The archive matched the stored checksum; nothing was processed.
    Unchanged { checksum: Checksum },
    Published(IngestReport),
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each keyword lookup is merged.
    fn lookup_progress(&self, completed: usize, total: usize);
    /// Called when the run finishes without error.
    fn done(&self, outcome: &IngestOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn lookup_progress(&self, _completed: usize, _total: usize) {}
    fn done(&self, _outcome: &IngestOutcome) {}
}

/// Forwards aggregator progress to the pipeline reporter.
struct LookupPhase<'a> {
    reporter: &'a dyn ProgressReporter,
}

impl LookupProgress for LookupPhase<'_> {
    fn lookup_completed(&self, completed: usize, total: usize) {
        self.reporter.lookup_progress(completed, total);
    }
}

/// The ingest job with its collaborators injected.
pub struct IngestPipeline<L: KeywordLookup> {
    config: IngestConfig,
    client: Client,
    lookup: Arc<L>,
    opener: Arc<dyn ArchiveOpener>,
    projector: Arc<dyn Projector>,
    gate: ChecksumGate,
    publisher: ResultPublisher,
}

impl IngestPipeline<UniprotKeywordClient> {
    /// Production wiring: UniProt keyword client, HDF5 opener, PCA projector,
    /// and a checksum file under the ingest directory.
    pub fn standard(config: IngestConfig, projection: &ProjectionConfig) -> Result<Self> {
        let lookup =
            UniprotKeywordClient::new(&config.keyword_url_template, config.request_timeout_secs)?;
        let store = FileChecksumStore::new(config.checksum_path());
        Self::new(
            config,
            Arc::new(lookup),
            Arc::new(DefaultOpener),
            Arc::new(PcaProjector::from(projection)),
            Arc::new(store),
        )
    }
}

impl<L: KeywordLookup> IngestPipeline<L> {
    pub fn new(
        config: IngestConfig,
        lookup: Arc<L>,
        opener: Arc<dyn ArchiveOpener>,
        projector: Arc<dyn Projector>,
        store: Arc<dyn ChecksumStore>,
    ) -> Result<Self> {
        config.validate()?;
        // Refuse before downloading an archive that could never be read.
        opener.ensure_ready()?;
        // The archive is large; only keyword requests get the configured timeout.
        let client = build_client(None)?;
        let publisher = ResultPublisher::from_config(&config);
        Ok(Self {
            config,
            client,
            lookup,
            opener,
            projector,
            gate: ChecksumGate::new(store),
            publisher,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run the full ingest for `run_date`.
    ///
    /// Any error aborts before the checksum is committed, so the next run
    /// retries the same archive.
    #[instrument(skip_all, fields(url = %self.config.embeddings_url, %run_date, force = self.config.force))]
    pub async fn run(
        &self,
        run_date: NaiveDate,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestOutcome> {
        let start = Instant::now();

        // --- Phase 1: Download and gate ---
        let (archive_path, decision) = self.fetch_and_decide(progress).await?;

        if !decision.is_new {
            info!(checksum = %decision.checksum, "no new embedding release, nothing to do");
            self.discard_archive(&archive_path);
            let outcome = IngestOutcome::Unchanged {
                checksum: decision.checksum,
            };
            progress.done(&outcome);
            return Ok(outcome);
        }

        // --- Phase 2: Extract ---
        progress.phase("Reading embeddings");
        let opener = Arc::clone(&self.opener);
        let path = archive_path.clone();
        let Extracted { entry_ids, matrix } =
            tokio::task::spawn_blocking(move || extract(opener.as_ref(), &path))
                .await
                .map_err(|e| EmbedplotError::Internal(format!("extraction task failed: {e}")))??;
        let entries = entry_ids.len();
        let vector_width = matrix.width();

        // --- Phase 3: Keywords ---
        progress.phase("Fetching keywords");
        let index = aggregate(
            &entry_ids,
            Arc::clone(&self.lookup),
            self.config.keyword_concurrency,
            &LookupPhase { reporter: progress },
        )
        .await?;

        // --- Phase 4: Projection ---
        progress.phase("Projecting embeddings");
        let projector = Arc::clone(&self.projector);
        info!(projector = projector.name(), rows = entries, "projecting");
        let projection = tokio::task::spawn_blocking(move || projector.project(&matrix))
            .await
            .map_err(|e| EmbedplotError::Internal(format!("projection task failed: {e}")))??;
        ensure_aligned(&projection, entries)?;

        // --- Phase 5: Publish, then commit ---
        progress.phase("Publishing plot data");
        let categories = index.category_count();
        let keywords = index.keyword_count();
        let payload = OutputPayload::new(run_date, entry_ids, index, projection)?;
        let published = self.publisher.publish(&payload)?;

        self.gate.commit(&decision.checksum)?;
        self.discard_archive(&archive_path);

        let report = IngestReport {
            run_date,
            checksum: decision.checksum,
            entries,
            vector_width,
            categories,
            keywords,
            dated_path: published.dated_path,
            latest_path: published.latest_path,
            payload_sha256: published.sha256,
            elapsed: start.elapsed(),
        };

        info!(
            entries,
            vector_width,
            categories,
            keywords,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "ingest complete"
        );

        let outcome = IngestOutcome::Published(report);
        progress.done(&outcome);
        Ok(outcome)
    }

    /// Download the archive and report whether it differs from the stored
    /// checksum. Never publishes or commits.
    #[instrument(skip_all, fields(url = %self.config.embeddings_url))]
    pub async fn check(&self, progress: &dyn ProgressReporter) -> Result<GateDecision> {
        let (archive_path, decision) = self.fetch_and_decide(progress).await?;
        self.discard_archive(&archive_path);
        Ok(decision)
    }

    async fn fetch_and_decide(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<(PathBuf, GateDecision)> {
        progress.phase("Downloading embedding archive");
        let downloaded = download_archive(
            &self.client,
            &self.config.embeddings_url,
            &self.config.archive_path(),
        )
        .await?;

        progress.phase("Comparing checksum");
        let decision = if self.config.force {
            self.gate.force(downloaded.checksum)?
        } else {
            self.gate.decide(downloaded.checksum)?
        };
        Ok((downloaded.path, decision))
    }

    fn discard_archive(&self, path: &std::path::Path) {
        if self.config.keep_archive {
            return;
        }
        if let Err(e) = remove_archive(path) {
            warn!(path = %path.display(), error = %e, "failed to remove downloaded archive");
        }
    }
}
