//! Ingest orchestration for embedplot.
//!
//! Ties the archive, keyword, projection, and publishing crates into the
//! checksum-gated ingest run ([`IngestPipeline`]).

pub mod gate;
pub mod pipeline;

pub use gate::{ChecksumGate, GateDecision};
pub use pipeline::{IngestOutcome, IngestPipeline, IngestReport, ProgressReporter, SilentProgress};
