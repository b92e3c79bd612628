//! Shared types, error model, and configuration for embedplot.
//!
//! This crate is the foundation depended on by all other embedplot crates.
//! It provides:
//! - [`EmbedplotError`]: the unified error type
//! - Domain types ([`EmbeddingMatrix`], [`KeywordIndex`], [`Checksum`],
//!   [`ProjectionResult`], [`OutputPayload`])
//! - Configuration ([`AppConfig`], [`IngestConfig`], config loading)
//! - [`build_client`]: the HTTP client used for every outbound request

pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ENTRY_ID_PLACEHOLDER, IngestConfig, KeywordsConfig, PathsConfig, ProjectionConfig,
    SourceConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{EmbedplotError, Result};
pub use http::{USER_AGENT, build_client};
pub use types::{Checksum, ChecksumHasher, EmbeddingMatrix, EntryId, KeywordIndex, OutputPayload, ProjectionResult};
