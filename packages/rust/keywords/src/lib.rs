//! Keyword annotation for embedding entries.
//!
//! Every entry gets one remote lookup; the returned `(category, keyword)`
//! pairs are folded into a [`KeywordIndex`](embedplot_shared::KeywordIndex)
//! keyed by the entry's position.
//!
//! - [`KeywordLookup`]: per-accession lookup capability
//! - [`UniprotKeywordClient`]: the UniProt REST implementation
//! - [`aggregate`]: concurrent fan-out over a bounded worker pool

mod aggregate;
mod client;

use std::future::Future;

use embedplot_shared::Result;
use serde::{Deserialize, Serialize};

pub use aggregate::{LookupProgress, SilentLookupProgress, aggregate};
pub use client::UniprotKeywordClient;

/// One keyword attached to an entry.
///
/// Mirrors the UniProt shape:
/// `{"id": "KW-1064", "category": "Biological process", "name": "Adaptive immunity"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub category: String,
    pub name: String,
}

impl Keyword {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            category: category.into(),
            name: name.into(),
        }
    }
}

/// Lookup result for a single accession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRecord {
    /// Accession the service answered for; must equal the requested one.
    pub primary_accession: String,
    pub keywords: Vec<Keyword>,
}

/// Remote keyword lookup for one accession id.
pub trait KeywordLookup: Send + Sync + 'static {
    fn lookup(&self, accession: &str) -> impl Future<Output = Result<KeywordRecord>> + Send;
}
