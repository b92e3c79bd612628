//! Core domain types for an embedding ingest run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EmbedplotError, Result};

/// Accession code identifying one entry. Position in the entry list matters
/// more than the value: everything downstream refers to entries by index.
pub type EntryId = String;

// ---------------------------------------------------------------------------
// Checksum
// ---------------------------------------------------------------------------

/// Hex-encoded SHA-256 of the raw archive bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Wrap an already-computed checksum string (e.g. one read from disk).
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Hash a byte slice in one go.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = ChecksumHasher::new();
        hasher.update(bytes);
        hasher.finish()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental hasher so a streamed download can be checksummed without
/// reading the file back.
#[derive(Default)]
pub struct ChecksumHasher {
    inner: Sha256,
}

impl ChecksumHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finish(self) -> Checksum {
        Checksum(format!("{:x}", self.inner.finalize()))
    }
}

// ---------------------------------------------------------------------------
// EmbeddingMatrix
// ---------------------------------------------------------------------------

/// Dense `entries × width` matrix of embeddings. Row `i` belongs to entry `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix(Array2<f32>);

impl EmbeddingMatrix {
    /// Empty matrix whose rows must all have `width` columns.
    pub fn with_width(width: usize) -> Self {
        Self(Array2::zeros((0, width)))
    }

    /// Wrap an existing array.
    pub fn from_array(array: Array2<f32>) -> Self {
        Self(array)
    }

    /// Build a matrix from rows, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut matrix = Self::with_width(width);
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    /// Append a row. Fails with a schema error if its width differs.
    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.width() {
            return Err(EmbedplotError::schema(format!(
                "row {} has width {}, expected {}",
                self.rows(),
                row.len(),
                self.width()
            )));
        }
        self.0
            .push_row(ArrayView1::from(row))
            .map_err(|e| EmbedplotError::schema(format!("row {}: {e}", self.rows())))
    }

    pub fn rows(&self) -> usize {
        self.0.nrows()
    }

    pub fn width(&self) -> usize {
        self.0.ncols()
    }

    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.rows()).then(|| self.0.row(index))
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// KeywordIndex
// ---------------------------------------------------------------------------

/// category → keyword → positions into the entry list.
///
/// Ordering within a position list reflects completion order of the
/// lookups and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordIndex(BTreeMap<String, BTreeMap<String, Vec<usize>>>);

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the entry at `position` carries `keyword` under `category`.
    pub fn insert(&mut self, category: &str, keyword: &str, position: usize) {
        self.0
            .entry(category.to_string())
            .or_default()
            .entry(keyword.to_string())
            .or_default()
            .push(position);
    }

    pub fn positions(&self, category: &str, keyword: &str) -> Option<&[usize]> {
        self.0
            .get(category)
            .and_then(|keywords| keywords.get(keyword))
            .map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Vec<usize>>)> {
        self.0.iter().map(|(category, keywords)| (category.as_str(), keywords))
    }

    pub fn category_count(&self) -> usize {
        self.0.len()
    }

    /// Number of distinct (category, keyword) pairs.
    pub fn keyword_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that every referenced position is a valid index for `entry_count` entries.
    pub fn validate(&self, entry_count: usize) -> Result<()> {
        for (category, keywords) in &self.0 {
            for (keyword, positions) in keywords {
                if let Some(bad) = positions.iter().find(|&&p| p >= entry_count) {
                    return Err(EmbedplotError::schema(format!(
                        "keyword {category}/{keyword} references position {bad}, \
                         but only {entry_count} entries exist"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProjectionResult
// ---------------------------------------------------------------------------

/// 2-D coordinates, aligned by position with the entry list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub coordinate_1: Vec<f64>,
    pub coordinate_2: Vec<f64>,
}

impl ProjectionResult {
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        Self {
            coordinate_1: points.iter().map(|p| p[0]).collect(),
            coordinate_2: points.iter().map(|p| p[1]).collect(),
        }
    }

    /// Number of points; errors if the two coordinate sequences disagree.
    pub fn len(&self) -> Result<usize> {
        if self.coordinate_1.len() != self.coordinate_2.len() {
            return Err(EmbedplotError::Projection(format!(
                "coordinate sequences differ in length ({} vs {})",
                self.coordinate_1.len(),
                self.coordinate_2.len()
            )));
        }
        Ok(self.coordinate_1.len())
    }

    pub fn point(&self, index: usize) -> Option<[f64; 2]> {
        Some([*self.coordinate_1.get(index)?, *self.coordinate_2.get(index)?])
    }
}

// ---------------------------------------------------------------------------
// OutputPayload
// ---------------------------------------------------------------------------

/// The document written to `plotdata-YYYY-MM-DD.json` and `latest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPayload {
    pub run_date: NaiveDate,
    pub entry_ids: Vec<EntryId>,
    pub keyword_mapping: KeywordIndex,
    pub coordinate_1: Vec<f64>,
    pub coordinate_2: Vec<f64>,
}

impl OutputPayload {
    /// Assemble a payload, checking that ids, keyword positions, and
    /// coordinates all line up.
    pub fn new(
        run_date: NaiveDate,
        entry_ids: Vec<EntryId>,
        keyword_mapping: KeywordIndex,
        projection: ProjectionResult,
    ) -> Result<Self> {
        let points = projection.len()?;
        if points != entry_ids.len() {
            return Err(EmbedplotError::Projection(format!(
                "{points} projected points for {} entries",
                entry_ids.len()
            )));
        }
        keyword_mapping.validate(entry_ids.len())?;

        Ok(Self {
            run_date,
            entry_ids,
            keyword_mapping,
            coordinate_1: projection.coordinate_1,
            coordinate_2: projection.coordinate_2,
        })
    }
}
