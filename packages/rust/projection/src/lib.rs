//! Two-dimensional projection of embedding matrices.
//!
//! The pipeline only relies on the [`Projector`] contract: an `N × D`
//! matrix in, exactly `N` points out, row order preserved. [`PcaProjector`],
//! built on `linfa-reduction`, is the implementation shipped with the binary.

mod pca;

use embedplot_shared::{EmbedplotError, EmbeddingMatrix, ProjectionResult, Result};

pub use pca::PcaProjector;

/// Reduces each embedding row to a 2-D coordinate.
pub trait Projector: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn project(&self, matrix: &EmbeddingMatrix) -> Result<ProjectionResult>;
}

/// Check that a projection has one finite point per matrix row.
pub fn ensure_aligned(result: &ProjectionResult, rows: usize) -> Result<()> {
    let points = result.len()?;
    if points != rows {
        return Err(EmbedplotError::Projection(format!(
            "projector returned {points} points for {rows} rows"
        )));
    }
    let finite = result
        .coordinate_1
        .iter()
        .chain(&result.coordinate_2)
        .all(|v| v.is_finite());
    if !finite {
        return Err(EmbedplotError::Projection(
            "projector returned non-finite coordinates".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_aligned_accepts_matching_rows() {
        let result = ProjectionResult::from_points(&[[0.0, 0.0], [1.0, 1.0]]);
        assert!(ensure_aligned(&result, 2).is_ok());
    }

    #[test]
    fn ensure_aligned_rejects_wrong_count() {
        let result = ProjectionResult::from_points(&[[0.0, 0.0]]);
        let err = ensure_aligned(&result, 3).unwrap_err();
        assert!(err.to_string().contains("1 points for 3 rows"));
    }

    #[test]
    fn ensure_aligned_rejects_nan() {
        let result = ProjectionResult::from_points(&[[f64::NAN, 0.0]]);
        assert!(ensure_aligned(&result, 1).is_err());
    }
}
