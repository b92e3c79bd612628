//! Principal component projection backed by `linfa-reduction`.

use embedplot_shared::{EmbedplotError, EmbeddingMatrix, ProjectionConfig, ProjectionResult, Result};
use linfa::DatasetBase;
use linfa::traits::{Fit, Predict};
use linfa_reduction::Pca;
use ndarray::{Array2, Axis};
use tracing::{debug, info, instrument};

/// Total variance below this is treated as "all rows identical".
const DEGENERATE_VARIANCE: f64 = 1e-12;

/// Projects onto the top two principal components.
#[derive(Debug, Clone, Default)]
pub struct PcaProjector {
    whiten: bool,
}

impl From<&ProjectionConfig> for PcaProjector {
    fn from(config: &ProjectionConfig) -> Self {
        Self {
            whiten: config.whiten,
        }
    }
}

impl crate::Projector for PcaProjector {
    fn name(&self) -> &'static str {
        "pca"
    }

    #[instrument(skip_all, fields(rows = matrix.rows(), width = matrix.width()))]
    fn project(&self, matrix: &EmbeddingMatrix) -> Result<ProjectionResult> {
        let rows = matrix.rows();
        let records: Array2<f64> = matrix.view().mapv(f64::from);

        // One row, width 0, or constant columns: nothing to project onto.
        let variance = if rows < 2 {
            0.0
        } else {
            records.var_axis(Axis(0), 0.0).sum()
        };
        if variance <= DEGENERATE_VARIANCE {
            debug!(rows, "degenerate input, emitting zero coordinates");
            return Ok(ProjectionResult::from_points(&vec![[0.0, 0.0]; rows]));
        }

        let components = 2.min(matrix.width()).min(rows);
        let dataset = DatasetBase::from(records.clone());
        let pca: Pca<f64> = Pca::params(components)
            .whiten(self.whiten)
            .fit(&dataset)
            .map_err(|e| EmbedplotError::Projection(format!("PCA fit failed: {e}")))?;
        let mut embedded: Array2<f64> = pca.predict(&records);
        orient_axes(&mut embedded);

        let points: Vec<[f64; 2]> = embedded
            .rows()
            .into_iter()
            .map(|row| [row[0], row.get(1).copied().unwrap_or(0.0)])
            .collect();

        info!(rows, components, "projection complete");
        Ok(ProjectionResult::from_points(&points))
    }
}

/// Flip each axis so its largest-magnitude coordinate is positive. SVD signs
/// are arbitrary; this keeps repeated runs on the same data identical.
fn orient_axes(embedded: &mut Array2<f64>) {
    for mut column in embedded.columns_mut() {
        let pivot = column
            .iter()
            .copied()
            .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < 0.0 {
            column.mapv_inplace(|x| -x);
        }
    }
}
