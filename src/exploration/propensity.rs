use tch::{Kind, Tensor};

use super::{ExplorationContext, ExplorationModule};
use crate::error::Result;

/// Samples an action from `values` read as action probabilities.
/// Rows need not be normalised, but must be non-negative.
#[derive(Debug, Default, Clone)]
pub struct PropensityExploration;

impl ExplorationModule for PropensityExploration {
    fn act(&mut self, context: ExplorationContext<'_>) -> Result<Tensor> {
        let probabilities = context.batched_values()?.detach().clamp_min(0.0);
        // all-zero rows fall back to uniform
        let row_mass = probabilities.sum_dim_intlist(Some(&[-1i64][..]), true, Kind::Float);
        let probabilities = probabilities + row_mass.le(0.0).to_kind(Kind::Float);
        Ok(probabilities.multinomial(1, true).view([-1]))
    }
}
