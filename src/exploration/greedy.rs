use tch::Tensor;

use super::{ExplorationContext, ExplorationModule, argmax};
use crate::error::Result;

/// Always picks the highest value.
#[derive(Debug, Default, Clone)]
pub struct GreedyExploration;

impl ExplorationModule for GreedyExploration {
    fn act(&mut self, context: ExplorationContext<'_>) -> Result<Tensor> {
        Ok(argmax(&context.batched_values()?))
    }
}
