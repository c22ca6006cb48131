use tch::Tensor;

use super::{ExplorationContext, ExplorationModule, argmax};
use crate::error::{Result, RlError};

/// Upper confidence bound: `values + alpha * sigma`, where `sigma` comes from
/// the learner's representation evaluated on the per-action features.
#[derive(Debug, Clone)]
pub struct UcbExploration {
    alpha: f64,
}

impl UcbExploration {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl ExplorationModule for UcbExploration {
    fn act(&mut self, context: ExplorationContext<'_>) -> Result<Tensor> {
        let representation = context.representation.ok_or_else(|| {
            RlError::Unsupported("UCB exploration needs an uncertainty representation".into())
        })?;
        let values = context.batched_values()?;
        let sigma = representation
            .sigma(context.subjective_state)?
            .view([-1, context.action_space.n()]);
        let scores = values + sigma.to_device(context.values.device()) * self.alpha;
        Ok(argmax(&scores))
    }
}
