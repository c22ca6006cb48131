use tch::Tensor;

use super::{ExplorationContext, ExplorationModule, argmax};
use crate::error::{Result, RlError};

/// Thompson sampling with a Gaussian posterior: draws
/// `values + sigma * N(0, 1)` per action and takes the argmax.
#[derive(Debug, Default, Clone)]
pub struct ThompsonSamplingExploration;

impl ExplorationModule for ThompsonSamplingExploration {
    fn act(&mut self, context: ExplorationContext<'_>) -> Result<Tensor> {
        let representation = context.representation.ok_or_else(|| {
            RlError::Unsupported("Thompson sampling needs an uncertainty representation".into())
        })?;
        let values = context.batched_values()?;
        let sigma = representation
            .sigma(context.subjective_state)?
            .view([-1, context.action_space.n()])
            .to_device(values.device());
        let samples = &values + sigma * values.randn_like();
        Ok(argmax(&samples))
    }
}
