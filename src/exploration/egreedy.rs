use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::Tensor;

use super::{ExplorationContext, ExplorationModule};
use crate::error::{Result, RlError};

/// With probability `epsilon` a uniformly random action, otherwise the
/// exploit action. Decided independently for every row of the batch.
pub struct EGreedyExploration {
    epsilon: f64,
    rng: StdRng,
}

impl EGreedyExploration {
    pub fn new(epsilon: f64) -> Result<Self> {
        Self::with_rng(epsilon, StdRng::from_os_rng())
    }

    pub fn with_seed(epsilon: f64, seed: u64) -> Result<Self> {
        Self::with_rng(epsilon, StdRng::seed_from_u64(seed))
    }

    fn with_rng(epsilon: f64, rng: StdRng) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(RlError::Unsupported(format!("epsilon must lie in [0, 1], got {epsilon}")));
        }
        Ok(Self { epsilon, rng })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Multiplicative decay, floored at `min_epsilon`.
    pub fn decay(&mut self, factor: f64, min_epsilon: f64) {
        self.epsilon = (self.epsilon * factor).max(min_epsilon);
    }
}

impl ExplorationModule for EGreedyExploration {
    fn act(&mut self, context: ExplorationContext<'_>) -> Result<Tensor> {
        let greedy = context.greedy_action()?;
        let n = context.action_space.n();
        let greedy: Vec<i64> = Vec::<i64>::try_from(&greedy.to_device(tch::Device::Cpu))?;
        let actions: Vec<i64> = greedy
            .into_iter()
            .map(|action| {
                if self.rng.random::<f64>() < self.epsilon {
                    self.rng.random_range(0..n)
                } else {
                    action
                }
            })
            .collect();
        Ok(Tensor::from_slice(&actions).to_device(context.values.device()))
    }
}
