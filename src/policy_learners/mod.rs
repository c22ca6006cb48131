use std::collections::BTreeMap;

use tch::Tensor;

use crate::action_space::DiscreteActionSpace;
use crate::error::Result;
use crate::replay_buffer::{ReplayBuffer, TransitionBatch};

pub mod deep_bandit;
pub mod deep_q_learning;
pub mod disjoint_linear_bandit;
pub mod policy_gradient;

pub use deep_bandit::{DeepBandit, DeepBanditConfig};
pub use deep_q_learning::{DeepQLearning, DeepQLearningConfig};
pub use disjoint_linear_bandit::{DisjointLinearBandit, DisjointLinearBanditConfig};
pub use policy_gradient::{PolicyGradient, PolicyGradientConfig};

/// Named scalars reported by one learning step, e.g. `"loss"`.
pub type LearnReport = BTreeMap<String, f64>;

pub trait PolicyLearner {
    /// Chooses actions for a state or a batch of states; returns `(batch,)`
    /// int64 indices into `action_space`.
    fn act(&mut self, subjective_state: &Tensor, action_space: &DiscreteActionSpace, exploit: bool)
    -> Result<Tensor>;

    fn learn_batch(&mut self, batch: &TransitionBatch) -> Result<LearnReport>;

    fn training_rounds(&self) -> usize;

    fn batch_size(&self) -> usize;

    fn on_policy(&self) -> bool {
        false
    }

    fn reset(&mut self, _action_space: &DiscreteActionSpace) {}

    /// Runs `training_rounds` sampled batches.
    ///
    /// Off-policy learners wait until the buffer holds `batch_size`
    /// transitions; on-policy learners consume the whole buffer each round.
    fn learn(&mut self, replay_buffer: &mut dyn ReplayBuffer) -> Result<Vec<LearnReport>> {
        let batch_size = if self.on_policy() {
            replay_buffer.len()
        } else {
            self.batch_size()
        };
        if batch_size == 0 || replay_buffer.len() < batch_size {
            return Ok(Vec::new());
        }
        let mut reports = Vec::with_capacity(self.training_rounds());
        for _ in 0..self.training_rounds() {
            let batch = replay_buffer.sample(batch_size)?;
            reports.push(self.learn_batch(&batch)?);
        }
        Ok(reports)
    }
}

pub(crate) fn report(loss: f64) -> LearnReport {
    LearnReport::from([("loss".to_string(), loss)])
}
