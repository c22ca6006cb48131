use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};

use super::{LearnReport, PolicyLearner};
use crate::action_space::DiscreteActionSpace;
use crate::error::{Result, RlError};
use crate::exploration::{ExplorationContext, ExplorationModule, argmax};
use crate::linear_regression::LinearRegressionEnsemble;
use crate::replay_buffer::TransitionBatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisjointLinearBanditConfig {
    pub training_rounds: usize,
    pub batch_size: usize,
    pub l2_reg_lambda: f64,
}

impl Default for DisjointLinearBanditConfig {
    fn default() -> Self {
        Self {
            training_rounds: 100,
            batch_size: 128,
            l2_reg_lambda: 1.0,
        }
    }
}

/// Linear bandit over a static discrete action space where every action
/// owns its own regression on `[state, action]`.
pub struct DisjointLinearBandit {
    feature_dim: i64,
    config: DisjointLinearBanditConfig,
    linear_regressions: LinearRegressionEnsemble,
    exploration_module: Box<dyn ExplorationModule>,
    discrete_action_space: DiscreteActionSpace,
    device: Device,
}

impl DisjointLinearBandit {
    /// `feature_dim` is the width of `[state, action]`.
    pub fn new(
        feature_dim: i64,
        action_space: DiscreteActionSpace,
        exploration_module: Box<dyn ExplorationModule>,
        config: DisjointLinearBanditConfig,
        device: Device,
    ) -> Result<Self> {
        let linear_regressions = LinearRegressionEnsemble::new(
            action_space.n(),
            feature_dim,
            config.l2_reg_lambda,
            device,
        )?;
        Ok(Self {
            feature_dim,
            config,
            linear_regressions,
            exploration_module,
            discrete_action_space: action_space.to_device(device),
            device,
        })
    }

    pub fn linear_regressions(&self) -> &LinearRegressionEnsemble {
        &self.linear_regressions
    }

    /// `(batch, n, feature_dim)`: each state paired with every action vector.
    fn features(&self, subjective_state: &Tensor) -> Result<Tensor> {
        let feature = self.discrete_action_space.cat_state_tensor(subjective_state);
        let actual = feature.size()[2];
        if actual != self.feature_dim {
            return Err(RlError::DimensionMismatch {
                expected: self.feature_dim,
                actual,
            });
        }
        Ok(feature)
    }

    /// Expected reward of every action, `(batch, n)`.
    pub fn get_scores(&self, subjective_state: &Tensor) -> Result<Tensor> {
        self.linear_regressions.forward(&self.features(subjective_state)?)
    }
}

impl PolicyLearner for DisjointLinearBandit {
    fn act(
        &mut self,
        subjective_state: &Tensor,
        action_space: &DiscreteActionSpace,
        exploit: bool,
    ) -> Result<Tensor> {
        // static action space only
        if action_space.n() != self.discrete_action_space.n() {
            return Err(RlError::DimensionMismatch {
                expected: self.discrete_action_space.n(),
                actual: action_space.n(),
            });
        }
        let feature = self.features(subjective_state)?;
        let values = self.linear_regressions.forward(&feature)?;
        if exploit {
            return Ok(argmax(&values));
        }
        self.exploration_module.act(
            ExplorationContext::new(&feature, &self.discrete_action_space, &values)
                .with_representation(&self.linear_regressions),
        )
    }

    /// Rows of `batch` are routed to the regression of their action;
    /// actions absent from the batch are left untouched.
    fn learn_batch(&mut self, batch: &TransitionBatch) -> Result<LearnReport> {
        let batch = batch.to_device(self.device);
        let actions = Vec::<i64>::try_from(&batch.action.to_device(Device::Cpu))?;
        for &action in &actions {
            self.discrete_action_space.check_index(action)?;
        }

        for action_idx in 0..self.discrete_action_space.n() {
            let rows: Vec<i64> = actions
                .iter()
                .enumerate()
                .filter(|&(_, &a)| a == action_idx)
                .map(|(i, _)| i as i64)
                .collect();
            if rows.is_empty() {
                continue;
            }
            let index = Tensor::from_slice(&rows).to_device(self.device);
            let state = batch.state.index_select(0, &index);
            // cat state with the corresponding action vector
            let expanded_action = self
                .discrete_action_space
                .get(action_idx)?
                .unsqueeze(0)
                .expand([rows.len() as i64, -1], false);
            let context = Tensor::cat(&[state, expanded_action], 1);
            let reward = batch.reward.index_select(0, &index);
            let weight = match &batch.weight {
                Some(weight) => weight.index_select(0, &index),
                None => Tensor::ones_like(&reward).to_kind(Kind::Float),
            };
            self.linear_regressions.models_mut()[action_idx as usize]
                .learn_batch(&context, &reward, &weight)?;
        }
        tracing::debug!(batch_size = actions.len(), "disjoint linear bandit batch");
        Ok(LearnReport::new())
    }

    fn training_rounds(&self) -> usize {
        self.config.training_rounds
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }
}
