use serde::{Deserialize, Serialize};
use tch::nn::{self, Module};
use tch::{Device, Kind, Reduction, Tensor};

use super::{LearnReport, PolicyLearner, report};
use crate::action_space::DiscreteActionSpace;
use crate::error::{Result, RlError};
use crate::exploration::{ExplorationContext, ExplorationModule, argmax};
use crate::networks::{VanillaValueNetwork, adamw};
use crate::replay_buffer::TransitionBatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepBanditConfig {
    pub hidden_dims: Vec<i64>,
    pub output_dim: i64,
    pub training_rounds: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for DeepBanditConfig {
    fn default() -> Self {
        Self {
            hidden_dims: vec![64, 16],
            output_dim: 1,
            training_rounds: 100,
            batch_size: 128,
            learning_rate: 1e-3,
        }
    }
}

/// Contextual bandit scoring `[state, action]` with a single MLP regressed
/// on observed rewards.
pub struct DeepBandit {
    feature_dim: i64,
    config: DeepBanditConfig,
    var_store: nn::VarStore,
    deep_represent_layers: VanillaValueNetwork,
    optimizer: nn::Optimizer,
    exploration_module: Box<dyn ExplorationModule>,
    action_space: DiscreteActionSpace,
}

impl DeepBandit {
    /// `feature_dim` is the width of `[state, action]`.
    pub fn new(
        feature_dim: i64,
        action_space: DiscreteActionSpace,
        exploration_module: Box<dyn ExplorationModule>,
        config: DeepBanditConfig,
        device: Device,
    ) -> Result<Self> {
        if feature_dim <= action_space.action_dim() {
            return Err(RlError::DimensionMismatch {
                expected: action_space.action_dim() + 1,
                actual: feature_dim,
            });
        }
        let var_store = nn::VarStore::new(device);
        let deep_represent_layers = VanillaValueNetwork::new(
            &(var_store.root() / "deep_represent_layers"),
            feature_dim,
            &config.hidden_dims,
            config.output_dim,
        )?;
        let optimizer = adamw(&var_store, config.learning_rate)?;
        Ok(Self {
            feature_dim,
            config,
            deep_represent_layers,
            optimizer,
            exploration_module,
            action_space: action_space.to_device(device),
            var_store,
        })
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    fn device(&self) -> Device {
        self.var_store.device()
    }

    fn check_feature_dim(&self, actual: i64) -> Result<()> {
        if actual != self.feature_dim {
            return Err(RlError::DimensionMismatch {
                expected: self.feature_dim,
                actual,
            });
        }
        Ok(())
    }

    /// Scores every action for each state, `(batch, n)`.
    ///
    /// Without an action space the state is taken to be the full feature
    /// vector already and the raw network output is returned.
    pub fn get_scores(
        &self,
        subjective_state: &Tensor,
        action_space: Option<&DiscreteActionSpace>,
    ) -> Result<Tensor> {
        let feature = match action_space {
            Some(space) => space.to_device(self.device()).cat_state_tensor(subjective_state),
            None => subjective_state.to_kind(Kind::Float).to_device(self.device()),
        };
        self.check_feature_dim(feature.size()[feature.dim() - 1])?;
        let values = tch::no_grad(|| self.deep_represent_layers.forward(&feature));
        Ok(if self.config.output_dim == 1 {
            values.squeeze_dim(-1)
        } else {
            values
        })
    }
}

impl PolicyLearner for DeepBandit {
    fn act(
        &mut self,
        subjective_state: &Tensor,
        action_space: &DiscreteActionSpace,
        exploit: bool,
    ) -> Result<Tensor> {
        if self.config.output_dim != 1 {
            return Err(RlError::Unsupported(
                "acting needs a scalar score per action (output_dim = 1)".into(),
            ));
        }
        let action_space = action_space.to_device(self.device());
        let new_feature = action_space.cat_state_tensor(subjective_state);
        self.check_feature_dim(new_feature.size()[2])?;
        // batch_size * action_count
        let values = tch::no_grad(|| self.deep_represent_layers.forward(&new_feature))
            .view([new_feature.size()[0], action_space.n()]);
        if exploit {
            return Ok(argmax(&values));
        }
        self.exploration_module.act(ExplorationContext::new(
            subjective_state,
            &action_space,
            &values,
        ))
    }

    fn learn_batch(&mut self, batch: &TransitionBatch) -> Result<LearnReport> {
        let batch = batch.to_device(self.device());
        let action_features = self.action_space.action_features(&batch.action)?;
        let input_features = Tensor::cat(&[batch.state.shallow_clone(), action_features], 1);
        self.check_feature_dim(input_features.size()[1])?;

        let current_values = self.deep_represent_layers.forward(&input_features);
        let expected_values = &batch.reward;
        let loss = current_values
            .view(expected_values.size().as_slice())
            .mse_loss(expected_values, Reduction::Mean);

        self.optimizer.backward_step(&loss);
        let loss = loss.double_value(&[]);
        tracing::debug!(loss, "deep bandit batch");
        Ok(report(loss))
    }

    fn training_rounds(&self) -> usize {
        self.config.training_rounds
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }
}
