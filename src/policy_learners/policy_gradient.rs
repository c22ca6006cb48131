use serde::{Deserialize, Serialize};
use tch::nn::{self, ModuleT};
use tch::{Device, Kind, Tensor};

use super::{LearnReport, PolicyLearner, report};
use crate::action_space::DiscreteActionSpace;
use crate::error::{Result, RlError};
use crate::exploration::{ExplorationContext, ExplorationModule, PropensityExploration, argmax};
use crate::networks::{VanillaActorNetwork, adamw, init_weights};
use crate::replay_buffer::TransitionBatch;
use crate::utils::as_batch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyGradientConfig {
    pub hidden_dims: Vec<i64>,
    pub learning_rate: f64,
    /// Used by the episodic buffer feeding this learner to compute returns.
    pub discount_factor: f64,
    pub training_rounds: usize,
    pub batch_size: usize,
}

impl Default for PolicyGradientConfig {
    fn default() -> Self {
        Self {
            hidden_dims: vec![64, 64],
            learning_rate: 1e-4,
            discount_factor: 0.99,
            training_rounds: 100,
            batch_size: 128,
        }
    }
}

/// REINFORCE over a discrete action space.
///
/// Expects batches whose `reward` column already holds returns, as produced
/// by [`crate::replay_buffer::OnPolicyEpisodicReplayBuffer`].
pub struct PolicyGradient {
    config: PolicyGradientConfig,
    var_store: nn::VarStore,
    actor: VanillaActorNetwork,
    optimizer: nn::Optimizer,
    exploration_module: Box<dyn ExplorationModule>,
    action_space: DiscreteActionSpace,
}

impl PolicyGradient {
    pub fn new(
        state_dim: i64,
        action_space: DiscreteActionSpace,
        exploration_module: Option<Box<dyn ExplorationModule>>,
        config: PolicyGradientConfig,
        device: Device,
    ) -> Result<Self> {
        let var_store = nn::VarStore::new(device);
        let actor = VanillaActorNetwork::new(
            &(var_store.root() / "actor"),
            state_dim,
            &config.hidden_dims,
            action_space.n(),
        );
        init_weights(&var_store);
        let optimizer = adamw(&var_store, config.learning_rate)?;
        let exploration_module: Box<dyn ExplorationModule> = match exploration_module {
            Some(module) => module,
            None => Box::new(PropensityExploration),
        };
        Ok(Self {
            config,
            actor,
            optimizer,
            exploration_module,
            action_space: action_space.to_device(device),
            var_store,
        })
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    pub fn discount_factor(&self) -> f64 {
        self.config.discount_factor
    }

    fn device(&self) -> Device {
        self.var_store.device()
    }

    /// Action probabilities `(batch, n)` without tracking gradients.
    pub fn action_probabilities(&self, subjective_state: &Tensor) -> Tensor {
        let state = as_batch(subjective_state).to_kind(Kind::Float).to_device(self.device());
        tch::no_grad(|| self.actor.forward_t(&state, false))
    }
}

impl PolicyLearner for PolicyGradient {
    fn act(
        &mut self,
        subjective_state: &Tensor,
        available_action_space: &DiscreteActionSpace,
        exploit: bool,
    ) -> Result<Tensor> {
        if available_action_space.n() != self.action_space.n() {
            return Err(RlError::DimensionMismatch {
                expected: self.action_space.n(),
                actual: available_action_space.n(),
            });
        }
        let action_probabilities = self.action_probabilities(subjective_state);
        let exploit_action = argmax(&action_probabilities);
        if exploit {
            return Ok(exploit_action);
        }
        self.exploration_module.act(
            ExplorationContext::new(subjective_state, &self.action_space, &action_probabilities)
                .with_exploit_action(&exploit_action),
        )
    }

    fn learn_batch(&mut self, batch: &TransitionBatch) -> Result<LearnReport> {
        let batch = batch.to_device(self.device());
        let state_batch = &batch.state; // (batch_size x state_dim)
        let return_batch = batch.reward.view([-1, 1]); // (batch_size x 1)
        let batch_size = state_batch.size()[0];
        if batch.action.size()[0] != batch_size || return_batch.size()[0] != batch_size {
            return Err(RlError::DimensionMismatch {
                expected: batch_size,
                actual: batch.action.size()[0].min(return_batch.size()[0]),
            });
        }
        for &action in Vec::<i64>::try_from(&batch.action.to_device(Device::Cpu))?.iter() {
            self.action_space.check_index(action)?;
        }
        let action_batch = batch.action.one_hot(self.action_space.n()).to_kind(Kind::Float);

        let action_probs = self.actor.forward_t(state_batch, true);
        let policy_propensities =
            (action_probs * action_batch).sum_dim_intlist(Some(&[1i64][..]), true, Kind::Float);
        let negative_log_probs = -policy_propensities.log();
        let loss = (negative_log_probs * return_batch).sum(Kind::Float);

        self.optimizer.backward_step(&loss);
        let loss = loss.double_value(&[]);
        tracing::debug!(loss, batch_size, "policy gradient batch");
        Ok(report(loss))
    }

    fn training_rounds(&self) -> usize {
        self.config.training_rounds
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn on_policy(&self) -> bool {
        true
    }

    fn reset(&mut self, action_space: &DiscreteActionSpace) {
        self.action_space = action_space.to_device(self.device());
    }
}
