use serde::{Deserialize, Serialize};
use tch::nn;
use tch::{Device, Kind, Reduction, Tensor};

use super::{LearnReport, PolicyLearner, report};
use crate::action_space::DiscreteActionSpace;
use crate::error::{Result, RlError};
use crate::exploration::{EGreedyExploration, ExplorationContext, ExplorationModule, argmax};
use crate::networks::{
    DuelingValueNetwork, ValueNetwork, VanillaValueNetwork, adamw, update_target_network,
};
use crate::replay_buffer::TransitionBatch;
use crate::utils::as_batch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepQLearningConfig {
    pub hidden_dims: Vec<i64>,
    pub learning_rate: f64,
    pub discount_factor: f64,
    /// Weight of the online network in each target update.
    pub soft_update_tau: f64,
    pub training_rounds: usize,
    pub batch_size: usize,
    pub dueling: bool,
    pub epsilon: f64,
}

impl Default for DeepQLearningConfig {
    fn default() -> Self {
        Self {
            hidden_dims: vec![64, 64],
            learning_rate: 1e-3,
            discount_factor: 0.99,
            soft_update_tau: 0.1,
            training_rounds: 10,
            batch_size: 128,
            dueling: false,
            epsilon: 0.05,
        }
    }
}

/// Q-learning over `[state, action]` features with a softly updated target
/// network.
pub struct DeepQLearning {
    config: DeepQLearningConfig,
    var_store: nn::VarStore,
    q_network: Box<dyn ValueNetwork>,
    target_var_store: nn::VarStore,
    target_network: Box<dyn ValueNetwork>,
    optimizer: nn::Optimizer,
    exploration_module: Box<dyn ExplorationModule>,
    action_space: DiscreteActionSpace,
}

fn make_network(
    vs: &nn::VarStore,
    state_dim: i64,
    action_dim: i64,
    config: &DeepQLearningConfig,
) -> Result<Box<dyn ValueNetwork>> {
    let path = vs.root() / "q_network";
    let network: Box<dyn ValueNetwork> = if config.dueling {
        Box::new(DuelingValueNetwork::new(
            &path,
            state_dim,
            action_dim,
            &config.hidden_dims,
            1,
            None,
            None,
        )?)
    } else {
        Box::new(VanillaValueNetwork::new(
            &path,
            state_dim + action_dim,
            &config.hidden_dims,
            1,
        )?)
    };
    Ok(network)
}

impl DeepQLearning {
    pub fn new(
        state_dim: i64,
        action_space: DiscreteActionSpace,
        exploration_module: Option<Box<dyn ExplorationModule>>,
        config: DeepQLearningConfig,
        device: Device,
    ) -> Result<Self> {
        let var_store = nn::VarStore::new(device);
        let q_network = make_network(&var_store, state_dim, action_space.action_dim(), &config)?;
        let mut target_var_store = nn::VarStore::new(device);
        let target_network =
            make_network(&target_var_store, state_dim, action_space.action_dim(), &config)?;
        update_target_network(&mut target_var_store, &var_store, 1.0)?;

        let optimizer = adamw(&var_store, config.learning_rate)?;
        let exploration_module: Box<dyn ExplorationModule> = match exploration_module {
            Some(module) => module,
            None => Box::new(EGreedyExploration::new(config.epsilon)?),
        };
        Ok(Self {
            config,
            var_store,
            q_network,
            target_var_store,
            target_network,
            optimizer,
            exploration_module,
            action_space: action_space.to_device(device),
        })
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    pub fn target_var_store(&self) -> &nn::VarStore {
        &self.target_var_store
    }

    fn device(&self) -> Device {
        self.var_store.device()
    }

    /// Q-values of every action under the online network, `(batch, n)`.
    pub fn q_values(&self, subjective_state: &Tensor) -> Tensor {
        let state = as_batch(subjective_state).to_kind(Kind::Float).to_device(self.device());
        tch::no_grad(|| self.q_network.get_all_action_values(&state, &self.action_space))
    }
}

impl PolicyLearner for DeepQLearning {
    fn act(
        &mut self,
        subjective_state: &Tensor,
        action_space: &DiscreteActionSpace,
        exploit: bool,
    ) -> Result<Tensor> {
        if action_space.n() != self.action_space.n() {
            return Err(RlError::DimensionMismatch {
                expected: self.action_space.n(),
                actual: action_space.n(),
            });
        }
        let values = self.q_values(subjective_state);
        let exploit_action = argmax(&values);
        if exploit {
            return Ok(exploit_action);
        }
        self.exploration_module.act(
            ExplorationContext::new(subjective_state, &self.action_space, &values)
                .with_exploit_action(&exploit_action),
        )
    }

    fn learn_batch(&mut self, batch: &TransitionBatch) -> Result<LearnReport> {
        let batch = batch.to_device(self.device());
        let state_action_values =
            self.q_network
                .get_batch_action_value(&batch.state, &batch.action, &self.action_space)?;

        let next_state_values = tch::no_grad(|| {
            self.target_network
                .get_all_action_values(&batch.next_state, &self.action_space)
                .max_dim(1, false)
                .0
        });
        let not_done = 1.0 - batch.done.shallow_clone();
        let expected_state_action_values: Tensor =
            &batch.reward + next_state_values * not_done * self.config.discount_factor;

        let loss =
            state_action_values.mse_loss(&expected_state_action_values.detach(), Reduction::Mean);
        self.optimizer.backward_step(&loss);
        update_target_network(
            &mut self.target_var_store,
            &self.var_store,
            self.config.soft_update_tau,
        )?;

        let loss = loss.double_value(&[]);
        tracing::debug!(loss, "deep q-learning batch");
        Ok(report(loss))
    }

    fn training_rounds(&self) -> usize {
        self.config.training_rounds
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn reset(&mut self, action_space: &DiscreteActionSpace) {
        if action_space.n() != self.action_space.n() {
            tracing::warn!(
                expected = self.action_space.n(),
                actual = action_space.n(),
                "action space size changed, keeping the previous one"
            );
            return;
        }
        self.action_space = action_space.to_device(self.device());
    }
}
