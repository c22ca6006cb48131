use tch::nn::{self, Module};
use tch::{Device, Reduction, Tensor};

use super::init::InitFn;
use super::value_networks::VanillaValueNetwork;
use super::adamw;
use crate::error::Result;

/// Two independently initialised Q-networks over `[state, action]`, trained
/// towards a shared target. Consumers typically take the minimum of both
/// estimates.
pub struct TwinCritic {
    var_store: nn::VarStore,
    critic_1: VanillaValueNetwork,
    critic_2: VanillaValueNetwork,
    optimizer: nn::Optimizer,
}

impl TwinCritic {
    pub fn new(
        state_dim: i64,
        action_dim: i64,
        hidden_dims: &[i64],
        learning_rate: f64,
        init_fn: InitFn,
        device: Device,
    ) -> Result<Self> {
        let var_store = nn::VarStore::new(device);
        let root = var_store.root();
        let input_dim = state_dim + action_dim;
        let critic_1 = VanillaValueNetwork::new(&(&root / "critic_1"), input_dim, hidden_dims, 1)?;
        let critic_2 = VanillaValueNetwork::new(&(&root / "critic_2"), input_dim, hidden_dims, 1)?;
        init_fn(&var_store);
        let optimizer = adamw(&var_store, learning_rate)?;
        Ok(Self {
            var_store,
            critic_1,
            critic_2,
            optimizer,
        })
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.var_store
    }

    /// `(q1, q2)`, each `(batch,)`.
    pub fn get_twin_critic_values(
        &self,
        state_batch: &Tensor,
        action_batch: &Tensor,
    ) -> (Tensor, Tensor) {
        let xs = Tensor::cat(&[state_batch, action_batch], 1);
        (
            self.critic_1.forward(&xs).view([-1]),
            self.critic_2.forward(&xs).view([-1]),
        )
    }

    /// One optimizer step on the summed MSE of both critics; returns the loss.
    pub fn optimize_twin_critics_towards_target(
        &mut self,
        state_batch: &Tensor,
        action_batch: &Tensor,
        expected_target: &Tensor,
    ) -> Result<f64> {
        let target = expected_target.detach().view([-1]);
        let (q1, q2) = self.get_twin_critic_values(state_batch, action_batch);
        let loss = q1.mse_loss(&target, Reduction::Mean) + q2.mse_loss(&target, Reduction::Mean);
        self.optimizer.backward_step(&loss);
        let loss = loss.double_value(&[]);
        tracing::debug!(loss, "twin critic step");
        Ok(loss)
    }
}
