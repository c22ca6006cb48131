use tch::nn::{self, Module, ModuleT};
use tch::{Kind, Tensor};

use super::init::xavier_normal;
use crate::action_space::DiscreteActionSpace;
use crate::error::{Result, RlError};
use crate::utils::as_batch;

/// A Q-network over concatenated `[state, action]` features.
pub trait ValueNetwork: ModuleT {
    /// Q-values of the taken actions, `(batch,)`.
    ///
    /// `action_batch` holds action indices into `action_space`.
    fn get_batch_action_value(
        &self,
        state_batch: &Tensor,
        action_batch: &Tensor,
        action_space: &DiscreteActionSpace,
    ) -> Result<Tensor>;

    /// Q-values of every action, `(batch, n)`.
    fn get_all_action_values(
        &self,
        state_batch: &Tensor,
        action_space: &DiscreteActionSpace,
    ) -> Tensor {
        let features = action_space.cat_state_tensor(state_batch);
        let batch_size = features.size()[0];
        self.forward_t(&features, false).view([batch_size, action_space.n()])
    }
}

fn check_hidden_dims(hidden_dims: &[i64]) -> Result<()> {
    if hidden_dims.is_empty() {
        return Err(RlError::Unsupported(
            "value network needs at least one hidden layer".into(),
        ));
    }
    Ok(())
}

#[derive(Debug)]
pub struct VanillaValueNetwork {
    fc1: nn::Linear,
    hiddens: nn::Sequential,
    fc2: nn::Linear,
}

impl VanillaValueNetwork {
    pub fn new(
        path: &nn::Path,
        input_dim: i64,
        hidden_dims: &[i64],
        output_dim: i64,
    ) -> Result<Self> {
        check_hidden_dims(hidden_dims)?;
        let fc1 = nn::linear(path / "fc1", input_dim, hidden_dims[0], Default::default());
        let mut hiddens = nn::seq();
        for (i, pair) in hidden_dims.windows(2).enumerate() {
            hiddens = hiddens
                .add(nn::linear(path / format!("hidden_{i}"), pair[0], pair[1], Default::default()))
                .add_fn(|xs| xs.relu());
        }
        let last_hidden = hidden_dims[hidden_dims.len() - 1];
        let fc2 = nn::linear(path / "fc2", last_hidden, output_dim, Default::default());
        Ok(Self { fc1, hiddens, fc2 })
    }

    pub fn xavier_init(&self) {
        xavier_normal(&self.fc1.ws);
        xavier_normal(&self.fc2.ws);
    }
}

impl Module for VanillaValueNetwork {
    fn forward(&self, xs: &Tensor) -> Tensor {
        let value = self.fc1.forward(xs).relu();
        let value = self.hiddens.forward(&value);
        self.fc2.forward(&value)
    }
}

impl ValueNetwork for VanillaValueNetwork {
    fn get_batch_action_value(
        &self,
        state_batch: &Tensor,
        action_batch: &Tensor,
        action_space: &DiscreteActionSpace,
    ) -> Result<Tensor> {
        let action_features = action_space.action_features(action_batch)?;
        let xs = Tensor::cat(&[state_batch.shallow_clone(), action_features], 1);
        Ok(self.forward(&xs).view([-1]))
    }
}

/// Dueling architecture:
///
/// ```text
/// state -> feature_arch -> value_arch -> V(s) ----------------------+-> Q(s, a)
///                |                                                  |
/// action ----- concat -> advantage_arch -> A(s, a) - mean_a A(s, .) +
/// ```
///
/// Inputs are `(batch, n_actions, state_dim + action_dim)`; the advantage
/// mean runs over the action axis.
#[derive(Debug)]
pub struct DuelingValueNetwork {
    state_dim: i64,
    action_dim: i64,
    feature_arch: VanillaValueNetwork,
    value_arch: VanillaValueNetwork,
    advantage_arch: VanillaValueNetwork,
}

impl DuelingValueNetwork {
    pub fn new(
        path: &nn::Path,
        state_dim: i64,
        action_dim: i64,
        hidden_dims: &[i64],
        output_dim: i64,
        value_hidden_dims: Option<&[i64]>,
        advantage_hidden_dims: Option<&[i64]>,
    ) -> Result<Self> {
        let default_hidden = [(state_dim / 2).max(1)];
        let feature_arch =
            VanillaValueNetwork::new(&(path / "feature_arch"), state_dim, hidden_dims, state_dim)?;
        let value_arch = VanillaValueNetwork::new(
            &(path / "value_arch"),
            state_dim,
            value_hidden_dims.unwrap_or(&default_hidden),
            output_dim,
        )?;
        let advantage_arch = VanillaValueNetwork::new(
            &(path / "advantage_arch"),
            state_dim + action_dim,
            advantage_hidden_dims.unwrap_or(&default_hidden),
            output_dim,
        )?;
        Ok(Self {
            state_dim,
            action_dim,
            feature_arch,
            value_arch,
            advantage_arch,
        })
    }
}

impl Module for DuelingValueNetwork {
    fn forward(&self, xs: &Tensor) -> Tensor {
        let state_feature = xs.narrow(-1, 0, self.state_dim);
        let action_feature = xs.narrow(-1, self.state_dim, self.action_dim);

        let processed_state_feature = self.feature_arch.forward(&state_feature).relu();
        let value = self.value_arch.forward(&processed_state_feature);

        let feature_action = Tensor::cat(&[processed_state_feature, action_feature], -1);
        let advantage = self.advantage_arch.forward(&feature_action);
        // -2 is the action axis
        let advantage_mean = advantage.mean_dim(Some(&[-2i64][..]), true, Kind::Float);
        value + (advantage - advantage_mean)
    }
}

impl ValueNetwork for DuelingValueNetwork {
    fn get_batch_action_value(
        &self,
        state_batch: &Tensor,
        action_batch: &Tensor,
        action_space: &DiscreteActionSpace,
    ) -> Result<Tensor> {
        let state_batch = as_batch(state_batch);
        let expected = self.state_dim + self.action_dim;
        let actual = state_batch.size()[1] + action_space.action_dim();
        if expected != actual {
            return Err(RlError::DimensionMismatch { expected, actual });
        }
        // values of a single state with every action: (batch, n, 1)
        let values_multi_actions = self.forward(&action_space.cat_state_tensor(&state_batch));
        let action_idx = action_batch
            .to_kind(Kind::Int64)
            .to_device(values_multi_actions.device())
            .view([-1, 1, 1]);
        Ok(values_multi_actions.gather(1, &action_idx, false).view([-1]))
    }
}
