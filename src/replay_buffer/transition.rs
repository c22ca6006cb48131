use tch::{Device, Kind, Tensor};

use crate::environment::Action;
use crate::utils::as_batch;

pub struct Transition {
    pub state: Tensor,
    pub action: Action,
    pub reward: f32,
    pub next_state: Tensor,
    pub done: bool,
    pub weight: Option<f32>,
}

impl Transition {
    pub fn new(
        state: &Tensor,
        action: Action,
        reward: f32,
        next_state: &Tensor,
        done: bool,
    ) -> Self {
        Self {
            state: state.detach().to_kind(Kind::Float).view([-1]),
            action,
            reward,
            next_state: next_state.detach().to_kind(Kind::Float).view([-1]),
            done,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }
}

impl Clone for Transition {
    fn clone(&self) -> Self {
        Self {
            state: self.state.shallow_clone(),
            action: self.action,
            reward: self.reward,
            next_state: self.next_state.shallow_clone(),
            done: self.done,
            weight: self.weight,
        }
    }
}

/// Column-wise batch of transitions.
///
/// `action` holds action indices `(batch,)` as int64; learners turn them
/// into action vectors or one-hot encodings through the action space.
pub struct TransitionBatch {
    pub state: Tensor,
    pub action: Tensor,
    pub reward: Tensor,
    pub next_state: Tensor,
    pub done: Tensor,
    pub weight: Option<Tensor>,
}

impl TransitionBatch {
    pub fn from_transitions<'a>(transitions: impl IntoIterator<Item = &'a Transition>) -> Self {
        let transitions: Vec<&Transition> = transitions.into_iter().collect();
        let states: Vec<Tensor> = transitions.iter().map(|t| t.state.shallow_clone()).collect();
        let next_states: Vec<Tensor> = transitions
            .iter()
            .map(|t| t.next_state.shallow_clone())
            .collect();
        let actions: Vec<i64> = transitions.iter().map(|t| t.action).collect();
        let rewards: Vec<f32> = transitions.iter().map(|t| t.reward).collect();
        let dones: Vec<f32> = transitions
            .iter()
            .map(|t| if t.done { 1.0 } else { 0.0 })
            .collect();
        let weights: Option<Vec<f32>> = transitions.iter().map(|t| t.weight).collect();

        Self {
            state: Tensor::stack(&states, 0),
            action: Tensor::from_slice(&actions),
            reward: Tensor::from_slice(&rewards),
            next_state: Tensor::stack(&next_states, 0),
            done: Tensor::from_slice(&dones),
            weight: weights.map(|w| Tensor::from_slice(&w)),
        }
    }

    /// Builds a batch straight from tensors, e.g. logged bandit data.
    pub fn from_tensors(state: &Tensor, action: &Tensor, reward: &Tensor) -> Self {
        let state = as_batch(state).to_kind(Kind::Float);
        let batch_size = state.size()[0];
        Self {
            next_state: state.zeros_like(),
            done: Tensor::ones([batch_size], (Kind::Float, state.device())),
            state,
            action: action.to_kind(Kind::Int64).view([-1]),
            reward: reward.to_kind(Kind::Float).view([-1]),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: &Tensor) -> Self {
        self.weight = Some(weight.to_kind(Kind::Float).view([-1]));
        self
    }

    pub fn batch_size(&self) -> i64 {
        self.state.size()[0]
    }

    pub fn to_device(&self, device: Device) -> Self {
        Self {
            state: self.state.to_device(device),
            action: self.action.to_device(device),
            reward: self.reward.to_device(device),
            next_state: self.next_state.to_device(device),
            done: self.done.to_device(device),
            weight: self.weight.as_ref().map(|w| w.to_device(device)),
        }
    }
}
