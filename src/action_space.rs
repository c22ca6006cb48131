use std::fmt;

use tch::{Device, Kind, Tensor};

use crate::error::{Result, RlError};
use crate::utils::as_batch;

/// A finite set of actions, each described by an action vector.
/// Rows of `actions` are the vectors, so its shape is `(n, action_dim)`.
pub struct DiscreteActionSpace {
    actions: Tensor,
}

impl DiscreteActionSpace {
    pub fn new(vectors: &[Vec<f32>]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| RlError::Unsupported("empty action space".into()))?;
        let action_dim = first.len();
        let mut flat = Vec::with_capacity(vectors.len() * action_dim);
        for vector in vectors {
            if vector.len() != action_dim {
                return Err(RlError::DimensionMismatch {
                    expected: action_dim as i64,
                    actual: vector.len() as i64,
                });
            }
            flat.extend_from_slice(vector);
        }
        let actions = Tensor::from_slice(&flat).view([vectors.len() as i64, action_dim as i64]);
        Ok(Self { actions })
    }

    /// One-dimensional action vectors, e.g. `[1.0, 0.0]` for a boolean choice.
    pub fn from_values(values: &[f32]) -> Result<Self> {
        let vectors: Vec<Vec<f32>> = values.iter().map(|&v| vec![v]).collect();
        Self::new(&vectors)
    }

    pub fn one_hot(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(RlError::Unsupported("empty action space".into()));
        }
        Ok(Self {
            actions: Tensor::eye(n as i64, (Kind::Float, Device::Cpu)),
        })
    }

    pub fn to_device(&self, device: Device) -> Self {
        Self {
            actions: self.actions.to_device(device),
        }
    }

    pub fn n(&self) -> i64 {
        self.actions.size()[0]
    }

    pub fn action_dim(&self) -> i64 {
        self.actions.size()[1]
    }

    pub fn device(&self) -> Device {
        self.actions.device()
    }

    /// `(n, action_dim)` matrix of every action vector.
    pub fn actions(&self) -> &Tensor {
        &self.actions
    }

    pub fn get(&self, index: i64) -> Result<Tensor> {
        self.check_index(index)?;
        Ok(self.actions.get(index))
    }

    pub fn check_index(&self, index: i64) -> Result<()> {
        if index < 0 || index >= self.n() {
            return Err(RlError::InvalidAction {
                index,
                n: self.n(),
            });
        }
        Ok(())
    }

    /// Looks up action vectors for a `(batch,)` tensor of indices.
    pub fn action_features(&self, indices: &Tensor) -> Result<Tensor> {
        let indices = indices.to_kind(Kind::Int64).view([-1]);
        if indices.numel() > 0 {
            let lowest = indices.min().int64_value(&[]);
            let highest = indices.max().int64_value(&[]);
            self.check_index(lowest)?;
            self.check_index(highest)?;
        }
        Ok(self
            .actions
            .index_select(0, &indices.to_device(self.device())))
    }

    /// Pairs every state with every action:
    /// `(batch, state_dim)` -> `(batch, n, state_dim + action_dim)`.
    pub fn cat_state_tensor(&self, subjective_state: &Tensor) -> Tensor {
        let state = as_batch(subjective_state)
            .to_kind(Kind::Float)
            .to_device(self.device());
        let (batch_size, state_dim) = (state.size()[0], state.size()[1]);
        let n = self.n();
        let expanded_state = state.unsqueeze(1).expand([batch_size, n, state_dim], false);
        let expanded_action = self
            .actions
            .unsqueeze(0)
            .expand([batch_size, n, self.action_dim()], false);
        Tensor::cat(&[expanded_state, expanded_action], 2)
    }
}

impl Clone for DiscreteActionSpace {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.copy(),
        }
    }
}

impl fmt::Debug for DiscreteActionSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscreteActionSpace")
            .field("n", &self.n())
            .field("action_dim", &self.action_dim())
            .finish()
    }
}
