//! Exploration modules turn value estimates into chosen actions.
//!
//! Every module receives `values` for a batch of states, `(batch, n)`, and
//! returns `(batch,)` int64 action indices.

use tch::{Kind, Tensor};

use crate::action_space::DiscreteActionSpace;
use crate::error::{Result, RlError};
use crate::linear_regression::UncertaintyModel;

pub mod egreedy;
pub mod greedy;
pub mod propensity;
pub mod thompson;
pub mod ucb;

pub use egreedy::EGreedyExploration;
pub use greedy::GreedyExploration;
pub use propensity::PropensityExploration;
pub use thompson::ThompsonSamplingExploration;
pub use ucb::UcbExploration;

pub struct ExplorationContext<'a> {
    /// State features; for per-action models this is already
    /// `(batch, n, d)` with every action attached.
    pub subjective_state: &'a Tensor,
    pub action_space: &'a DiscreteActionSpace,
    pub values: &'a Tensor,
    pub exploit_action: Option<&'a Tensor>,
    pub representation: Option<&'a dyn UncertaintyModel>,
}

impl<'a> ExplorationContext<'a> {
    pub fn new(
        subjective_state: &'a Tensor,
        action_space: &'a DiscreteActionSpace,
        values: &'a Tensor,
    ) -> Self {
        Self {
            subjective_state,
            action_space,
            values,
            exploit_action: None,
            representation: None,
        }
    }

    pub fn with_exploit_action(mut self, exploit_action: &'a Tensor) -> Self {
        self.exploit_action = Some(exploit_action);
        self
    }

    pub fn with_representation(mut self, representation: &'a dyn UncertaintyModel) -> Self {
        self.representation = Some(representation);
        self
    }

    /// `values` as `(batch, n)`.
    pub fn batched_values(&self) -> Result<Tensor> {
        let n = self.action_space.n();
        if self.values.numel() as i64 % n != 0 {
            return Err(RlError::DimensionMismatch {
                expected: n,
                actual: self.values.numel() as i64,
            });
        }
        Ok(self.values.view([-1, n]).to_kind(Kind::Float))
    }

    /// `exploit_action` if given, otherwise the argmax of `values`.
    pub fn greedy_action(&self) -> Result<Tensor> {
        match self.exploit_action {
            Some(action) => Ok(action.to_kind(Kind::Int64).view([-1])),
            None => Ok(argmax(&self.batched_values()?)),
        }
    }
}

/// Row-wise argmax; ties go to the lowest index.
pub fn argmax(values: &Tensor) -> Tensor {
    values.argmax(-1, false).to_kind(Kind::Int64)
}

pub trait ExplorationModule {
    fn act(&mut self, context: ExplorationContext<'_>) -> Result<Tensor>;

    fn reset(&mut self) {}
}
