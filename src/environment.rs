use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action_space::DiscreteActionSpace;
use crate::error::Result;

/// Index into the environment's [`DiscreteActionSpace`].
pub type Action = i64;

pub struct ActionResult<O> {
    pub observation: O,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl<O> ActionResult<O> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }

    pub fn map_observation<P>(self, f: impl FnOnce(O) -> P) -> ActionResult<P> {
        ActionResult {
            observation: f(self.observation),
            reward: self.reward,
            terminated: self.terminated,
            truncated: self.truncated,
            info: self.info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationSpace {
    Discrete { n: usize },
    Box {
        low: Vec<f32>,
        high: Vec<f32>,
        shape: Vec<usize>,
    },
}

impl ObservationSpace {
    /// Flattened observation size once converted to a tensor.
    pub fn flat_dim(&self) -> usize {
        match self {
            ObservationSpace::Discrete { .. } => 1,
            ObservationSpace::Box { shape, .. } => shape.iter().product(),
        }
    }
}

pub trait Environment: fmt::Display {
    type Observation;

    fn reset(&mut self) -> Result<(Self::Observation, DiscreteActionSpace)>;

    fn step(&mut self, action: Action) -> Result<ActionResult<Self::Observation>>;

    fn action_space(&self) -> &DiscreteActionSpace;

    fn observation_space(&self) -> ObservationSpace;

    fn render(&self) {}
}
