//! Adapters turning discrete observations into tensors, for learners that
//! expect `Box`-shaped inputs.

use std::fmt;

use tch::{Kind, Tensor};

use crate::action_space::DiscreteActionSpace;
use crate::environment::{Action, ActionResult, Environment, ObservationSpace};
use crate::error::{Result, RlError};

/// How a discrete observation becomes a tensor.
pub trait TensorObservation {
    fn make_observation_space(n: usize) -> ObservationSpace;

    fn compute_tensor_observation(observation: usize, n: usize) -> Result<Tensor>;

    fn short_description() -> &'static str;
}

/// Wraps an environment with discrete observations and converts each
/// observation using `M`.
pub struct BoxObservations<E, M> {
    pub base_environment: E,
    pub observation_space: ObservationSpace,
    n: usize,
    _mapping: std::marker::PhantomData<M>,
}

impl<E, M> BoxObservations<E, M>
where
    E: Environment<Observation = usize>,
    M: TensorObservation,
{
    pub fn new(base_environment: E) -> Result<Self> {
        let n = match base_environment.observation_space() {
            ObservationSpace::Discrete { n } => n,
            other => {
                return Err(RlError::Unsupported(format!(
                    "expected a discrete observation space, got {other:?}"
                )));
            }
        };
        Ok(Self {
            observation_space: M::make_observation_space(n),
            base_environment,
            n,
            _mapping: std::marker::PhantomData,
        })
    }

    pub fn compute_tensor_observation(&self, observation: usize) -> Result<Tensor> {
        if observation >= self.n {
            return Err(RlError::ObservationOutOfRange {
                observation: observation as i64,
                n: self.n as i64,
            });
        }
        M::compute_tensor_observation(observation, self.n)
    }
}

impl<E, M> Environment for BoxObservations<E, M>
where
    E: Environment<Observation = usize>,
    M: TensorObservation,
{
    type Observation = Tensor;

    fn reset(&mut self) -> Result<(Tensor, DiscreteActionSpace)> {
        let (observation, action_space) = self.base_environment.reset()?;
        Ok((self.compute_tensor_observation(observation)?, action_space))
    }

    fn step(&mut self, action: Action) -> Result<ActionResult<Tensor>> {
        let result = self.base_environment.step(action)?;
        let observation = self.compute_tensor_observation(result.observation)?;
        Ok(result.map_observation(|_| observation))
    }

    fn action_space(&self) -> &DiscreteActionSpace {
        self.base_environment.action_space()
    }

    fn observation_space(&self) -> ObservationSpace {
        self.observation_space.clone()
    }

    fn render(&self) {
        self.base_environment.render()
    }
}

impl<E: fmt::Display, M: TensorObservation> fmt::Display for BoxObservations<E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", M::short_description(), self.base_environment)
    }
}

/// Observation `k` becomes the length-1 tensor `[k]`.
pub struct FromDiscrete;

impl TensorObservation for FromDiscrete {
    fn make_observation_space(n: usize) -> ObservationSpace {
        ObservationSpace::Box {
            low: vec![0.0],
            high: vec![n.saturating_sub(1) as f32],
            shape: vec![1],
        }
    }

    fn compute_tensor_observation(observation: usize, _n: usize) -> Result<Tensor> {
        Ok(Tensor::from_slice(&[observation as f32]))
    }

    fn short_description() -> &'static str {
        "BoxObservationsFromDiscrete"
    }
}

/// Observation `k` becomes a one-hot vector of length `n`.
pub struct OneHotFromDiscrete;

impl TensorObservation for OneHotFromDiscrete {
    fn make_observation_space(n: usize) -> ObservationSpace {
        ObservationSpace::Box {
            low: vec![0.0; n],
            high: vec![1.0; n],
            shape: vec![n],
        }
    }

    fn compute_tensor_observation(observation: usize, n: usize) -> Result<Tensor> {
        Ok(Tensor::from_slice(&[observation as i64])
            .one_hot(n as i64)
            .view([-1])
            .to_kind(Kind::Float))
    }

    fn short_description() -> &'static str {
        "One-hot observations"
    }
}

pub type BoxObservationsFromDiscrete<E> = BoxObservations<E, FromDiscrete>;
pub type OneHotObservationsFromDiscrete<E> = BoxObservations<E, OneHotFromDiscrete>;
