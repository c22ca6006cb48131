use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use tch::{Kind, Tensor};

use crate::action_space::DiscreteActionSpace;
use crate::environment::{Action, ActionResult, Environment, ObservationSpace};
use crate::error::{Result, RlError};

/// Contextual bandit whose expected reward is linear in `[context, action]`.
/// Every step is a one-step episode; a fresh context is drawn afterwards.
pub struct LinearSyntheticBandit {
    action_space: DiscreteActionSpace,
    context_dim: usize,
    theta: Tensor,
    noise_std: f32,
    context: Vec<f32>,
    rng: StdRng,
}

impl LinearSyntheticBandit {
    pub fn new(
        context_dim: usize,
        action_space: DiscreteActionSpace,
        theta: Vec<f32>,
        noise_std: f32,
        seed: u64,
    ) -> Result<Self> {
        let expected = context_dim as i64 + action_space.action_dim();
        if theta.len() as i64 != expected {
            return Err(RlError::DimensionMismatch {
                expected,
                actual: theta.len() as i64,
            });
        }
        let mut env = Self {
            action_space,
            context_dim,
            theta: Tensor::from_slice(&theta),
            noise_std,
            context: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        };
        env.draw_context();
        Ok(env)
    }

    fn draw_context(&mut self) {
        self.context = (0..self.context_dim)
            .map(|_| self.rng.random::<f32>())
            .collect();
    }

    /// Noise-free reward of every action for the current context.
    pub fn expected_rewards(&self) -> Tensor {
        let features = self
            .action_space
            .cat_state_tensor(&Tensor::from_slice(&self.context))
            .squeeze_dim(0);
        features.matmul(&self.theta.to_kind(Kind::Float))
    }

    pub fn best_action(&self) -> Action {
        self.expected_rewards().argmax(0, false).int64_value(&[])
    }
}

impl Environment for LinearSyntheticBandit {
    type Observation = Tensor;

    fn reset(&mut self) -> Result<(Tensor, DiscreteActionSpace)> {
        Ok((Tensor::from_slice(&self.context), self.action_space.clone()))
    }

    fn step(&mut self, action: Action) -> Result<ActionResult<Tensor>> {
        self.action_space.check_index(action)?;
        let mean = self.expected_rewards().double_value(&[action]) as f32;
        // Box-Muller
        let u1: f32 = self.rng.random_range(f32::EPSILON..1.0);
        let u2: f32 = self.rng.random();
        let noise = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        self.draw_context();
        Ok(ActionResult {
            observation: Tensor::from_slice(&self.context),
            reward: mean + self.noise_std * noise,
            terminated: true,
            truncated: false,
            info: Default::default(),
        })
    }

    fn action_space(&self) -> &DiscreteActionSpace {
        &self.action_space
    }

    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::Box {
            low: vec![0.0; self.context_dim],
            high: vec![1.0; self.context_dim],
            shape: vec![self.context_dim],
        }
    }
}

impl fmt::Display for LinearSyntheticBandit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LinearSyntheticBandit(context_dim={}, actions={})",
            self.context_dim,
            self.action_space.n()
        )
    }
}
