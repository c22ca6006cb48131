use std::fmt;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tch::Tensor;

use crate::action_space::DiscreteActionSpace;
use crate::environment::{Action, ActionResult, Environment, ObservationSpace};
use crate::error::Result;
use crate::utils::ToTensor;

// 动力学参数
const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const POLE_HALF_LENGTH: f32 = 0.5;
const FORCE: f32 = 10.0;
const DT: f32 = 0.02;
const X_LIMIT: f32 = 2.4;

/// 简化版 CartPole 环境，状态维度为 [x, x_dot, theta, theta_dot]
pub struct CartPole {
    pub state: [f32; 4],
    pub step_limit: usize,
    pub step_count: usize,
    action_space: DiscreteActionSpace,
    rng: StdRng,
}

impl CartPole {
    pub fn new(seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            state: [0.0; 4],
            step_limit: 200,
            step_count: 0,
            action_space: DiscreteActionSpace::one_hot(2)?,
            rng,
        })
    }

    fn theta_limit() -> f32 {
        12.0_f32.to_radians()
    }

    fn is_failed(state: &[f32; 4]) -> bool {
        state[0].abs() > X_LIMIT || state[2].abs() > Self::theta_limit()
    }
}

impl Environment for CartPole {
    type Observation = Tensor;

    fn reset(&mut self) -> Result<(Tensor, DiscreteActionSpace)> {
        for value in self.state.iter_mut() {
            *value = self.rng.random_range(-0.05..0.05);
        }
        self.step_count = 0;
        Ok((self.state.to_tensor(), self.action_space.clone()))
    }

    fn step(&mut self, action: Action) -> Result<ActionResult<Tensor>> {
        self.action_space.check_index(action)?;
        let [x, x_dot, theta, theta_dot] = self.state;

        // 0: left, 1: right
        let force = if action == 1 { FORCE } else { -FORCE };

        let total_mass = CART_MASS + POLE_MASS;
        let costheta = theta.cos();
        let sintheta = theta.sin();
        let temp =
            (force + POLE_MASS * POLE_HALF_LENGTH * theta_dot.powi(2) * sintheta) / total_mass;
        let theta_acc = (GRAVITY * sintheta - costheta * temp)
            / (POLE_HALF_LENGTH * (4.0 / 3.0 - POLE_MASS * costheta.powi(2) / total_mass));
        let x_acc = temp - POLE_MASS * POLE_HALF_LENGTH * theta_acc * costheta / total_mass;

        self.state = [
            x + DT * x_dot,
            x_dot + DT * x_acc,
            theta + DT * theta_dot,
            theta_dot + DT * theta_acc,
        ];
        self.step_count += 1;

        let terminated = Self::is_failed(&self.state);
        let truncated = !terminated && self.step_count >= self.step_limit;

        Ok(ActionResult {
            observation: self.state.to_tensor(),
            reward: if terminated { 0.0 } else { 1.0 },
            terminated,
            truncated,
            info: Default::default(),
        })
    }

    fn action_space(&self) -> &DiscreteActionSpace {
        &self.action_space
    }

    fn observation_space(&self) -> ObservationSpace {
        let theta = Self::theta_limit() * 2.0;
        ObservationSpace::Box {
            low: vec![-X_LIMIT * 2.0, f32::MIN, -theta, f32::MIN],
            high: vec![X_LIMIT * 2.0, f32::MAX, theta, f32::MAX],
            shape: vec![4],
        }
    }

    fn render(&self) {
        tracing::info!(state = ?self.state, step = self.step_count, "cartpole");
    }
}

impl fmt::Display for CartPole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CartPole")
    }
}
