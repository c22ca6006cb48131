use std::fmt;

use crate::action_space::DiscreteActionSpace;
use crate::environment::{Action, ActionResult, Environment, ObservationSpace};
use crate::error::Result;

/// Counts steps. Every step ends the episode and pays the running count.
///
/// The count is never reset, while the observation space is
/// `Discrete { n: number_of_steps + 1 }`. After `number_of_steps` episodes
/// the observation leaves that space, and a one-hot or box adapter wrapping
/// this environment fails with `ObservationOutOfRange`.
pub struct FixedNumberOfStepsEnvironment {
    pub number_of_steps_so_far: usize,
    pub number_of_steps: usize,
    action_space: DiscreteActionSpace,
}

impl FixedNumberOfStepsEnvironment {
    pub const DEFAULT_NUMBER_OF_STEPS: usize = 100;

    /// Same as `new(DEFAULT_NUMBER_OF_STEPS)`.
    pub fn with_default_steps() -> Result<Self> {
        Self::new(Self::DEFAULT_NUMBER_OF_STEPS)
    }

    pub fn new(number_of_steps: usize) -> Result<Self> {
        Ok(Self {
            number_of_steps_so_far: 0,
            number_of_steps,
            action_space: DiscreteActionSpace::from_values(&[1.0, 0.0])?,
        })
    }
}

impl Environment for FixedNumberOfStepsEnvironment {
    type Observation = usize;

    fn reset(&mut self) -> Result<(usize, DiscreteActionSpace)> {
        Ok((self.number_of_steps_so_far, self.action_space.clone()))
    }

    fn step(&mut self, action: Action) -> Result<ActionResult<usize>> {
        self.action_space.check_index(action)?;
        self.number_of_steps_so_far += 1;
        Ok(ActionResult {
            observation: self.number_of_steps_so_far,
            reward: self.number_of_steps_so_far as f32,
            terminated: true,
            truncated: true,
            info: Default::default(),
        })
    }

    fn action_space(&self) -> &DiscreteActionSpace {
        &self.action_space
    }

    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::Discrete {
            n: self.number_of_steps + 1,
        }
    }

    fn render(&self) {
        tracing::info!(steps = self.number_of_steps_so_far, "{self}");
    }
}

impl fmt::Display for FixedNumberOfStepsEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FixedNumberOfStepsEnvironment")
    }
}
