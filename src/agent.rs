use std::path::{Path, PathBuf};

use tch::{Device, Tensor};

use crate::action_space::DiscreteActionSpace;
use crate::environment::{Action, ActionResult, Environment};
use crate::error::{Result, RlError};
use crate::policy_learners::{LearnReport, PolicyLearner};
use crate::replay_buffer::{ReplayBuffer, Transition};
use crate::utils::plot_rewards;

pub trait Agent<E: Environment> {
    /// Runs `num_episodes` training episodes and returns the total reward of
    /// each one.
    fn train(&mut self, env: &mut E, num_episodes: usize, if_plot: bool) -> Result<Vec<f32>>;

    // 训练一个episode，返回总奖励
    fn train_episode(&mut self, env: &mut E) -> Result<f32>;
}

/// Couples a policy learner with the replay buffer that feeds it and keeps
/// track of the most recent observation and action.
pub struct LearningAgent {
    policy_learner: Box<dyn PolicyLearner>,
    replay_buffer: Box<dyn ReplayBuffer>,
    action_space: Option<DiscreteActionSpace>,
    observation: Option<Tensor>,
    action: Option<Action>,
    plot_path: PathBuf,
}

impl LearningAgent {
    pub fn new(
        policy_learner: Box<dyn PolicyLearner>,
        replay_buffer: Box<dyn ReplayBuffer>,
    ) -> Self {
        Self {
            policy_learner,
            replay_buffer,
            action_space: None,
            observation: None,
            action: None,
            plot_path: PathBuf::from("training_rewards.png"),
        }
    }

    /// Where `train(.., if_plot = true)` writes the reward curve.
    pub fn with_plot_path(mut self, path: impl AsRef<Path>) -> Self {
        self.plot_path = path.as_ref().to_path_buf();
        self
    }

    pub fn policy_learner(&self) -> &dyn PolicyLearner {
        self.policy_learner.as_ref()
    }

    pub fn replay_buffer(&self) -> &dyn ReplayBuffer {
        self.replay_buffer.as_ref()
    }

    /// Starts a new episode from `observation`.
    pub fn reset(&mut self, observation: Tensor, action_space: DiscreteActionSpace) {
        self.policy_learner.reset(&action_space);
        self.observation = Some(observation);
        self.action_space = Some(action_space);
        self.action = None;
    }

    pub fn act(&mut self, exploit: bool) -> Result<Action> {
        let (Some(observation), Some(action_space)) = (&self.observation, &self.action_space) else {
            return Err(RlError::Unsupported("act called before reset".into()));
        };
        let action = self
            .policy_learner
            .act(observation, action_space, exploit)?
            .to_device(Device::Cpu)
            .view([-1])
            .int64_value(&[0]);
        action_space.check_index(action)?;
        self.action = Some(action);
        Ok(action)
    }

    /// Records the outcome of the last action in the replay buffer.
    pub fn observe(&mut self, action_result: ActionResult<Tensor>) -> Result<()> {
        let (Some(observation), Some(action)) = (&self.observation, self.action) else {
            return Err(RlError::Unsupported("observe called without a preceding act".into()));
        };
        let done = action_result.done();
        self.replay_buffer.push(Transition::new(
            observation,
            action,
            action_result.reward,
            &action_result.observation,
            done,
        ));
        self.action = None;
        self.observation = Some(action_result.observation);
        Ok(())
    }

    /// Lets the learner train on the buffer. Completed on-policy episodes are
    /// discarded after every learn call, even when `training_rounds` is 0.
    pub fn learn(&mut self) -> Result<Vec<LearnReport>> {
        let reports = self.policy_learner.learn(self.replay_buffer.as_mut())?;
        if self.policy_learner.on_policy() && self.replay_buffer.len() > 0 {
            self.replay_buffer.clear();
        }
        Ok(reports)
    }

    /// Plays one greedy episode without storing transitions or learning.
    pub fn evaluate<E>(&mut self, env: &mut E) -> Result<f32>
    where
        E: Environment<Observation = Tensor>,
    {
        let (observation, action_space) = env.reset()?;
        self.reset(observation, action_space);
        let mut total_reward = 0.0;
        loop {
            let action = self.act(true)?;
            let action_result = env.step(action)?;
            total_reward += action_result.reward;
            if action_result.done() {
                break;
            }
            self.observation = Some(action_result.observation);
        }
        Ok(total_reward)
    }
}

impl<E> Agent<E> for LearningAgent
where
    E: Environment<Observation = Tensor>,
{
    fn train(&mut self, env: &mut E, num_episodes: usize, if_plot: bool) -> Result<Vec<f32>> {
        let mut all_rewards: Vec<f32> = Vec::with_capacity(num_episodes);

        for episode in 0..num_episodes {
            let reward = self.train_episode(env)?;
            tracing::info!(episode, reward, env = %env, "episode finished");
            all_rewards.push(reward);
        }

        if if_plot {
            plot_rewards(&all_rewards, &self.plot_path, "Training Reward")?;
        }
        Ok(all_rewards)
    }

    fn train_episode(&mut self, env: &mut E) -> Result<f32> {
        let (observation, action_space) = env.reset()?;
        self.reset(observation, action_space);
        let mut total_reward = 0.0;

        loop {
            let action = self.act(false)?;
            let action_result = env.step(action)?;
            total_reward += action_result.reward;
            let done = action_result.done();
            self.observe(action_result)?;

            if !self.policy_learner.on_policy() {
                self.learn()?;
            }
            if done {
                break;
            }
        }

        if self.policy_learner.on_policy() {
            self.learn()?;
        }
        Ok(total_reward)
    }
}
