use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tch::Device;

use crate::action_space::DiscreteActionSpace;
use crate::agent::LearningAgent;
use crate::error::{Result, RlError};
use crate::exploration::{
    EGreedyExploration, ExplorationModule, GreedyExploration, PropensityExploration,
    ThompsonSamplingExploration, UcbExploration,
};
use crate::policy_learners::{
    DeepBandit, DeepBanditConfig, DeepQLearning, DeepQLearningConfig, DisjointLinearBandit,
    DisjointLinearBanditConfig, PolicyGradient, PolicyGradientConfig, PolicyLearner,
};
use crate::replay_buffer::{FifoOffPolicyReplayBuffer, OnPolicyEpisodicReplayBuffer, ReplayBuffer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExplorationConfig {
    Greedy,
    EGreedy { epsilon: f64 },
    Propensity,
    Ucb { alpha: f64 },
    ThompsonSampling,
}

impl ExplorationConfig {
    pub fn build(&self, seed: Option<u64>) -> Result<Box<dyn ExplorationModule>> {
        let module: Box<dyn ExplorationModule> = match self {
            ExplorationConfig::Greedy => Box::new(GreedyExploration),
            ExplorationConfig::EGreedy { epsilon } => match seed {
                Some(seed) => Box::new(EGreedyExploration::with_seed(*epsilon, seed)?),
                None => Box::new(EGreedyExploration::new(*epsilon)?),
            },
            ExplorationConfig::Propensity => Box::new(PropensityExploration),
            ExplorationConfig::Ucb { alpha } => Box::new(UcbExploration::new(*alpha)),
            ExplorationConfig::ThompsonSampling => Box::new(ThompsonSamplingExploration),
        };
        Ok(module)
    }

    /// UCB and Thompson sampling read an uncertainty estimate that only the
    /// disjoint linear bandit provides.
    pub fn needs_uncertainty(&self) -> bool {
        matches!(
            self,
            ExplorationConfig::Ucb { .. } | ExplorationConfig::ThompsonSampling
        )
    }
}

/// Learner selection together with its hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "learner", rename_all = "snake_case")]
pub enum LearnerConfig {
    DeepBandit {
        exploration: ExplorationConfig,
        #[serde(default)]
        config: DeepBanditConfig,
    },
    DisjointLinearBandit {
        exploration: ExplorationConfig,
        #[serde(default)]
        config: DisjointLinearBanditConfig,
    },
    PolicyGradient {
        #[serde(default)]
        exploration: Option<ExplorationConfig>,
        #[serde(default)]
        config: PolicyGradientConfig,
    },
    DeepQLearning {
        #[serde(default)]
        exploration: Option<ExplorationConfig>,
        #[serde(default)]
        config: DeepQLearningConfig,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub learner: LearnerConfig,
    /// Capacity of the FIFO buffer used by off-policy learners.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_buffer_capacity() -> usize {
    10_000
}

impl LearnerConfig {
    fn name(&self) -> &'static str {
        match self {
            LearnerConfig::DeepBandit { .. } => "deep_bandit",
            LearnerConfig::DisjointLinearBandit { .. } => "disjoint_linear_bandit",
            LearnerConfig::PolicyGradient { .. } => "policy_gradient",
            LearnerConfig::DeepQLearning { .. } => "deep_q_learning",
        }
    }

    /// Rejects exploration modules the learner cannot feed.
    pub fn validate(&self) -> Result<()> {
        let exploration = match self {
            LearnerConfig::DisjointLinearBandit { .. } => None,
            LearnerConfig::DeepBandit { exploration, .. } => Some(exploration),
            LearnerConfig::PolicyGradient { exploration, .. }
            | LearnerConfig::DeepQLearning { exploration, .. } => exploration.as_ref(),
        };
        match exploration {
            Some(exploration) if exploration.needs_uncertainty() => Err(RlError::Unsupported(
                format!(
                    "{} has no uncertainty estimate for {exploration:?} exploration",
                    self.name()
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl AgentConfig {
    pub fn new(learner: LearnerConfig) -> Self {
        Self {
            learner,
            buffer_capacity: default_buffer_capacity(),
            seed: None,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Discount used for returns-to-go; `None` for learners that do not
    /// discount through the buffer.
    pub fn discount_factor(&self) -> Option<f64> {
        match &self.learner {
            LearnerConfig::PolicyGradient { config, .. } => Some(config.discount_factor),
            LearnerConfig::DeepQLearning { config, .. } => Some(config.discount_factor),
            _ => None,
        }
    }

    pub fn build_policy_learner(
        &self,
        state_dim: i64,
        action_space: DiscreteActionSpace,
        device: Device,
    ) -> Result<Box<dyn PolicyLearner>> {
        self.learner.validate()?;
        let feature_dim = state_dim + action_space.action_dim();
        let learner: Box<dyn PolicyLearner> = match &self.learner {
            LearnerConfig::DeepBandit { exploration, config } => Box::new(DeepBandit::new(
                feature_dim,
                action_space,
                exploration.build(self.seed)?,
                config.clone(),
                device,
            )?),
            LearnerConfig::DisjointLinearBandit {
                exploration,
                config,
            } => Box::new(DisjointLinearBandit::new(
                feature_dim,
                action_space,
                exploration.build(self.seed)?,
                config.clone(),
                device,
            )?),
            LearnerConfig::PolicyGradient {
                exploration,
                config,
            } => Box::new(PolicyGradient::new(
                state_dim,
                action_space,
                exploration.as_ref().map(|e| e.build(self.seed)).transpose()?,
                config.clone(),
                device,
            )?),
            LearnerConfig::DeepQLearning {
                exploration,
                config,
            } => Box::new(DeepQLearning::new(
                state_dim,
                action_space,
                exploration.as_ref().map(|e| e.build(self.seed)).transpose()?,
                config.clone(),
                device,
            )?),
        };
        Ok(learner)
    }

    pub fn build_replay_buffer(&self) -> Box<dyn ReplayBuffer> {
        match &self.learner {
            LearnerConfig::PolicyGradient { config, .. } => {
                Box::new(OnPolicyEpisodicReplayBuffer::new(config.discount_factor as f32))
            }
            _ => match self.seed {
                Some(seed) => Box::new(FifoOffPolicyReplayBuffer::with_seed(
                    self.buffer_capacity,
                    seed,
                )),
                None => Box::new(FifoOffPolicyReplayBuffer::new(self.buffer_capacity)),
            },
        }
    }

    /// Builds the learner and its buffer; seeds the tensor RNG when a seed is
    /// configured.
    pub fn build_agent(
        &self,
        state_dim: i64,
        action_space: DiscreteActionSpace,
        device: Device,
    ) -> Result<LearningAgent> {
        if let Some(seed) = self.seed {
            tch::manual_seed(seed as i64);
        }
        let policy_learner = self.build_policy_learner(state_dim, action_space, device)?;
        tracing::info!(config = ?self.learner, "built policy learner");
        Ok(LearningAgent::new(policy_learner, self.build_replay_buffer()))
    }
}
