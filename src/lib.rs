// detailed implementation
pub mod action_space;
pub mod environments;
pub mod exploration;
pub mod linear_regression;
pub mod networks;
pub mod policy_learners;
pub mod replay_buffer;
pub mod utils;

// Traits
pub mod agent;
pub mod environment;

pub mod config;
pub mod error;
pub mod logging;

pub use action_space::DiscreteActionSpace;
pub use agent::{Agent, LearningAgent};
pub use config::{AgentConfig, ExplorationConfig, LearnerConfig};
pub use environment::{Action, ActionResult, Environment, ObservationSpace};
pub use error::{Result, RlError};
