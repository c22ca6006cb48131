pub mod cartpole;
pub mod fixed_steps;
pub mod linear_bandit;
pub mod observation_adapters;

pub use cartpole::CartPole;
pub use fixed_steps::FixedNumberOfStepsEnvironment;
pub use linear_bandit::LinearSyntheticBandit;
pub use observation_adapters::{
    BoxObservations, BoxObservationsFromDiscrete, OneHotObservationsFromDiscrete,
    TensorObservation,
};
