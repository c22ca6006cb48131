use std::fmt;

use crate::error::Result;

pub mod fifo;
pub mod on_policy;
pub mod transition;

pub use fifo::FifoOffPolicyReplayBuffer;
pub use on_policy::OnPolicyEpisodicReplayBuffer;
pub use transition::{Transition, TransitionBatch};

pub trait ReplayBuffer: fmt::Display {
    fn push(&mut self, transition: Transition);

    fn sample(&mut self, batch_size: usize) -> Result<TransitionBatch>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}
