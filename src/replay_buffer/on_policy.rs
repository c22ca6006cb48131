use std::fmt;

use super::transition::{Transition, TransitionBatch};
use super::ReplayBuffer;
use crate::error::{Result, RlError};

/// Episodic storage for on-policy learners.
///
/// Transitions of the running episode are held back until the episode ends;
/// their rewards are then replaced by the discounted return-to-go
/// `G_t = r_t + gamma * G_{t+1}`.
pub struct OnPolicyEpisodicReplayBuffer {
    discount_factor: f32,
    current_episode: Vec<Transition>,
    completed: Vec<Transition>,
}

impl OnPolicyEpisodicReplayBuffer {
    pub fn new(discount_factor: f32) -> Self {
        Self {
            discount_factor,
            current_episode: Vec::new(),
            completed: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.current_episode.len()
    }

    fn close_episode(&mut self) {
        let mut running_return = 0.0;
        for transition in self.current_episode.iter_mut().rev() {
            running_return = transition.reward + self.discount_factor * running_return;
            transition.reward = running_return;
        }
        self.completed.append(&mut self.current_episode);
    }
}

impl ReplayBuffer for OnPolicyEpisodicReplayBuffer {
    fn push(&mut self, transition: Transition) {
        let done = transition.done;
        self.current_episode.push(transition);
        if done {
            self.close_episode();
        }
    }

    /// Returns up to `batch_size` completed transitions in insertion order.
    fn sample(&mut self, batch_size: usize) -> Result<TransitionBatch> {
        if self.completed.is_empty() || batch_size == 0 {
            return Err(RlError::InsufficientSamples {
                requested: batch_size,
                available: self.completed.len(),
            });
        }
        let take = batch_size.min(self.completed.len());
        Ok(TransitionBatch::from_transitions(&self.completed[..take]))
    }

    fn len(&self) -> usize {
        self.completed.len()
    }

    fn clear(&mut self) {
        self.completed.clear();
        self.current_episode.clear();
    }
}

impl fmt::Display for OnPolicyEpisodicReplayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OnPolicyEpisodicReplayBuffer(discount_factor={})",
            self.discount_factor
        )
    }
}
