use std::collections::VecDeque;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use super::transition::{Transition, TransitionBatch};
use super::ReplayBuffer;
use crate::error::{Result, RlError};

/// Bounded FIFO storage for off-policy learners. The oldest transition is
/// evicted once `capacity` is reached.
pub struct FifoOffPolicyReplayBuffer {
    memory: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}

impl FifoOffPolicyReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            memory: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            rng,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.memory.iter()
    }
}

impl ReplayBuffer for FifoOffPolicyReplayBuffer {
    fn push(&mut self, transition: Transition) {
        if self.memory.len() >= self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(transition);
    }

    fn sample(&mut self, batch_size: usize) -> Result<TransitionBatch> {
        if batch_size == 0 || batch_size > self.memory.len() {
            return Err(RlError::InsufficientSamples {
                requested: batch_size,
                available: self.memory.len(),
            });
        }
        let minibatch = index::sample(&mut self.rng, self.memory.len(), batch_size)
            .into_iter()
            .map(|i| &self.memory[i]);
        Ok(TransitionBatch::from_transitions(minibatch))
    }

    fn len(&self) -> usize {
        self.memory.len()
    }

    fn clear(&mut self) {
        self.memory.clear();
    }
}

impl fmt::Display for FifoOffPolicyReplayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FifoOffPolicyReplayBuffer(capacity={})", self.capacity)
    }
}
