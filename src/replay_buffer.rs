use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::{Device, Tensor};

use crate::error::{Error, Result};

/// A minibatch of transitions, one row per sample.
pub struct Batch {
    pub state: Tensor,
    pub action: Tensor,
    pub next_state: Tensor,
    pub reward: Tensor,
    pub not_done: Tensor,
}

/// Fixed-capacity circular store of `(s, a, s', r, not_done)` transitions.
///
/// Transitions live in flat row-major `f32` arrays that grow up to
/// `max_size` rows; after that the write pointer wraps and the oldest row is
/// overwritten.
pub struct ReplayBuffer {
    state_shape: Vec<usize>,
    state_len: usize,
    action_dim: usize,
    max_size: usize,
    ptr: usize,
    size: usize,

    state: Vec<f32>,
    action: Vec<f32>,
    next_state: Vec<f32>,
    reward: Vec<f32>,
    not_done: Vec<f32>,

    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(
        state_shape: &[usize],
        action_dim: usize,
        max_size: usize,
        seed: u64,
    ) -> Result<Self> {
        if max_size == 0 {
            return Err(Error::InvalidArgument(
                "replay buffer capacity must be at least 1".to_string(),
            ));
        }
        Ok(ReplayBuffer {
            state_shape: state_shape.to_vec(),
            state_len: state_shape.iter().product(),
            action_dim,
            max_size,
            ptr: 0,
            size: 0,
            state: Vec::new(),
            action: Vec::new(),
            next_state: Vec::new(),
            reward: Vec::new(),
            not_done: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn add(
        &mut self,
        state: &[f32],
        action: &[f32],
        next_state: &[f32],
        reward: f32,
        done: bool,
    ) -> Result<()> {
        check_len("state", self.state_len, state)?;
        check_len("action", self.action_dim, action)?;
        check_len("next_state", self.state_len, next_state)?;

        let not_done = if done { 0.0 } else { 1.0 };

        if self.size < self.max_size {
            self.state.extend_from_slice(state);
            self.action.extend_from_slice(action);
            self.next_state.extend_from_slice(next_state);
            self.reward.push(reward);
            self.not_done.push(not_done);
        } else {
            let s = self.ptr * self.state_len;
            let a = self.ptr * self.action_dim;
            self.state[s..s + self.state_len].copy_from_slice(state);
            self.action[a..a + self.action_dim].copy_from_slice(action);
            self.next_state[s..s + self.state_len].copy_from_slice(next_state);
            self.reward[self.ptr] = reward;
            self.not_done[self.ptr] = not_done;
        }

        self.ptr = (self.ptr + 1) % self.max_size;
        self.size = (self.size + 1).min(self.max_size);
        Ok(())
    }

    /// Draws `batch_size` transitions uniformly, with replacement.
    pub fn sample(&mut self, batch_size: usize, device: Device) -> Result<Batch> {
        if self.size == 0 {
            return Err(Error::EmptyBuffer);
        }

        let indices: Vec<usize> = (0..batch_size)
            .map(|_| self.rng.random_range(0..self.size))
            .collect();

        let mut state = Vec::with_capacity(batch_size * self.state_len);
        let mut next_state = Vec::with_capacity(batch_size * self.state_len);
        let mut action = Vec::with_capacity(batch_size * self.action_dim);
        let mut reward = Vec::with_capacity(batch_size);
        let mut not_done = Vec::with_capacity(batch_size);

        for &i in &indices {
            let s = i * self.state_len;
            let a = i * self.action_dim;
            state.extend_from_slice(&self.state[s..s + self.state_len]);
            next_state.extend_from_slice(&self.next_state[s..s + self.state_len]);
            action.extend_from_slice(&self.action[a..a + self.action_dim]);
            reward.push(self.reward[i]);
            not_done.push(self.not_done[i]);
        }

        let mut state_dims = vec![batch_size as i64];
        state_dims.extend(self.state_shape.iter().map(|&d| d as i64));
        let b = batch_size as i64;

        Ok(Batch {
            state: Tensor::from_slice(&state).view(state_dims.as_slice()).to_device(device),
            action: Tensor::from_slice(&action)
                .view([b, self.action_dim as i64])
                .to_device(device),
            next_state: Tensor::from_slice(&next_state)
                .view(state_dims.as_slice())
                .to_device(device),
            reward: Tensor::from_slice(&reward).view([b, 1]).to_device(device),
            not_done: Tensor::from_slice(&not_done).view([b, 1]).to_device(device),
        })
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn state_shape(&self) -> &[usize] {
        &self.state_shape
    }

    /// Next row to be written.
    pub fn position(&self) -> usize {
        self.ptr
    }
}

fn check_len(what: &'static str, expected: usize, values: &[f32]) -> Result<()> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            expected,
            actual: values.len(),
        })
    }
}
