use std::path::Path;

use tch::Device;

use crate::algorithms::td3::{Td3Agent, Td3Config};
use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::replay_buffer::ReplayBuffer;

/// Losses of one gradient update.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainStats {
    pub critic_loss: f64,
    /// Only set on iterations where the actor was updated.
    pub actor_loss: Option<f64>,
}

pub trait Agent: Policy {
    // 从经验回放中采样一个batch并更新网络
    fn train(&mut self, buffer: &mut ReplayBuffer, batch_size: usize) -> Result<TrainStats>;

    fn save(&self, dir: &Path, name: &str) -> Result<()>;

    /// Returns `false` and leaves the agent untouched when no checkpoint
    /// called `name` exists under `dir`.
    fn load(&mut self, dir: &Path, name: &str) -> Result<bool>;

    /// Gradient updates performed so far.
    fn total_iterations(&self) -> usize;
}

/// Builds the agent registered under `policy`.
pub fn make(policy: &str, config: Td3Config, device: Device) -> Result<Box<dyn Agent>> {
    match policy {
        "TD3" => Ok(Box::new(Td3Agent::new(config, device)?)),
        other => Err(Error::UnsupportedPolicy(other.to_string())),
    }
}
