//! Twin Delayed Deep Deterministic Policy Gradient (TD3)
//!
//! Off-policy actor-critic for continuous actions. On top of DDPG it adds:
//! 1. Twin critics, the TD target uses the smaller of the two target Q-values
//! 2. Delayed policy updates, the actor and all targets move every `policy_freq` critic updates
//! 3. Target policy smoothing, clipped Gaussian noise on the target action
//!
//! Reference: "Addressing Function Approximation Error in Actor-Critic Methods"
//! (Fujimoto et al., 2018)

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tch::nn::{Module, OptimizerConfig};
use tch::{Device, Kind, Reduction, Tensor, nn};

use crate::agent::{Agent, TrainStats};
use crate::error::{Error, Result};
use crate::networks::{Actor, Critic};
use crate::policy::Policy;
use crate::replay_buffer::ReplayBuffer;
use crate::utils::{ToTensor, soft_update};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Td3Config {
    pub state_shape: Vec<usize>,
    pub action_dim: usize,
    pub max_action: f64,
    /// Discount factor γ
    pub discount: f64,
    /// Target update rate τ
    pub tau: f64,
    /// Std of the smoothing noise on target actions, in action units
    pub policy_noise: f64,
    /// Smoothing noise is clipped to `[-noise_clip, noise_clip]`
    pub noise_clip: f64,
    /// Update the actor and the targets every `policy_freq` critic updates
    pub policy_freq: usize,
    /// Encode image observations with a CNN
    pub cnn: bool,
    pub actor_lr: f64,
    pub critic_lr: f64,
}

impl Td3Config {
    /// Paper defaults, with the smoothing noise scaled by `max_action`.
    pub fn new(state_shape: Vec<usize>, action_dim: usize, max_action: f64) -> Self {
        Td3Config {
            state_shape,
            action_dim,
            max_action,
            discount: 0.99,
            tau: 0.005,
            policy_noise: 0.2 * max_action,
            noise_clip: 0.5 * max_action,
            policy_freq: 2,
            cnn: false,
            actor_lr: 3e-4,
            critic_lr: 3e-4,
        }
    }

    pub fn image_obs(&self) -> bool {
        self.state_shape.len() > 1
    }

    fn state_len(&self) -> usize {
        self.state_shape.iter().product()
    }
}

#[derive(Serialize, Deserialize)]
struct Checkpoint {
    config: Td3Config,
    total_it: usize,
}

pub struct Td3Agent {
    config: Td3Config,
    device: Device,

    actor_vs: nn::VarStore,
    actor: Actor,
    actor_target_vs: nn::VarStore,
    actor_target: Actor,
    actor_opt: nn::Optimizer,

    critic_vs: nn::VarStore,
    critic: Critic,
    critic_target_vs: nn::VarStore,
    critic_target: Critic,
    critic_opt: nn::Optimizer,

    total_it: usize,
}

impl Td3Agent {
    pub fn new(config: Td3Config, device: Device) -> Result<Self> {
        let build_actor = |vs: &nn::VarStore| {
            Actor::new(
                &vs.root(),
                &config.state_shape,
                config.action_dim,
                config.max_action,
                config.cnn,
            )
        };
        let build_critic = |vs: &nn::VarStore| {
            Critic::new(&vs.root(), &config.state_shape, config.action_dim, config.cnn)
        };

        let actor_vs = nn::VarStore::new(device);
        let actor = build_actor(&actor_vs);
        let mut actor_target_vs = nn::VarStore::new(device);
        let actor_target = build_actor(&actor_target_vs);
        actor_target_vs.copy(&actor_vs)?;
        actor_target_vs.freeze();

        let critic_vs = nn::VarStore::new(device);
        let critic = build_critic(&critic_vs);
        let mut critic_target_vs = nn::VarStore::new(device);
        let critic_target = build_critic(&critic_target_vs);
        critic_target_vs.copy(&critic_vs)?;
        critic_target_vs.freeze();

        let actor_opt = nn::Adam::default().build(&actor_vs, config.actor_lr)?;
        let critic_opt = nn::Adam::default().build(&critic_vs, config.critic_lr)?;

        Ok(Td3Agent {
            config,
            device,
            actor_vs,
            actor,
            actor_target_vs,
            actor_target,
            actor_opt,
            critic_vs,
            critic,
            critic_target_vs,
            critic_target,
            critic_opt,
            total_it: 0,
        })
    }

    pub fn config(&self) -> &Td3Config {
        &self.config
    }

    pub fn actor_var_store(&self) -> &nn::VarStore {
        &self.actor_vs
    }

    pub fn actor_target_var_store(&self) -> &nn::VarStore {
        &self.actor_target_vs
    }

    pub fn critic_var_store(&self) -> &nn::VarStore {
        &self.critic_vs
    }

    pub fn critic_target_var_store(&self) -> &nn::VarStore {
        &self.critic_target_vs
    }

    /// Online critic estimates `(Q1, Q2)` for a batch, without gradient.
    pub fn q_values(&self, state: &Tensor, action: &Tensor) -> (Tensor, Tensor) {
        tch::no_grad(|| self.critic.forward(state, action))
    }

    /// Actor output for a batch of states, without gradient.
    pub fn actions(&self, state: &Tensor) -> Tensor {
        tch::no_grad(|| self.actor.forward(state))
    }

    fn path(dir: &Path, name: &str, part: &str) -> PathBuf {
        dir.join(format!("{name}_{part}.ot"))
    }

    fn meta_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.json"))
    }

    fn check_compatible(&self, name: &str, stored: &Td3Config) -> Result<()> {
        let reason = if stored.state_shape != self.config.state_shape {
            format!(
                "state shape {:?} != {:?}",
                stored.state_shape, self.config.state_shape
            )
        } else if stored.action_dim != self.config.action_dim {
            format!(
                "action dim {} != {}",
                stored.action_dim, self.config.action_dim
            )
        } else if stored.cnn != self.config.cnn {
            format!("cnn {} != {}", stored.cnn, self.config.cnn)
        } else {
            return Ok(());
        };
        Err(Error::IncompatibleCheckpoint {
            name: name.to_string(),
            reason,
        })
    }
}

impl Policy for Td3Agent {
    fn select_action(&self, state: &[f32]) -> Result<Vec<f32>> {
        let expected = self.config.state_len();
        if state.len() != expected {
            return Err(Error::ShapeMismatch {
                what: "state",
                expected,
                actual: state.len(),
            });
        }

        let xs = state
            .to_tensor(&self.config.state_shape)
            .to_device(self.device);
        let action = tch::no_grad(|| self.actor.forward(&xs));
        Ok(Vec::<f32>::try_from(
            &action.flatten(0, -1).to_device(Device::Cpu),
        )?)
    }
}

impl Agent for Td3Agent {
    fn train(&mut self, buffer: &mut ReplayBuffer, batch_size: usize) -> Result<TrainStats> {
        self.total_it += 1;

        let batch = buffer.sample(batch_size, self.device)?;
        let cfg = &self.config;

        let target_q = tch::no_grad(|| {
            // Select action according to policy and add clipped noise
            let noise = (Tensor::randn_like(&batch.action) * cfg.policy_noise)
                .clamp(-cfg.noise_clip, cfg.noise_clip);
            let next_action = (self.actor_target.forward(&batch.next_state) + noise)
                .clamp(-cfg.max_action, cfg.max_action);

            let (target_q1, target_q2) = self.critic_target.forward(&batch.next_state, &next_action);
            &batch.reward + &batch.not_done * cfg.discount * target_q1.minimum(&target_q2)
        });

        let (current_q1, current_q2) = self.critic.forward(&batch.state, &batch.action);
        let critic_loss = current_q1.mse_loss(&target_q, Reduction::Mean)
            + current_q2.mse_loss(&target_q, Reduction::Mean);
        self.critic_opt.backward_step(&critic_loss);

        let mut stats = TrainStats {
            critic_loss: critic_loss.double_value(&[]),
            actor_loss: None,
        };

        if self.total_it % self.config.policy_freq.max(1) == 0 {
            let actor_loss = -self
                .critic
                .q1(&batch.state, &self.actor.forward(&batch.state))
                .mean(Kind::Float);
            self.actor_opt.backward_step(&actor_loss);

            soft_update(&self.critic_target_vs, &self.critic_vs, self.config.tau)?;
            soft_update(&self.actor_target_vs, &self.actor_vs, self.config.tau)?;

            stats.actor_loss = Some(actor_loss.double_value(&[]));
        }

        debug!(
            "it {}: critic_loss={:.5} actor_loss={:?}",
            self.total_it, stats.critic_loss, stats.actor_loss
        );
        Ok(stats)
    }

    /// Writes the weights of all four networks and the update counter.
    /// Adam moments are not saved, so a resumed run starts them from zero.
    fn save(&self, dir: &Path, name: &str) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.actor_vs.save(Self::path(dir, name, "actor"))?;
        self.actor_target_vs.save(Self::path(dir, name, "actor_target"))?;
        self.critic_vs.save(Self::path(dir, name, "critic"))?;
        self.critic_target_vs.save(Self::path(dir, name, "critic_target"))?;

        let checkpoint = Checkpoint {
            config: self.config.clone(),
            total_it: self.total_it,
        };
        serde_json::to_writer_pretty(File::create(Self::meta_path(dir, name))?, &checkpoint)?;

        info!("Model saved to {}/{name}", dir.display());
        Ok(())
    }

    fn load(&mut self, dir: &Path, name: &str) -> Result<bool> {
        let meta = Self::meta_path(dir, name);
        if !meta.exists() {
            return Ok(false);
        }

        let checkpoint: Checkpoint = serde_json::from_reader(File::open(&meta)?)?;
        self.check_compatible(name, &checkpoint.config)?;

        self.actor_vs.load(Self::path(dir, name, "actor"))?;
        self.actor_target_vs.load(Self::path(dir, name, "actor_target"))?;
        self.critic_vs.load(Self::path(dir, name, "critic"))?;
        self.critic_target_vs.load(Self::path(dir, name, "critic_target"))?;
        self.total_it = checkpoint.total_it;

        if checkpoint.config != self.config {
            debug!(
                "checkpoint {name} was trained with {:?}, continuing with {:?}",
                checkpoint.config, self.config
            );
        }
        info!("Model loaded from {}/{name}", dir.display());
        Ok(true)
    }

    fn total_iterations(&self) -> usize {
        self.total_it
    }
}
