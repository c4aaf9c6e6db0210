use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::error::{Error, Result};

/// Train a TD3 agent on the forest-fire environment.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct TrainArgs {
    /// Policy name (TD3)
    #[arg(long, default_value = "TD3")]
    pub policy: String,

    /// Whether to use a CNN encoder for image observations
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub cnn: bool,

    /// Environment id (ForestFire-v0, ForestFire-flat-v0, Pendulum-v1)
    #[arg(long, default_value = "gym_forestfire:ForestFire-v0")]
    pub env: String,

    /// Seeds the environment, libtorch and the exploration noise
    #[arg(long, default_value_t = 25)]
    pub seed: u64,

    /// Episodes during which actions are sampled uniformly at random
    #[arg(long, default_value_t = 100)]
    pub start_episode: usize,

    /// How often (episodes) we evaluate
    #[arg(long, default_value_t = 10)]
    pub eval_freq: usize,

    /// Episodes per evaluation
    #[arg(long, default_value_t = 3)]
    pub eval_episodes: usize,

    /// Max time steps to run the environment
    #[arg(long, default_value_t = 100_000_000)]
    pub max_timesteps: u64,

    /// Std of Gaussian exploration noise, relative to the action bound
    #[arg(long, default_value_t = 0.15)]
    pub expl_noise: f64,

    /// Batch size for both actor and critic
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    pub discount: f64,

    /// Target network update rate
    #[arg(long, default_value_t = 0.005)]
    pub tau: f64,

    /// Noise added to target policy during critic update, relative to the action bound
    #[arg(long, default_value_t = 0.2)]
    pub policy_noise: f64,

    /// Range to clip target policy noise, relative to the action bound
    #[arg(long, default_value_t = 0.5)]
    pub noise_clip: f64,

    /// Frequency of delayed policy updates
    #[arg(long, default_value_t = 4)]
    pub policy_freq: usize,

    /// Run one gradient update every `train_freq` environment steps
    #[arg(long, default_value_t = 1)]
    pub train_freq: usize,

    /// Replay buffer capacity
    #[arg(long, default_value_t = 1_000_000)]
    pub buffer_size: usize,

    /// Save model parameters after every evaluation
    #[arg(long)]
    pub save_model: bool,

    /// Model to load: "" doesn't load, "default" uses the run file name
    #[arg(long, default_value = "")]
    pub load_model: String,

    /// Experiment name, part of the file names
    #[arg(long, default_value = "test")]
    pub exp_name: String,

    #[arg(long, default_value = "./results")]
    pub results_dir: PathBuf,

    #[arg(long, default_value = "./models")]
    pub models_dir: PathBuf,

    /// Write rendered frames here; nothing is rendered when unset
    #[arg(long)]
    pub render_dir: Option<PathBuf>,

    /// Plot the episode rewards when training finishes
    #[arg(long)]
    pub plot: bool,
}

impl TrainArgs {
    /// `{policy}_{env}_{seed}_{exp_name}`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.policy, self.env, self.seed, self.exp_name
        )
    }

    /// Checkpoint to resume from, if any.
    pub fn load_name(&self) -> Option<String> {
        match self.load_model.as_str() {
            "" => None,
            "default" => Some(self.file_name()),
            name => Some(name.to_string()),
        }
    }

    /// Name shared by the results log and the saved model. A resumed run keeps
    /// writing to the checkpoint it was loaded from.
    pub fn run_name(&self) -> String {
        self.load_name().unwrap_or_else(|| self.file_name())
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("eval_freq", self.eval_freq),
            ("eval_episodes", self.eval_episodes),
            ("batch_size", self.batch_size),
            ("policy_freq", self.policy_freq),
            ("train_freq", self.train_freq),
            ("buffer_size", self.buffer_size),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(Error::InvalidArgument(format!("{name} must be at least 1")));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "tau must be in (0, 1], got {}",
                self.tau
            )));
        }
        for (name, v) in [
            ("expl_noise", self.expl_noise),
            ("policy_noise", self.policy_noise),
            ("noise_clip", self.noise_clip),
        ] {
            if !(v >= 0.0 && v.is_finite()) {
                return Err(Error::InvalidArgument(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> TrainArgs {
        let mut argv = vec!["forestfire-td3"];
        argv.extend_from_slice(extra);
        TrainArgs::parse_from(argv)
    }

    #[test]
    fn defaults_follow_the_paper_setup() {
        let a = args(&[]);
        assert_eq!(a.policy, "TD3");
        assert!(a.cnn);
        assert_eq!(a.seed, 25);
        assert_eq!(a.start_episode, 100);
        assert_eq!(a.batch_size, 100);
        assert_eq!(a.policy_freq, 4);
        assert_eq!(a.load_name(), None);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn run_name_follows_load_model() {
        let a = args(&["--env", "Pendulum-v1", "--seed", "3", "--exp-name", "x"]);
        assert_eq!(a.file_name(), "TD3_Pendulum-v1_3_x");
        assert_eq!(a.run_name(), "TD3_Pendulum-v1_3_x");

        let a = args(&["--load-model", "default", "--seed", "3"]);
        assert_eq!(a.load_name().as_deref(), Some(a.file_name().as_str()));

        let a = args(&["--load-model", "7-6"]);
        assert_eq!(a.run_name(), "7-6");
    }

    #[test]
    fn cnn_can_be_switched_off() {
        assert!(!args(&["--cnn", "false"]).cnn);
    }

    #[test]
    fn rejects_zero_frequencies() {
        let err = args(&["--policy-freq", "0"]).validate().unwrap_err();
        assert!(err.to_string().contains("policy_freq"));
        assert!(args(&["--tau", "0"]).validate().is_err());
    }
}
