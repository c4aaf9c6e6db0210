use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tch::Device;

use crate::agent::{self, Agent};
use crate::algorithms::td3::Td3Config;
use crate::config::TrainArgs;
use crate::environment::Environment;
use crate::environments;
use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::replay_buffer::ReplayBuffer;
use crate::results::ResultsLog;
use crate::utils::plot_rewards;

const RENDERED_EPISODES: usize = 100;
const RENDER_EVERY: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct TrainingSummary {
    pub episode_rewards: Vec<f32>,
    pub evaluations: Vec<f32>,
    pub total_timesteps: u64,
}

/// Runs `policy` deterministically on a fresh copy of `env_id` seeded with
/// `seed + 100` and returns the mean episode reward. Only the first episode
/// is rendered.
pub fn evaluate_policy<P: Policy + ?Sized>(
    policy: &P,
    env_id: &str,
    seed: u64,
    eval_episodes: usize,
    render_dir: Option<&Path>,
) -> Result<f32> {
    let mut eval_env = environments::make(env_id, render_dir)?;
    eval_env.seed(seed + 100);

    let mut avg_reward = 0.0;
    for i in 0..eval_episodes {
        let mut state = eval_env.reset();
        loop {
            let action = policy.select_action(&state)?;
            let result = eval_env.step(&action);
            avg_reward += result.reward;
            if i == 0 {
                eval_env.render(i)?;
            }
            state = result.next_state;
            if result.done {
                break;
            }
        }
    }

    avg_reward /= eval_episodes.max(1) as f32;
    info!("---------------------------------------");
    info!("Evaluation over {eval_episodes} episodes: {avg_reward:.3}");
    info!("---------------------------------------");
    Ok(avg_reward)
}

/// Training driver: one environment step, one buffer insert and, once the
/// warm-up episodes are over, one gradient update per iteration.
pub struct Trainer {
    args: TrainArgs,
    run_name: String,
    env: Box<dyn Environment>,
    agent: Box<dyn Agent>,
    buffer: ReplayBuffer,
    results: ResultsLog,
    rng: StdRng,
    max_action: f32,
}

impl Trainer {
    pub fn new(args: TrainArgs) -> Result<Self> {
        args.validate()?;

        let run_name = args.run_name();
        info!("---------------------------------------");
        info!(
            "Policy: {}, Env: {}, Seed: {}",
            args.policy, args.env, args.seed
        );
        info!("---------------------------------------");

        let results = ResultsLog::open(&args.results_dir, &run_name)?;
        if args.save_model {
            std::fs::create_dir_all(&args.models_dir)?;
        }

        let mut env = environments::make(&args.env, args.render_dir.as_deref())?;

        // Set seeds
        env.seed(args.seed);
        tch::manual_seed(args.seed as i64);
        let rng = StdRng::seed_from_u64(args.seed);

        let state_shape = env.observation_shape();
        let action_dim = env.action_dim();
        let max_action = env.action_high();

        // Target policy smoothing is scaled wrt the action scale
        let config = Td3Config {
            discount: args.discount,
            tau: args.tau,
            policy_noise: args.policy_noise * max_action as f64,
            noise_clip: args.noise_clip * max_action as f64,
            policy_freq: args.policy_freq,
            cnn: args.cnn,
            ..Td3Config::new(state_shape.clone(), action_dim, max_action as f64)
        };
        if config.image_obs() && !config.cnn {
            info!("image observations {state_shape:?} will be flattened");
        }

        let mut agent = agent::make(&args.policy, config, Device::cuda_if_available())?;

        if let Some(name) = args.load_name() {
            info!("Loading model {name}");
            if !agent.load(&args.models_dir, &name)? {
                warn!(
                    "no model {name} in {}, starting from scratch",
                    args.models_dir.display()
                );
            }
        }

        let buffer = ReplayBuffer::new(&state_shape, action_dim, args.buffer_size, args.seed)?;

        Ok(Trainer {
            args,
            run_name,
            env,
            agent,
            buffer,
            results,
            rng,
            max_action,
        })
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn results(&self) -> &ResultsLog {
        &self.results
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn run(&mut self) -> Result<TrainingSummary> {
        let noise = Normal::new(0.0, self.max_action * self.args.expl_noise as f32)
            .map_err(|e| Error::InvalidArgument(format!("exploration noise: {e}")))?;
        let max_episode_steps = self.env.max_episode_steps();
        let start_episode = self.args.start_episode;

        let mut summary = TrainingSummary::default();
        let mut state = self.env.reset();
        let mut episode_reward = 0.0;
        let mut episode_timesteps = 0;
        let mut episode_num = 0;

        for t in 0..self.args.max_timesteps {
            episode_timesteps += 1;

            // Select action randomly or according to policy
            let action = if episode_num < start_episode {
                self.env.sample_action()
            } else {
                self.explore(&state, &noise)?
            };

            let result = self.env.step(&action);
            if Self::should_render(episode_num, start_episode) {
                self.env.render(episode_num)?;
            }

            // A time-out is not a terminal state
            let done_bool = result.done && episode_timesteps < max_episode_steps;
            self.buffer.add(
                &state,
                &action,
                &result.next_state,
                result.reward,
                done_bool,
            )?;

            state = result.next_state;
            episode_reward += result.reward;

            // Train agent after collecting sufficient data
            if episode_num >= start_episode && t % self.args.train_freq as u64 == 0 {
                self.agent.train(&mut self.buffer, self.args.batch_size)?;
            }

            summary.total_timesteps = t + 1;

            if !result.done {
                continue;
            }

            info!(
                "Total T: {} Episode Num: {} Episode T: {} Reward: {:.3} Trees: {}",
                t + 1,
                episode_num + 1,
                episode_timesteps,
                episode_reward,
                result
                    .info
                    .tree_count
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
            );
            self.results
                .episode(episode_reward, episode_timesteps, result.info.tree_count)?;
            summary.episode_rewards.push(episode_reward);

            state = self.env.reset();
            episode_reward = 0.0;
            episode_timesteps = 0;
            episode_num += 1;

            if (episode_num + 1) % self.args.eval_freq == 0 && episode_num > start_episode {
                let render_dir = self.eval_render_dir(episode_num);
                let evaluation = evaluate_policy(
                    self.agent.as_ref(),
                    &self.args.env,
                    self.args.seed,
                    self.args.eval_episodes,
                    render_dir.as_deref(),
                )?;
                self.results.evaluation(evaluation)?;
                summary.evaluations.push(evaluation);

                if self.args.save_model {
                    info!("Saving model");
                    self.agent.save(&self.args.models_dir, &self.run_name)?;
                }
            }
        }

        if self.args.plot {
            let path = self
                .args
                .results_dir
                .join(format!("{}.png", self.run_name));
            if let Err(e) = plot_rewards(&summary.episode_rewards, &path, "Training Reward") {
                warn!("could not plot rewards: {e}");
            }
        }

        Ok(summary)
    }

    /// Policy action plus Gaussian exploration noise, clipped to the action box.
    fn explore(&mut self, state: &[f32], noise: &Normal<f32>) -> Result<Vec<f32>> {
        let max_action = self.max_action;
        let action = self.agent.select_action(state)?;
        Ok(action
            .into_iter()
            .map(|a| (a + noise.sample(&mut self.rng)).clamp(-max_action, max_action))
            .collect())
    }

    /// Every tenth of the first hundred learning episodes is rendered.
    fn should_render(episode_num: usize, start_episode: usize) -> bool {
        episode_num >= start_episode
            && episode_num < start_episode + RENDERED_EPISODES
            && (episode_num - start_episode) % RENDER_EVERY == 0
    }

    fn eval_render_dir(&self, episode_num: usize) -> Option<PathBuf> {
        self.args
            .render_dir
            .as_ref()
            .map(|dir| dir.join(format!("eval_{episode_num:05}")))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn trainer(dir: &Path, extra: &[&str]) -> Trainer {
        let mut argv = vec![
            "forestfire-td3".to_string(),
            "--results-dir".to_string(),
            dir.join("results").display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Trainer::new(TrainArgs::parse_from(argv)).unwrap()
    }

    fn not_done_column(trainer: &mut Trainer, samples: usize) -> Vec<f32> {
        let batch = trainer.buffer.sample(samples, Device::Cpu).unwrap();
        Vec::<f32>::try_from(&batch.not_done.flatten(0, -1)).unwrap()
    }

    #[test]
    fn time_limit_cutoff_is_stored_as_not_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(
            dir.path(),
            &[
                "--env",
                "Pendulum-v1",
                "--start-episode",
                "5",
                "--max-timesteps",
                "200",
            ],
        );
        let summary = trainer.run().unwrap();
        assert_eq!(summary.episode_rewards.len(), 1);
        assert_eq!(trainer.buffer.len(), 200);

        let not_done = not_done_column(&mut trainer, 2000);
        assert!(not_done.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn burnt_out_forest_is_stored_as_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(
            dir.path(),
            &[
                "--env",
                "ForestFire-flat-v0",
                "--start-episode",
                "1000",
                "--max-timesteps",
                "1000",
            ],
        );
        let summary = trainer.run().unwrap();
        // a lone fire in a sparse 16x16 forest dies out long before 1000 steps
        assert!(!summary.episode_rewards.is_empty());

        let not_done = not_done_column(&mut trainer, 20_000);
        assert!(not_done.iter().any(|&v| v == 0.0));
        assert!(not_done.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn evaluation_frames_get_their_own_directory() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("frames");
        let with_frames = trainer(
            dir.path(),
            &[
                "--env",
                "Pendulum-v1",
                "--render-dir",
                &frames.display().to_string(),
            ],
        );
        assert_eq!(
            with_frames.eval_render_dir(7),
            Some(frames.join("eval_00007"))
        );

        let without = trainer(dir.path(), &["--env", "Pendulum-v1"]);
        assert_eq!(without.eval_render_dir(7), None);
    }

    #[test]
    fn renders_every_tenth_learning_episode() {
        let rendered: Vec<usize> = (0..250)
            .filter(|&e| Trainer::should_render(e, 100))
            .collect();
        assert_eq!(
            rendered,
            vec![100, 110, 120, 130, 140, 150, 160, 170, 180, 190]
        );
    }
}
