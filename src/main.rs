use anyhow::Context;
use clap::Parser;
use log::info;

use forestfire_td3::config::TrainArgs;
use forestfire_td3::trainer::Trainer;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = TrainArgs::parse();
    let mut trainer = Trainer::new(args).context("failed to set up training")?;
    let summary = trainer.run().context("training failed")?;

    info!(
        "Finished after {} timesteps, {} episodes, {} evaluations. Results in {}",
        summary.total_timesteps,
        summary.episode_rewards.len(),
        summary.evaluations.len(),
        trainer.results().path().display()
    );
    Ok(())
}
