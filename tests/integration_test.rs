use std::fs;
use std::path::Path;

use clap::Parser;
use forestfire_td3::Error;
use forestfire_td3::config::TrainArgs;
use forestfire_td3::policy::Policy;
use forestfire_td3::trainer::{Trainer, evaluate_policy};

fn train_args(dir: &Path, extra: &[&str]) -> TrainArgs {
    let results = dir.join("results");
    let models = dir.join("models");
    let mut argv = vec![
        "forestfire-td3".to_string(),
        "--results-dir".to_string(),
        results.display().to_string(),
        "--models-dir".to_string(),
        models.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    TrainArgs::parse_from(argv)
}

#[test]
fn td3_pendulum_test() {
    let dir = tempfile::tempdir().unwrap();
    let args = train_args(
        dir.path(),
        &[
            "--env",
            "Pendulum-v1",
            "--start-episode",
            "2",
            "--eval-freq",
            "2",
            "--eval-episodes",
            "1",
            "--max-timesteps",
            "1000",
            "--batch-size",
            "32",
            "--save-model",
            "--plot",
        ],
    );
    let run_name = args.run_name();

    let mut trainer = Trainer::new(args).unwrap();
    let summary = trainer.run().unwrap();

    // 200-step episodes: five finish, evaluations follow episodes 3 and 5
    assert_eq!(summary.total_timesteps, 1000);
    assert_eq!(summary.episode_rewards.len(), 5);
    assert_eq!(summary.evaluations.len(), 2);
    assert_eq!(trainer.buffer().len(), 1000);
    assert_eq!(trainer.agent().total_iterations(), 600);

    let log = fs::read_to_string(trainer.results().path()).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[3].starts_with("Evaluation: "));
    assert!(lines[6].starts_with("Evaluation: "));
    for row in [0, 1, 2, 4, 5] {
        let fields: Vec<&str> = lines[row].split(", ").collect();
        assert_eq!(fields.len(), 3, "{}", lines[row]);
        assert!(fields[0].parse::<f32>().unwrap() < 0.0);
        assert_eq!(fields[1], "200");
        assert_eq!(fields[2], "None");
    }

    let plot = dir.path().join("results").join(format!("{run_name}.png"));
    assert!(plot.exists(), "no reward plot at {}", plot.display());

    let models = dir.path().join("models");
    assert!(models.join(format!("{run_name}.json")).exists());
    assert!(models.join(format!("{run_name}_critic.ot")).exists());

    // resuming picks the checkpoint up again
    let resumed = Trainer::new(train_args(
        dir.path(),
        &["--env", "Pendulum-v1", "--load-model", &run_name],
    ))
    .unwrap();
    assert_eq!(resumed.run_name(), run_name);
    assert_eq!(resumed.agent().total_iterations(), 600);
}

#[test]
fn forest_fire_rows_track_trees() {
    let dir = tempfile::tempdir().unwrap();
    let args = train_args(
        dir.path(),
        &[
            "--env",
            "ForestFire-flat-v0",
            "--start-episode",
            "1",
            "--eval-freq",
            "1000",
            "--max-timesteps",
            "300",
            "--batch-size",
            "16",
        ],
    );

    let mut trainer = Trainer::new(args).unwrap();
    let summary = trainer.run().unwrap();
    assert_eq!(summary.total_timesteps, 300);
    assert!(summary.evaluations.is_empty());
    assert!(summary.episode_rewards.iter().all(|r| *r <= 0.0));

    let log = fs::read_to_string(trainer.results().path()).unwrap();
    let rows: Vec<&str> = log.lines().collect();
    assert_eq!(rows.len(), summary.episode_rewards.len());
    for row in rows {
        let fields: Vec<&str> = row.split(", ").collect();
        assert_eq!(fields.len(), 3, "{row}");
        let trees: usize = fields[2].parse().unwrap();
        assert!(trees <= 16 * 16);
    }
}

#[test]
fn first_learning_episode_is_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    let args = train_args(
        dir.path(),
        &[
            "--env",
            "ForestFire-flat-v0",
            "--start-episode",
            "0",
            "--max-timesteps",
            "5",
            "--batch-size",
            "4",
            "--render-dir",
            &frames.display().to_string(),
        ],
    );

    let mut trainer = Trainer::new(args).unwrap();
    trainer.run().unwrap();
    assert!(frames.join("forest_00000_00000.png").exists());
}

/// Always aims at the centre of the grid.
struct Centre;

impl Policy for Centre {
    fn select_action(&self, _state: &[f32]) -> forestfire_td3::Result<Vec<f32>> {
        Ok(vec![0.0, 0.0])
    }
}

#[test]
fn evaluation_renders_its_first_episode() {
    let dir = tempfile::tempdir().unwrap();
    let eval_dir = dir.path().join("eval_00003");

    let reward = evaluate_policy(
        &Centre,
        "ForestFire-flat-v0",
        25,
        2,
        Some(eval_dir.as_path()),
    )
    .unwrap();
    assert!(reward <= 0.0);
    assert!(eval_dir.join("forest_00000_00000.png").exists());

    let unrendered = evaluate_policy(&Centre, "Pendulum-v1", 25, 1, None).unwrap();
    assert!(unrendered < 0.0);
}

#[test]
fn missing_checkpoint_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = Trainer::new(train_args(
        dir.path(),
        &["--env", "Pendulum-v1", "--load-model", "does-not-exist"],
    ))
    .unwrap();
    assert_eq!(trainer.agent().total_iterations(), 0);
    assert_eq!(trainer.run_name(), "does-not-exist");
}

#[test]
fn unknown_policy_or_environment_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let policy = Trainer::new(train_args(dir.path(), &["--policy", "DDPG"]));
    assert!(matches!(policy, Err(Error::UnsupportedPolicy(_))));

    let env = Trainer::new(train_args(dir.path(), &["--env", "CartPole-v1"]));
    assert!(matches!(env, Err(Error::UnknownEnvironment(_))));
}
