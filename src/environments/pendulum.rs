use std::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::environment::{Environment, StepInfo, StepResult};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// Classic pendulum swing-up with a continuous torque action.
///
/// Observation is `[cos(θ), sin(θ), θ_dot]`, the reward is
/// `-(θ² + 0.1⋅θ̇² + 0.001⋅u²)` with θ measured from upright. Episodes only end
/// through the time limit.
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl Pendulum {
    pub fn new(max_steps: usize) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            max_steps,
            rng: StdRng::from_os_rng(),
        }
    }

    fn state(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f32) -> f32 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Environment for Pendulum {
    fn reset(&mut self) -> Vec<f32> {
        self.theta = self.rng.random_range(-PI..PI);
        self.theta_dot = self.rng.random_range(-1.0..1.0);
        self.steps = 0;
        self.state()
    }

    fn step(&mut self, action: &[f32]) -> StepResult {
        let torque = action
            .first()
            .copied()
            .unwrap_or(0.0)
            .clamp(-MAX_TORQUE, MAX_TORQUE);

        let theta = Self::angle_normalize(self.theta);
        let reward = -(theta.powi(2) + 0.1 * self.theta_dot.powi(2) + 0.001 * torque.powi(2));

        // θ̈ = (3g/2L)sin(θ) + (3/mL²)u
        let theta_acc = (3.0 * G / (2.0 * L)) * self.theta.sin() + (3.0 / (M * L * L)) * torque;
        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);

        self.steps += 1;

        StepResult {
            next_state: self.state(),
            reward,
            done: self.steps >= self.max_steps,
            info: StepInfo::default(),
        }
    }

    fn sample_action(&mut self) -> Vec<f32> {
        vec![self.rng.random_range(-MAX_TORQUE..=MAX_TORQUE)]
    }

    fn observation_shape(&self) -> Vec<usize> {
        vec![3]
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn action_high(&self) -> f32 {
        MAX_TORQUE
    }

    fn max_episode_steps(&self) -> usize {
        self.max_steps
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pendulum_physics() {
        let mut env = Pendulum::new(200);
        env.seed(1);

        let state = env.reset();
        assert!(state[0].abs() <= 1.0, "cos(θ) should be in [-1, 1]");
        assert!(state[1].abs() <= 1.0, "sin(θ) should be in [-1, 1]");
        assert!(state[2].abs() <= MAX_SPEED);

        let result = env.step(&[100.0]);
        assert!(result.reward.is_finite());
        assert!(!result.done);
        assert!(result.next_state[2].abs() <= MAX_SPEED);
    }

    #[test]
    fn pendulum_reward_prefers_upright() {
        let mut env = Pendulum::new(200);
        env.theta = 0.0;
        env.theta_dot = 0.0;
        let upright = env.step(&[0.0]).reward;

        env.theta = PI;
        env.theta_dot = 0.0;
        let down = env.step(&[0.0]).reward;

        assert!(upright > -1e-3);
        assert!(down < upright);
    }

    #[test]
    fn pendulum_episode_length() {
        let mut env = Pendulum::new(5);
        env.reset();

        for i in 0..5 {
            let result = env.step(&[0.0]);
            assert_eq!(result.done, i == 4, "step {i}");
        }
    }
}
