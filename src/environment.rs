use crate::error::Result;

/// Extra information returned by [`Environment::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInfo {
    /// Trees left standing after the step, for environments that track them.
    pub tree_count: Option<usize>,
}

pub struct StepResult {
    pub next_state: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

/// Continuous-control environment with a flattened observation and a
/// symmetric action box `[-action_high, action_high]^action_dim`.
pub trait Environment {
    fn reset(&mut self) -> Vec<f32>;
    fn step(&mut self, action: &[f32]) -> StepResult; // (next_state, reward, if_done, info)

    /// 在动作空间中均匀采样
    fn sample_action(&mut self) -> Vec<f32>;

    /// Shape of one observation. More than one dimension means image input.
    fn observation_shape(&self) -> Vec<usize>;

    /// 动作空间维度
    fn action_dim(&self) -> usize;

    fn action_high(&self) -> f32;

    /// Steps after which an episode is cut off by the time limit.
    fn max_episode_steps(&self) -> usize;

    fn seed(&mut self, seed: u64);

    fn render(&mut self, _step: usize) -> Result<()> {
        Ok(())
    }

    /// Number of scalars in a flattened observation.
    fn state_len(&self) -> usize {
        self.observation_shape().iter().product()
    }
}
