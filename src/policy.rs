use crate::error::Result;

pub trait Policy {
    // 根据状态选择动作 (deterministic, no exploration noise)
    fn select_action(&self, state: &[f32]) -> Result<Vec<f32>>;
}
