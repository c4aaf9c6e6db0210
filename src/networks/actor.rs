use tch::{Tensor, nn, nn::Module};

use super::HIDDEN;
use super::cnn::StateEncoder;
use super::mlp::MLP;

/// Deterministic policy network, outputs actions in `[-max_action, max_action]`.
#[derive(Debug)]
pub struct Actor {
    encoder: StateEncoder,
    mlp: MLP,
    max_action: f64,
}

impl Actor {
    pub fn new(
        p: &nn::Path,
        state_shape: &[usize],
        action_dim: usize,
        max_action: f64,
        use_cnn: bool,
    ) -> Self {
        let encoder = StateEncoder::new(p, state_shape, use_cnn);
        let mlp = MLP::new(&(p / "mlp"), encoder.out_dim(), &HIDDEN, action_dim as i64);
        Actor {
            encoder,
            mlp,
            max_action,
        }
    }
}

impl Module for Actor {
    fn forward(&self, state: &Tensor) -> Tensor {
        self.mlp.forward(&self.encoder.forward(state)).tanh() * self.max_action
    }
}
