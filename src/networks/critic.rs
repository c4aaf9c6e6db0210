use tch::{Tensor, nn, nn::Module};

use super::HIDDEN;
use super::cnn::StateEncoder;
use super::mlp::MLP;

#[derive(Debug)]
struct QHead {
    encoder: StateEncoder,
    mlp: MLP,
}

impl QHead {
    fn new(p: &nn::Path, state_shape: &[usize], action_dim: usize, use_cnn: bool) -> Self {
        let encoder = StateEncoder::new(p, state_shape, use_cnn);
        let input_dim = encoder.out_dim() + action_dim as i64;
        let mlp = MLP::new(&(p / "mlp"), input_dim, &HIDDEN, 1);
        QHead { encoder, mlp }
    }

    fn forward(&self, state: &Tensor, action: &Tensor) -> Tensor {
        let features = self.encoder.forward(state);
        self.mlp.forward(&Tensor::cat(&[features, action.shallow_clone()], 1))
    }
}

/// Twin Q-networks. Each head has its own state encoder.
#[derive(Debug)]
pub struct Critic {
    q1: QHead,
    q2: QHead,
}

impl Critic {
    pub fn new(p: &nn::Path, state_shape: &[usize], action_dim: usize, use_cnn: bool) -> Self {
        Critic {
            q1: QHead::new(&(p / "q1"), state_shape, action_dim, use_cnn),
            q2: QHead::new(&(p / "q2"), state_shape, action_dim, use_cnn),
        }
    }

    /// Returns `(Q1, Q2)`, each `[batch, 1]`.
    pub fn forward(&self, state: &Tensor, action: &Tensor) -> (Tensor, Tensor) {
        (self.q1.forward(state, action), self.q2.forward(state, action))
    }

    pub fn q1(&self, state: &Tensor, action: &Tensor) -> Tensor {
        self.q1.forward(state, action)
    }
}
