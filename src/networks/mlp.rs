use tch::{Tensor, nn};

/// Fully connected stack: ReLU between layers, linear output.
#[derive(Debug)]
pub struct MLP {
    pub model: nn::Sequential,
}

impl MLP {
    pub fn new(p: &nn::Path, input_dim: i64, hidden: &[i64], output_dim: i64) -> Self {
        let mut model = nn::seq();
        let mut in_dim = input_dim;
        for (i, &width) in hidden.iter().enumerate() {
            model = model
                .add(nn::linear(p / format!("layer{}", i + 1), in_dim, width, Default::default()))
                .add_fn(|xs| xs.relu());
            in_dim = width;
        }
        model = model.add(nn::linear(p / "output", in_dim, output_dim, Default::default()));
        MLP { model }
    }
}

impl nn::Module for MLP {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.model.forward(xs)
    }
}
