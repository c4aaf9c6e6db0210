use tch::{Tensor, nn, nn::Module};

const KERNEL: i64 = 5;
const STRIDE: i64 = 2;
const PADDING: i64 = 2;
const CHANNELS: [i64; 2] = [16, 32];

/// Two strided 5x5 convolutions over a `[B, C, H, W]` image, flattened.
#[derive(Debug)]
pub struct ConvEncoder {
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    out_dim: i64,
}

impl ConvEncoder {
    pub fn new(p: &nn::Path, in_channels: i64, height: i64, width: i64) -> Self {
        let cfg = nn::ConvConfig {
            stride: STRIDE,
            padding: PADDING,
            ..Default::default()
        };
        let conv1 = nn::conv2d(p / "conv1", in_channels, CHANNELS[0], KERNEL, cfg);
        let conv2 = nn::conv2d(p / "conv2", CHANNELS[0], CHANNELS[1], KERNEL, cfg);

        let (h, w) = (conv_out(conv_out(height)), conv_out(conv_out(width)));
        ConvEncoder {
            conv1,
            conv2,
            out_dim: CHANNELS[1] * h * w,
        }
    }

    pub fn out_dim(&self) -> i64 {
        self.out_dim
    }
}

impl Module for ConvEncoder {
    fn forward(&self, xs: &Tensor) -> Tensor {
        xs.apply(&self.conv1)
            .relu()
            .apply(&self.conv2)
            .relu()
            .flatten(1, -1)
    }
}

fn conv_out(len: i64) -> i64 {
    (len + 2 * PADDING - KERNEL) / STRIDE + 1
}

/// Turns a batch of observations into feature rows.
#[derive(Debug)]
pub enum StateEncoder {
    Flatten { dim: i64 },
    Conv(ConvEncoder),
}

impl StateEncoder {
    /// Uses the CNN only for image observations (`[C, H, W]`) and when asked to.
    pub fn new(p: &nn::Path, state_shape: &[usize], use_cnn: bool) -> Self {
        match (state_shape, use_cnn) {
            (&[c, h, w], true) => {
                StateEncoder::Conv(ConvEncoder::new(&(p / "cnn"), c as i64, h as i64, w as i64))
            }
            _ => StateEncoder::Flatten {
                dim: state_shape.iter().product::<usize>() as i64,
            },
        }
    }

    pub fn out_dim(&self) -> i64 {
        match self {
            StateEncoder::Flatten { dim } => *dim,
            StateEncoder::Conv(cnn) => cnn.out_dim(),
        }
    }
}

impl Module for StateEncoder {
    fn forward(&self, xs: &Tensor) -> Tensor {
        match self {
            StateEncoder::Flatten { .. } => xs.flatten(1, -1),
            StateEncoder::Conv(cnn) => cnn.forward(xs),
        }
    }
}
