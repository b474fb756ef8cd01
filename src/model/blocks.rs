//! Building blocks shared by the Generator and Discriminator
//!
//! Every stage of both networks is a 4x4 convolution (or transposed
//! convolution), an optional batch norm and an activation.

use tch::nn::{self, ConvConfig, ConvTransposeConfig, Init};

/// Kernel size used by every pix2pix stage
pub const KERNEL_SIZE: i64 = 4;
/// Padding used by every pix2pix stage
pub const PADDING: i64 = 1;
/// Negative slope of the LeakyReLU used by downsampling stages
pub const LEAKY_SLOPE: f64 = 0.2;

/// Weight initialization from the pix2pix paper: N(0, 0.02)
pub fn weight_init() -> Init {
    Init::Randn {
        mean: 0.0,
        stdev: 0.02,
    }
}

/// Sampling direction of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Strided convolution followed by LeakyReLU(0.2)
    Down,
    /// Strided transposed convolution followed by ReLU
    Up,
}

/// Block construction parameters
#[derive(Debug, Clone)]
pub struct BlockConfig {
    /// Input channels
    pub in_channels: i64,
    /// Output channels
    pub out_channels: i64,
    /// Whether to apply batch normalization after the convolution
    pub normalize: bool,
    /// Downsampling or upsampling
    pub direction: Direction,
    /// Convolution stride
    pub stride: i64,
    /// Dropout probability applied after the activation (0 disables)
    pub dropout: f64,
}

impl BlockConfig {
    /// Downsampling block with stride 2
    pub fn down(in_channels: i64, out_channels: i64, normalize: bool) -> Self {
        Self {
            in_channels,
            out_channels,
            normalize,
            direction: Direction::Down,
            stride: 2,
            dropout: 0.0,
        }
    }

    /// Upsampling block with stride 2
    pub fn up(in_channels: i64, out_channels: i64, normalize: bool) -> Self {
        Self {
            in_channels,
            out_channels,
            normalize,
            direction: Direction::Up,
            stride: 2,
            dropout: 0.0,
        }
    }

    pub fn with_stride(mut self, stride: i64) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }
}

/// Build a single down/up-sampling stage
///
/// Layers: conv (or transposed conv) -> [batch norm] -> activation -> [dropout].
/// The convolution bias is dropped when batch norm follows it.
pub fn block(vs: &nn::Path, config: &BlockConfig) -> nn::SequentialT {
    let bias = !config.normalize;

    let mut seq = match config.direction {
        Direction::Down => nn::seq_t().add(nn::conv2d(
            vs / "conv",
            config.in_channels,
            config.out_channels,
            KERNEL_SIZE,
            ConvConfig {
                stride: config.stride,
                padding: PADDING,
                bias,
                ws_init: weight_init(),
                ..Default::default()
            },
        )),
        Direction::Up => nn::seq_t().add(nn::conv_transpose2d(
            vs / "conv_transpose",
            config.in_channels,
            config.out_channels,
            KERNEL_SIZE,
            ConvTransposeConfig {
                stride: config.stride,
                padding: PADDING,
                bias,
                ws_init: weight_init(),
                ..Default::default()
            },
        )),
    };

    if config.normalize {
        seq = seq.add(nn::batch_norm2d(
            vs / "norm",
            config.out_channels,
            Default::default(),
        ));
    }

    seq = match config.direction {
        Direction::Down => seq.add_fn(|xs| xs.maximum(&(xs * LEAKY_SLOPE))),
        Direction::Up => seq.add_fn(|xs| xs.relu()),
    };

    if config.dropout > 0.0 {
        let p = config.dropout;
        seq = seq.add_fn_t(move |xs, train| xs.dropout(p, train));
    }

    seq
}

/// Spatial size after one stage in the given direction
pub fn output_size(input: i64, direction: Direction, stride: i64) -> i64 {
    match direction {
        Direction::Down => (input + 2 * PADDING - KERNEL_SIZE) / stride + 1,
        Direction::Up => (input - 1) * stride - 2 * PADDING + KERNEL_SIZE,
    }
}
