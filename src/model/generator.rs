//! U-Net generator for pix2pix
//!
//! The Generator maps a condition image to a candidate image of the same size.
//! An encoder of strided convolutions compresses the input; a decoder of
//! transposed convolutions expands it back, concatenating at each level the
//! encoder activation of the symmetric depth (skip connection).

use tch::{nn, nn::ModuleT, Tensor};

use super::blocks::{block, BlockConfig};
use crate::error::{Pix2PixError, Result};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Channels of the condition image
    pub in_channels: i64,
    /// Channels of the generated image
    pub out_channels: i64,
    /// Filters of the first encoder stage
    pub base_filters: i64,
    /// Number of encoder stages (and of decoder stages)
    pub depth: usize,
    /// Dropout applied to the innermost decoder stages
    pub dropout: f64,
    /// How many decoder stages (counted from the bottleneck) use dropout
    pub dropout_stages: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            out_channels: 3,
            base_filters: 64,
            depth: 7,
            dropout: 0.5,
            dropout_stages: 3,
        }
    }
}

impl GeneratorConfig {
    /// Filters of encoder stage `i`, capped at 8x the base
    pub fn encoder_channels(&self, i: usize) -> i64 {
        self.base_filters * (1i64 << i.min(3))
    }

    /// Inputs must be divisible by this on both spatial axes
    pub fn resolution_divisor(&self) -> i64 {
        1i64 << self.depth
    }

    pub fn validate(&self) -> Result<()> {
        if self.depth < 2 {
            return Err(Pix2PixError::InvalidConfig(format!(
                "generator depth must be at least 2, got {}",
                self.depth
            )));
        }
        if self.in_channels <= 0 || self.out_channels <= 0 || self.base_filters <= 0 {
            return Err(Pix2PixError::InvalidConfig(
                "generator channel counts must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Pix2PixError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// U-Net generator
///
/// Architecture (depth 7, 256x256 input):
/// 1. Encoder: 64, 128, 256, 512, 512, 512, 512 filters, 128 -> 2 pixels,
///    batch norm on every stage except the first and the last
/// 2. Decoder: 512, 512, 512, 256, 128, 64 filters with skip connections
/// 3. Final transposed convolution to `out_channels` with Tanh
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    encoder: Vec<nn::SequentialT>,
    decoder: Vec<nn::SequentialT>,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let depth = config.depth;

        let mut encoder = Vec::with_capacity(depth);
        let mut in_channels = config.in_channels;
        for i in 0..depth {
            let out_channels = config.encoder_channels(i);
            // The outermost and innermost stages are unnormalized; the
            // innermost one is 1x1 when the input side equals 2^depth.
            let normalize = i > 0 && i + 1 < depth;
            let stage = BlockConfig::down(in_channels, out_channels, normalize);
            encoder.push(block(&(vs / format!("down{}", i + 1)), &stage));
            in_channels = out_channels;
        }

        // Decoder stage k mirrors encoder stage depth - 2 - k; every stage but
        // the first also receives the skip at that depth, doubling its input.
        let mut decoder = Vec::with_capacity(depth);
        for k in 0..depth - 1 {
            let skip_channels = config.encoder_channels(depth - 1 - k);
            let in_channels = if k == 0 { skip_channels } else { skip_channels * 2 };
            let out_channels = config.encoder_channels(depth - 2 - k);
            let mut stage = BlockConfig::up(in_channels, out_channels, true);
            if k < config.dropout_stages && config.dropout > 0.0 {
                stage = stage.with_dropout(config.dropout);
            }
            decoder.push(block(&(vs / format!("up{}", k + 1)), &stage));
        }

        let final_in = config.encoder_channels(0) * 2;
        let final_up = nn::seq_t()
            .add(nn::conv_transpose2d(
                vs / "final_up",
                final_in,
                config.out_channels,
                super::blocks::KERNEL_SIZE,
                nn::ConvTransposeConfig {
                    stride: 2,
                    padding: super::blocks::PADDING,
                    ws_init: super::blocks::weight_init(),
                    ..Default::default()
                },
            ))
            .add_fn(|xs| xs.tanh());
        decoder.push(final_up);

        Ok(Self {
            config,
            encoder,
            decoder,
        })
    }

    /// Translate condition images into candidate images
    ///
    /// # Arguments
    ///
    /// * `condition` - Tensor of shape (batch, in_channels, H, W), H and W divisible by 2^depth
    /// * `train` - Whether in training mode (affects batch norm and dropout)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch, out_channels, H, W) with values in [-1, 1]
    pub fn try_forward_t(&self, condition: &Tensor, train: bool) -> Result<Tensor> {
        let size = condition.size();
        let divisor = self.config.resolution_divisor();
        if size.len() != 4 || size[2] % divisor != 0 || size[3] % divisor != 0 {
            let (height, width) = match size.as_slice() {
                [_, _, h, w] => (*h, *w),
                _ => (-1, -1),
            };
            return Err(Pix2PixError::InvalidResolution {
                height,
                width,
                divisor,
            });
        }

        // Encoder activation cache
        let mut skips = Vec::with_capacity(self.encoder.len());
        let mut x = condition.shallow_clone();
        for stage in &self.encoder {
            x = stage.forward_t(&x, train);
            skips.push(x.shallow_clone());
        }
        // The bottleneck output is already `x`
        skips.pop();

        for (k, stage) in self.decoder.iter().enumerate() {
            if k > 0 {
                let skip = skips.pop().ok_or_else(|| Pix2PixError::SkipMismatch {
                    stage: k,
                    activation: x.size(),
                    skip: Vec::new(),
                })?;
                x = concat_skip(k, &x, &skip)?;
            }
            x = stage.forward_t(&x, train);
        }

        Ok(x)
    }

    /// Translate condition images (panics on invalid input)
    pub fn forward_t(&self, condition: &Tensor, train: bool) -> Tensor {
        match self.try_forward_t(condition, train) {
            Ok(out) => out,
            Err(e) => panic!("generator forward failed: {}", e),
        }
    }

    /// Translate images (inference mode)
    pub fn translate(&self, condition: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| self.try_forward_t(condition, false))
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of encoder stages
    pub fn depth(&self) -> usize {
        self.encoder.len()
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}

/// Concatenate a decoder activation with its encoder skip on the channel axis
///
/// Batch and spatial dimensions must agree; otherwise the pairing between
/// encoder and decoder depth is wrong.
pub fn concat_skip(stage: usize, activation: &Tensor, skip: &Tensor) -> Result<Tensor> {
    let a = activation.size();
    let s = skip.size();
    let aligned = a.len() == 4 && s.len() == 4 && a[0] == s[0] && a[2..] == s[2..];
    if !aligned {
        return Err(Pix2PixError::SkipMismatch {
            stage,
            activation: a,
            skip: s,
        });
    }
    Ok(Tensor::f_cat(&[activation, skip], 1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    fn small_config(depth: usize) -> GeneratorConfig {
        GeneratorConfig {
            base_filters: 8,
            depth,
            ..Default::default()
        }
    }

    #[test]
    fn test_generator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();

        let input = Tensor::randn([1, 3, 256, 256], (Kind::Float, Device::Cpu));
        let output = gen.translate(&input).unwrap();

        assert_eq!(output.size(), vec![1, 3, 256, 256]);
    }

    #[test]
    fn test_generator_preserves_non_square_resolution() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), small_config(7)).unwrap();

        let input = Tensor::randn([2, 3, 128, 256], (Kind::Float, Device::Cpu));
        let output = gen.translate(&input).unwrap();

        assert_eq!(output.size(), vec![2, 3, 128, 256]);
    }

    #[test]
    fn test_generator_output_range() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), small_config(5)).unwrap();

        let input = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu)) * 50.0;
        let output = gen.forward_t(&input, true);

        assert!(output.min().double_value(&[]) >= -1.0);
        assert!(output.max().double_value(&[]) <= 1.0);
    }

    #[test]
    fn test_generator_rejects_indivisible_resolution() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), small_config(7)).unwrap();

        let input = Tensor::randn([1, 3, 100, 100], (Kind::Float, Device::Cpu));
        let result = gen.try_forward_t(&input, false);

        assert!(matches!(
            result,
            Err(Pix2PixError::InvalidResolution { divisor: 128, .. })
        ));
    }

    #[test]
    fn test_generator_rejects_shallow_depth() {
        let vs = VarStore::new(Device::Cpu);
        let result = Generator::new(&vs.root(), small_config(1));

        assert!(matches!(result, Err(Pix2PixError::InvalidConfig(_))));
    }

    #[test]
    fn test_concat_skip_mismatch() {
        let x = Tensor::zeros([1, 512, 4, 4], (Kind::Float, Device::Cpu));
        let skip = Tensor::zeros([1, 512, 8, 8], (Kind::Float, Device::Cpu));

        let result = concat_skip(1, &x, &skip);
        assert!(matches!(result, Err(Pix2PixError::SkipMismatch { stage: 1, .. })));
    }

    #[test]
    fn test_concat_skip_stacks_channels() {
        let x = Tensor::zeros([2, 16, 4, 4], (Kind::Float, Device::Cpu));
        let skip = Tensor::ones([2, 8, 4, 4], (Kind::Float, Device::Cpu));

        let joined = concat_skip(1, &x, &skip).unwrap();
        assert_eq!(joined.size(), vec![2, 24, 4, 4]);
    }

    #[test]
    fn test_encoder_channel_schedule() {
        let config = GeneratorConfig::default();
        let channels: Vec<i64> = (0..config.depth).map(|i| config.encoder_channels(i)).collect();

        assert_eq!(channels, vec![64, 128, 256, 512, 512, 512, 512]);
        assert_eq!(config.resolution_divisor(), 128);
    }

    #[test]
    fn test_decoder_has_one_stage_per_encoder_stage() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();

        assert_eq!(gen.depth(), 7);
        assert_eq!(gen.decoder.len(), 7);
    }

    #[test]
    fn test_single_pair_at_minimum_resolution_trains() {
        let vs = VarStore::new(Device::Cpu);
        let config = small_config(5);
        let side = config.resolution_divisor();
        let gen = Generator::new(&vs.root(), config).unwrap();

        // The bottleneck is 1x1 with a single pair in the batch
        let input = Tensor::randn([1, 3, side, side], (Kind::Float, Device::Cpu));
        let output = gen.try_forward_t(&input, true).unwrap();
        assert_eq!(output.size(), vec![1, 3, side, side]);

        let names: Vec<String> = vs.variables().into_keys().collect();
        assert!(names.iter().any(|n| n.starts_with("down4.norm")));
        assert!(!names.iter().any(|n| n.starts_with("down5.norm")));
        assert!(!names.iter().any(|n| n.starts_with("down1.norm")));
    }
}
