//! PatchGAN discriminator for pix2pix
//!
//! The Discriminator scores (image, condition) pairs. Instead of a single
//! real/fake logit per image it emits a grid of logits, one per receptive
//! field patch, which pushes the generator towards realistic local texture.

use tch::{nn, nn::ModuleT, Tensor};

use super::blocks::{block, output_size, BlockConfig, Direction, KERNEL_SIZE, PADDING};
use crate::error::{Pix2PixError, Result};

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Channels of the scored image (target or candidate)
    pub image_channels: i64,
    /// Channels of the condition image
    pub condition_channels: i64,
    /// Filters of the first stage
    pub base_filters: i64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            image_channels: 3,
            condition_channels: 3,
            base_filters: 64,
        }
    }
}

/// Stride of each discriminator stage; the last keeps the resolution
const STAGE_STRIDES: [i64; 4] = [2, 2, 2, 1];

/// PatchGAN discriminator
///
/// Architecture:
/// 1. Concatenate candidate and condition on the channel axis
/// 2. Four LeakyReLU conv stages: 64 (s2), 128 (s2), 256 (s2), 512 (s1)
/// 3. Stride 1 convolution to a single channel of raw logits
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    seq: nn::SequentialT,
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Self {
        let base = config.base_filters;
        let mut seq = nn::seq_t();

        let mut in_channels = config.image_channels + config.condition_channels;
        for (i, &stride) in STAGE_STRIDES.iter().enumerate() {
            let out_channels = base << i;
            let stage = BlockConfig::down(in_channels, out_channels, i > 0).with_stride(stride);
            seq = seq.add(block(&(vs / format!("stage{}", i + 1)), &stage));
            in_channels = out_channels;
        }

        // No activation: the loss consumes raw logits
        seq = seq.add(nn::conv2d(
            vs / "patch_logits",
            in_channels,
            1,
            KERNEL_SIZE,
            nn::ConvConfig {
                stride: 1,
                padding: PADDING,
                ws_init: super::blocks::weight_init(),
                ..Default::default()
            },
        ));

        Self { config, seq }
    }

    /// Score an image against its condition
    ///
    /// # Arguments
    ///
    /// * `image` - Candidate or target, shape (batch, image_channels, H, W)
    /// * `condition` - Condition image, shape (batch, condition_channels, H, W)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Patch logits of shape (batch, 1, ph, pw), see [`Discriminator::patch_shape`]
    pub fn try_forward_t(&self, image: &Tensor, condition: &Tensor, train: bool) -> Result<Tensor> {
        let (i, c) = (image.size(), condition.size());
        let aligned = i.len() == 4
            && c.len() == 4
            && i[0] == c[0]
            && i[1] == self.config.image_channels
            && c[1] == self.config.condition_channels
            && i[2..] == c[2..];
        if !aligned {
            return Err(Pix2PixError::InvalidConfig(format!(
                "discriminator expects image {:?} and condition {:?} channels on one grid, got {:?} vs {:?}",
                self.config.image_channels, self.config.condition_channels, i, c
            )));
        }
        let pair = Tensor::f_cat(&[image, condition], 1)?;
        Ok(self.seq.forward_t(&pair, train))
    }

    /// Score an image against its condition (panics on mismatched inputs)
    pub fn forward_t(&self, image: &Tensor, condition: &Tensor, train: bool) -> Tensor {
        match self.try_forward_t(image, condition, train) {
            Ok(out) => out,
            Err(e) => panic!("discriminator forward failed: {}", e),
        }
    }

    /// Probability that each patch is real (inference mode)
    pub fn classify(&self, image: &Tensor, condition: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| {
            self.try_forward_t(image, condition, false)
                .map(|logits| logits.sigmoid())
        })
    }

    /// Spatial shape of the patch grid for an input of `height` x `width`
    pub fn patch_shape(height: i64, width: i64) -> (i64, i64) {
        let shrink = |mut size: i64| {
            for &stride in STAGE_STRIDES.iter() {
                size = output_size(size, Direction::Down, stride);
            }
            output_size(size, Direction::Down, 1)
        };
        (shrink(height), shrink(width))
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    #[test]
    fn test_discriminator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default());

        let image = Tensor::randn([2, 3, 256, 256], (Kind::Float, Device::Cpu));
        let condition = Tensor::randn([2, 3, 256, 256], (Kind::Float, Device::Cpu));
        let output = tch::no_grad(|| disc.forward_t(&image, &condition, false));

        assert_eq!(output.size(), vec![2, 1, 30, 30]);
    }

    #[test]
    fn test_patch_shape_matches_forward() {
        assert_eq!(Discriminator::patch_shape(256, 256), (30, 30));

        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            base_filters: 8,
            ..Default::default()
        };
        let disc = Discriminator::new(&vs.root(), config);

        let image = Tensor::randn([1, 3, 64, 128], (Kind::Float, Device::Cpu));
        let output = disc.forward_t(&image, &image, false);
        let (ph, pw) = Discriminator::patch_shape(64, 128);

        assert_eq!(output.size(), vec![1, 1, ph, pw]);
        assert_eq!((ph, pw), (6, 14));
    }

    #[test]
    fn test_discriminator_classify() {
        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            base_filters: 8,
            ..Default::default()
        };
        let disc = Discriminator::new(&vs.root(), config);

        let image = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let probs = disc.classify(&image, &image).unwrap();

        let min_val = probs.min().double_value(&[]);
        let max_val = probs.max().double_value(&[]);
        assert!(min_val >= 0.0 && max_val <= 1.0);
    }

    #[test]
    fn test_discriminator_rejects_mismatched_pair() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default());

        let image = Tensor::randn([1, 3, 64, 64], (Kind::Float, Device::Cpu));
        let condition = Tensor::randn([1, 3, 32, 32], (Kind::Float, Device::Cpu));

        assert!(disc.try_forward_t(&image, &condition, false).is_err());
    }

    #[test]
    fn test_discriminator_mixed_channel_pair() {
        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            image_channels: 1,
            condition_channels: 3,
            base_filters: 8,
        };
        let disc = Discriminator::new(&vs.root(), config);

        let image = Tensor::randn([2, 1, 64, 64], (Kind::Float, Device::Cpu));
        let condition = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let output = disc.try_forward_t(&image, &condition, false).unwrap();
        assert_eq!(output.size(), vec![2, 1, 6, 6]);

        // Channels swapped relative to the configuration
        assert!(disc.try_forward_t(&condition, &image, false).is_err());
    }
}
