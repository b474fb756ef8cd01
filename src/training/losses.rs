//! Loss functions for pix2pix training
//!
//! The generator objective is an adversarial term plus a weighted L1
//! reconstruction term; the discriminator objective averages its real and
//! fake adversarial terms.

use serde::{Deserialize, Serialize};
use tch::{Kind, Reduction, Tensor};

/// Adversarial objective applied to patch logits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GanMode {
    /// Binary cross entropy on logits
    #[default]
    Vanilla,
    /// Least squares (LSGAN) on raw scores
    Lsgan,
}

/// Constant real/fake label grids matching the discriminator output
pub struct PatchLabels {
    pub valid: Tensor,
    pub fake: Tensor,
}

impl PatchLabels {
    /// Build labels for a batch of `batch_size` patch grids of `ph` x `pw`
    pub fn new(batch_size: i64, patch_shape: (i64, i64), device: tch::Device) -> Self {
        let shape = [batch_size, 1, patch_shape.0, patch_shape.1];
        Self {
            valid: Tensor::ones(shape, (Kind::Float, device)),
            fake: Tensor::zeros(shape, (Kind::Float, device)),
        }
    }
}

/// Adversarial loss of `output` against a label grid
pub fn adversarial_loss(output: &Tensor, labels: &Tensor, mode: GanMode) -> Tensor {
    match mode {
        GanMode::Vanilla => output.binary_cross_entropy_with_logits::<Tensor>(
            labels,
            None,
            None,
            Reduction::Mean,
        ),
        GanMode::Lsgan => output.mse_loss(labels, Reduction::Mean),
    }
}

/// Mean absolute pixel difference
pub fn reconstruction_loss(candidate: &Tensor, target: &Tensor) -> Tensor {
    candidate.l1_loss(target, Reduction::Mean)
}

/// Generator loss components
pub struct GeneratorLoss {
    /// adversarial + lambda * reconstruction, differentiable
    pub total: Tensor,
    /// Adversarial term
    pub adversarial: f64,
    /// Unweighted L1 term
    pub reconstruction: f64,
}

/// Generator loss: the candidate should be scored "valid" and match the target
///
/// # Arguments
///
/// * `fake_output` - Discriminator logits on (candidate, condition)
/// * `valid` - Label grid of ones
/// * `candidate` - Generated image
/// * `target` - Ground truth image
/// * `lambda_l1` - Weight of the reconstruction term (100 in pix2pix)
pub fn generator_loss(
    fake_output: &Tensor,
    valid: &Tensor,
    candidate: &Tensor,
    target: &Tensor,
    lambda_l1: f64,
    mode: GanMode,
) -> GeneratorLoss {
    let adversarial = adversarial_loss(fake_output, valid, mode);
    let reconstruction = reconstruction_loss(candidate, target);

    GeneratorLoss {
        adversarial: adversarial.double_value(&[]),
        reconstruction: reconstruction.double_value(&[]),
        total: adversarial + reconstruction * lambda_l1,
    }
}

/// Discriminator loss: mean of the real and fake terms
pub fn discriminator_loss(
    real_output: &Tensor,
    fake_output: &Tensor,
    labels: &PatchLabels,
    mode: GanMode,
) -> Tensor {
    let real_loss = adversarial_loss(real_output, &labels.valid, mode);
    let fake_loss = adversarial_loss(fake_output, &labels.fake, mode);

    (real_loss + fake_loss) * 0.5
}
