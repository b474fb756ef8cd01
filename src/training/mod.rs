//! Training module for pix2pix
//!
//! This module provides:
//! - Training loop with generator-then-discriminator updates
//! - Adversarial and L1 reconstruction losses
//! - Training configuration and metrics

mod trainer;
mod losses;
mod metrics;

pub use trainer::{discriminator_step, generator_step, train_step, StepLosses, Trainer, TrainingConfig};
pub use losses::{
    adversarial_loss, discriminator_loss, generator_loss, reconstruction_loss, GanMode,
    GeneratorLoss, PatchLabels,
};
pub use metrics::{EMATracker, EpochSummary, TrainingMetrics};
