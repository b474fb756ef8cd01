//! # Pix2Pix for Paired Image Translation
//!
//! This crate provides a modular implementation of the pix2pix conditional
//! GAN: a U-Net generator translates a condition image into a candidate, and
//! a PatchGAN discriminator scores (image, condition) pairs patch by patch.
//!
//! ## Modules
//!
//! - `data`: Paired image folder, transforms and batching
//! - `model`: Block factory, Generator, Discriminator and the Pix2Pix pair
//! - `training`: Training loop, loss functions and metrics
//! - `utils`: Configuration, checkpoints and sample images

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{PairDataset, PairDirection, PairLoader, PairedImageFolder};
pub use error::{Pix2PixError, Result};
pub use model::{Discriminator, Generator, Pix2Pix};
pub use training::{Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{load_generator, load_model, save_checkpoint, Config};
