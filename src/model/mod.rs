//! Model module containing the pix2pix architecture
//!
//! This module provides:
//! - Block factory shared by both networks
//! - U-Net Generator with skip connections
//! - PatchGAN Discriminator
//! - Pix2Pix wrapper owning both networks and their parameter stores

pub mod blocks;
mod generator;
mod discriminator;
mod pix2pix;

pub use blocks::{block, BlockConfig, Direction};
pub use generator::{concat_skip, Generator, GeneratorConfig};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use pix2pix::{AdamParams, Pix2Pix};
