//! Sample image output
//!
//! Writes batches of generated images to disk for visual inspection.

use std::path::Path;
use tch::{Device, Tensor};

use crate::data::transforms::to_pixels;

/// Tile a `(N, C, H, W)` batch side by side into one `(C, H, N * W)` image
pub fn tile_batch(images: &Tensor) -> Tensor {
    let frames = images.to_device(Device::Cpu).unbind(0);
    Tensor::cat(&frames, 2)
}

/// Save a batch of [-1, 1] images as a single PNG strip
///
/// The parent directory is created if missing.
pub fn save_samples<P: AsRef<Path>>(images: &Tensor, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let strip = tch::no_grad(|| to_pixels(&tile_batch(&images.detach())));
    tch::vision::image::save(&strip, path)?;
    Ok(())
}
