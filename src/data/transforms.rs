//! Image tensor transforms
//!
//! Images are loaded as `(C, H, W)` u8 tensors and trained on as float
//! tensors in [-1, 1], which matches the generator's tanh output range.

use tch::{Kind, Tensor};

use crate::error::{Pix2PixError, Result};

/// Map u8 pixels in [0, 255] to floats in [-1, 1]
pub fn to_signed_unit(pixels: &Tensor) -> Tensor {
    pixels.to_kind(Kind::Float) / 127.5 - 1.0
}

/// Map floats in [-1, 1] back to u8 pixels, clamping out-of-range values
pub fn to_pixels(image: &Tensor) -> Tensor {
    ((image + 1.0) * 127.5)
        .round()
        .clamp(0.0, 255.0)
        .to_kind(Kind::Uint8)
}

/// Split a side-by-side `(C, H, 2W)` image into its left and right halves
///
/// An odd trailing column is dropped.
pub fn split_pair(image: &Tensor) -> Result<(Tensor, Tensor)> {
    let size = image.size();
    let width = match size.as_slice() {
        [_, _, w] => *w,
        _ => {
            return Err(Pix2PixError::InvalidConfig(format!(
                "expected a (C, H, W) image, got {:?}",
                size
            )))
        }
    };
    let half = width / 2;
    if half == 0 {
        return Err(Pix2PixError::InvalidConfig(format!(
            "image of width {} cannot hold a pair",
            width
        )));
    }

    let left = image.narrow(2, 0, half).contiguous();
    let right = image.narrow(2, half, half).contiguous();
    Ok((left, right))
}

/// Mirror an image along its width axis
pub fn hflip(image: &Tensor) -> Tensor {
    image.flip([-1])
}
