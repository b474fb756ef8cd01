//! Data module for loading paired images
//!
//! This module provides:
//! - Image folder dataset of side-by-side pairs
//! - Tensor transforms between pixels and the [-1, 1] training range
//! - Batching loader with shuffling and random flips

mod dataset;
mod loader;
pub mod transforms;

pub use dataset::{PairDataset, PairDirection, PairedImageFolder, IMAGE_EXTENSIONS};
pub use loader::{Batch, LoaderOptions, PairLoader, PairLoaderIter};

#[cfg(test)]
pub(crate) use loader::tests::ConstantPairs;
