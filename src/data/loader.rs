//! PairLoader for batching and iterating over image pairs
//!
//! Provides batching for pix2pix training with support for:
//! - Random shuffling
//! - Drop last incomplete batch
//! - Random horizontal flip applied identically to both images of a pair

use rand::seq::SliceRandom;
use rand::Rng;
use tch::Tensor;

use super::dataset::PairDataset;
use super::transforms::hflip;
use crate::error::Result;

/// A batch of pairs, both tensors of shape (batch, C, S, S)
pub struct Batch {
    pub condition: Tensor,
    pub target: Tensor,
}

impl Batch {
    pub fn size(&self) -> i64 {
        self.condition.size()[0]
    }
}

/// Loader options
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    /// Pairs per batch
    pub batch_size: usize,
    /// Whether to shuffle pairs each epoch
    pub shuffle: bool,
    /// Whether to drop the last incomplete batch
    pub drop_last: bool,
    /// Whether to mirror pairs horizontally with probability 0.5
    pub random_flip: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: 4,
            shuffle: true,
            drop_last: false,
            random_flip: false,
        }
    }
}

/// Loader iterating over batches of a [`PairDataset`]
pub struct PairLoader<D: PairDataset> {
    dataset: D,
    options: LoaderOptions,
    /// Current indices for iteration
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
}

impl<D: PairDataset> PairLoader<D> {
    /// Create a new PairLoader
    pub fn new(dataset: D, options: LoaderOptions) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();

        let mut loader = Self {
            dataset,
            options: LoaderOptions {
                batch_size: options.batch_size.max(1),
                ..options
            },
            indices,
            current_idx: 0,
        };

        if loader.options.shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.indices.len();
        let batch_size = self.options.batch_size;
        if self.options.drop_last {
            num_samples / batch_size
        } else {
            num_samples.div_ceil(batch_size)
        }
    }

    /// Get total number of pairs
    pub fn num_samples(&self) -> usize {
        self.indices.len()
    }

    /// Shuffle indices for a new epoch
    fn shuffle_indices(&mut self) {
        let mut rng = rand::thread_rng();
        self.indices.shuffle(&mut rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.options.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Result<Batch>> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.options.batch_size).min(num_samples);

        // Skip incomplete batch if drop_last
        if self.options.drop_last && end - start < self.options.batch_size {
            return None;
        }

        self.current_idx = end;
        Some(self.collect_batch(start, end))
    }

    fn collect_batch(&self, start: usize, end: usize) -> Result<Batch> {
        let mut rng = rand::thread_rng();
        let mut conditions = Vec::with_capacity(end - start);
        let mut targets = Vec::with_capacity(end - start);

        for &idx in &self.indices[start..end] {
            let (condition, target) = self.dataset.get(idx)?;
            if self.options.random_flip && rng.gen_bool(0.5) {
                conditions.push(hflip(&condition));
                targets.push(hflip(&target));
            } else {
                conditions.push(condition);
                targets.push(target);
            }
        }

        Ok(Batch {
            condition: Tensor::f_stack(&conditions, 0)?,
            target: Tensor::f_stack(&targets, 0)?,
        })
    }

    /// Iterate over all batches of one epoch
    pub fn iter(&mut self) -> PairLoaderIter<'_, D> {
        self.reset();
        PairLoaderIter { loader: self }
    }

    /// Get the underlying dataset
    pub fn dataset(&self) -> &D {
        &self.dataset
    }
}

/// Iterator adapter for PairLoader
pub struct PairLoaderIter<'a, D: PairDataset> {
    loader: &'a mut PairLoader<D>,
}

impl<'a, D: PairDataset> Iterator for PairLoaderIter<'a, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}
