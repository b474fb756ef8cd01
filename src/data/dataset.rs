//! Paired image dataset
//!
//! Images live in a root directory, optionally grouped into class
//! subfolders. Every file stores one training pair side by side: the left
//! half is domain A and the right half is domain B.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::Tensor;
use tracing::debug;

use super::transforms::{split_pair, to_signed_unit};
use crate::error::{Pix2PixError, Result};

/// File extensions recognized as images
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Which half of a pair is the condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairDirection {
    /// Left half is the condition, right half is the target
    #[default]
    AToB,
    /// Right half is the condition, left half is the target
    BToA,
}

/// Source of (condition, target) pairs
pub trait PairDataset {
    /// Number of pairs
    fn len(&self) -> usize;

    /// Load pair `index` as two `(C, S, S)` float tensors in [-1, 1]
    fn get(&self, index: usize) -> Result<(Tensor, Tensor)>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Image folder of side-by-side pairs
#[derive(Debug, Clone)]
pub struct PairedImageFolder {
    files: Vec<PathBuf>,
    image_size: i64,
    direction: PairDirection,
}

impl PairedImageFolder {
    /// Scan `root` and its immediate subfolders for images
    pub fn open<P: AsRef<Path>>(root: P, image_size: i64, direction: PairDirection) -> Result<Self> {
        let root = root.as_ref();
        let mut files = Vec::new();

        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_dir() {
                for inner in std::fs::read_dir(&path)? {
                    let inner = inner?.path();
                    if is_image(&inner) {
                        files.push(inner);
                    }
                }
            } else if is_image(&path) {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(Pix2PixError::EmptyDataset(root.display().to_string()));
        }
        files.sort();

        debug!("Found {} image pairs under {}", files.len(), root.display());

        Ok(Self {
            files,
            image_size,
            direction,
        })
    }

    /// Paths of all pairs, in dataset order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Side length each half is resized to
    pub fn image_size(&self) -> i64 {
        self.image_size
    }
}

impl PairDataset for PairedImageFolder {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Result<(Tensor, Tensor)> {
        let path = &self.files[index];
        let image = tch::vision::image::load(path)?;
        let (a, b) = split_pair(&image)?;

        let size = self.image_size;
        let a = to_signed_unit(&tch::vision::image::resize(&a, size, size)?);
        let b = to_signed_unit(&tch::vision::image::resize(&b, size, size)?);

        Ok(match self.direction {
            PairDirection::AToB => (a, b),
            PairDirection::BToA => (b, a),
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    /// Write a 3 x h x 2h pair: black on the left, white on the right
    fn write_pair(path: &Path, h: i64) {
        let left = Tensor::zeros([3, h, h], (Kind::Uint8, Device::Cpu));
        let right = Tensor::full([3, h, h], 255, (Kind::Uint8, Device::Cpu));
        let pair = Tensor::cat(&[&left, &right], 2);
        tch::vision::image::save(&pair, path).unwrap();
    }

    #[test]
    fn test_open_scans_class_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        let class_dir = dir.path().join("facades");
        std::fs::create_dir(&class_dir).unwrap();
        write_pair(&class_dir.join("1.png"), 8);
        write_pair(&dir.path().join("2.png"), 8);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let dataset = PairedImageFolder::open(dir.path(), 8, PairDirection::AToB).unwrap();
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_open_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = PairedImageFolder::open(dir.path(), 8, PairDirection::AToB);

        assert!(matches!(result, Err(Pix2PixError::EmptyDataset(_))));
    }

    #[test]
    fn test_get_splits_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(&dir.path().join("pair.png"), 8);

        let dataset = PairedImageFolder::open(dir.path(), 16, PairDirection::AToB).unwrap();
        let (condition, target) = dataset.get(0).unwrap();

        assert_eq!(condition.size(), vec![3, 16, 16]);
        assert_eq!(target.size(), vec![3, 16, 16]);
        assert!(condition.max().double_value(&[]) < -0.98);
        assert!(target.min().double_value(&[]) > 0.98);
    }

    #[test]
    fn test_direction_swaps_halves() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(&dir.path().join("pair.png"), 8);

        let dataset = PairedImageFolder::open(dir.path(), 8, PairDirection::BToA).unwrap();
        let (condition, target) = dataset.get(0).unwrap();

        assert!(condition.min().double_value(&[]) > 0.98);
        assert!(target.max().double_value(&[]) < -0.98);
    }
}
