//! Configuration management
//!
//! Provides unified configuration for the entire pix2pix pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{LoaderOptions, PairDirection};
use crate::model::{AdamParams, DiscriminatorConfig, GeneratorConfig, Pix2Pix};
use crate::training::{GanMode, TrainingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Image folder with side-by-side pairs
    pub root: String,
    /// Side length each half is resized to
    pub image_size: i64,
    /// Batch size
    pub batch_size: usize,
    /// Which half of a pair is the condition
    pub direction: PairDirection,
    /// Shuffle pairs every epoch
    pub shuffle: bool,
    /// Random horizontal flip augmentation
    pub random_flip: bool,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Channels of condition images
    pub in_channels: i64,
    /// Channels of generated images
    pub out_channels: i64,
    /// Base filters for generator
    pub gen_base_filters: i64,
    /// Base filters for discriminator
    pub disc_base_filters: i64,
    /// Encoder/decoder depth of the generator
    pub depth: usize,
    /// Dropout of the innermost generator decoder stages
    pub dropout: f64,
}

impl ModelConfig {
    /// Architecture of an existing model, as recorded in checkpoints
    pub fn from_model(model: &Pix2Pix) -> Self {
        let gen = model.generator.config();
        Self {
            in_channels: gen.in_channels,
            out_channels: gen.out_channels,
            gen_base_filters: gen.base_filters,
            disc_base_filters: model.discriminator.config().base_filters,
            depth: gen.depth,
            dropout: gen.dropout,
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            base_filters: self.gen_base_filters,
            depth: self.depth,
            dropout: self.dropout,
            ..Default::default()
        }
    }

    /// The discriminator scores generated images against their conditions
    pub fn discriminator_config(&self) -> DiscriminatorConfig {
        DiscriminatorConfig {
            image_channels: self.out_channels,
            condition_channels: self.in_channels,
            base_filters: self.disc_base_filters,
        }
    }
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfigFile {
    /// Number of epochs
    pub epochs: usize,
    /// Learning rate of both optimizers
    pub lr: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Adam beta2
    pub beta2: f64,
    /// Weight of the L1 reconstruction loss
    pub lambda_l1: f64,
    /// Adversarial objective
    pub gan_mode: GanMode,
    /// Log progress every N batches
    pub log_every: usize,
    /// Directory for per-epoch sample images
    pub sample_dir: String,
    /// Checkpoint save frequency in epochs (0 disables)
    pub checkpoint_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Device: "cpu", "cuda" or "cuda:N"
    pub device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root: "data/facades/train".to_string(),
                image_size: 256,
                batch_size: 4,
                direction: PairDirection::AToB,
                shuffle: true,
                random_flip: false,
            },
            model: ModelConfig {
                in_channels: 3,
                out_channels: 3,
                gen_base_filters: 64,
                disc_base_filters: 64,
                depth: 7,
                dropout: 0.5,
            },
            training: TrainingConfigFile {
                epochs: 100,
                lr: 2e-4,
                beta1: 0.5,
                beta2: 0.999,
                lambda_l1: 100.0,
                gan_mode: GanMode::Vanilla,
                log_every: 10,
                sample_dir: "output".to_string(),
                checkpoint_every: 0,
                checkpoint_dir: "checkpoints".to_string(),
                device: "cuda".to_string(),
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` if it exists (TOML or JSON by extension), else defaults
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            tracing::info!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }
        if path.ends_with(".toml") {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Get device from configuration
    ///
    /// Accepts `cpu`, `cuda`/`gpu` and `cuda:N`. Anything unusable falls back
    /// to the CPU with a warning.
    pub fn get_device(&self) -> tch::Device {
        let requested = self.training.device.to_lowercase();
        let ordinal = match requested.as_str() {
            "cpu" => return tch::Device::Cpu,
            "cuda" | "gpu" => Some(0),
            other => other
                .strip_prefix("cuda:")
                .and_then(|n| n.parse::<usize>().ok()),
        };

        match ordinal {
            Some(n) if n < tch::Cuda::device_count() as usize => tch::Device::Cuda(n),
            Some(n) => {
                tracing::warn!("CUDA device {} requested but not available, falling back to CPU", n);
                tch::Device::Cpu
            }
            None => {
                tracing::warn!("Unrecognized device {:?}, falling back to CPU", self.training.device);
                tch::Device::Cpu
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let divisor = 1i64 << self.model.depth.min(30);
        if self.model.depth < 2 {
            anyhow::bail!("Generator depth must be >= 2");
        }
        if self.data.image_size <= 0 || self.data.image_size % divisor != 0 {
            anyhow::bail!(
                "Image size {} must be a positive multiple of {} for depth {}",
                self.data.image_size,
                divisor,
                self.model.depth
            );
        }
        // PairedImageFolder decodes every pair as RGB
        if self.model.in_channels != 3 || self.model.out_channels != 3 {
            anyhow::bail!(
                "Image folders provide RGB pairs; in_channels and out_channels must be 3, got {} and {}",
                self.model.in_channels,
                self.model.out_channels
            );
        }
        if self.data.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.training.epochs == 0 {
            anyhow::bail!("Number of epochs must be > 0");
        }
        if self.training.log_every == 0 {
            anyhow::bail!("log_every must be > 0");
        }
        if self.training.lr <= 0.0 {
            anyhow::bail!("Learning rate must be > 0");
        }
        if self.training.lambda_l1 < 0.0 {
            anyhow::bail!("lambda_l1 must be >= 0");
        }
        Ok(())
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        self.model.generator_config()
    }

    pub fn discriminator_config(&self) -> DiscriminatorConfig {
        self.model.discriminator_config()
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            batch_size: self.data.batch_size,
            shuffle: self.data.shuffle,
            drop_last: false,
            random_flip: self.data.random_flip,
        }
    }

    /// Training loop settings
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.training.epochs,
            adam: AdamParams {
                lr: self.training.lr,
                beta1: self.training.beta1,
                beta2: self.training.beta2,
            },
            lambda_l1: self.training.lambda_l1,
            gan_mode: self.training.gan_mode,
            log_every: self.training.log_every,
            sample_dir: self.training.sample_dir.clone(),
            checkpoint_every: self.training.checkpoint_every,
            checkpoint_dir: self.training.checkpoint_dir.clone(),
        }
    }
}
