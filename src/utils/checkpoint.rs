//! Checkpoint save utilities
//!
//! Saves network weights along with training metadata. Only the generator
//! is ever read back, for inference; training always starts fresh.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tch::Device;

use super::config::ModelConfig;
use crate::model::Pix2Pix;
use crate::training::TrainingMetrics;

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epochs completed
    pub epoch: usize,
    /// Generator loss at checkpoint
    pub gen_loss: f64,
    /// Discriminator loss at checkpoint
    pub disc_loss: f64,
    /// L1 reconstruction loss at checkpoint
    pub l1_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Architecture the weights were trained with
    pub config: ModelConfig,
}

/// Save a complete checkpoint (model + metadata)
///
/// # Arguments
///
/// * `model` - Pix2Pix model to save
/// * `metrics` - Training metrics
/// * `name` - Checkpoint name, e.g. `epoch_0010` or `final`
/// * `dir` - Directory to save checkpoint
///
/// # Returns
///
/// Path to saved checkpoint
pub fn save_checkpoint(
    model: &Pix2Pix,
    metrics: &TrainingMetrics,
    name: &str,
    dir: &str,
) -> anyhow::Result<String> {
    let checkpoint_dir = format!("{}/checkpoint_{}", dir, name);
    std::fs::create_dir_all(&checkpoint_dir)?;

    // Save model weights
    let gen_path = format!("{}/generator.pt", checkpoint_dir);
    let disc_path = format!("{}/discriminator.pt", checkpoint_dir);
    model.save(&gen_path, &disc_path)?;

    let meta = CheckpointMeta {
        epoch: metrics.num_epochs(),
        gen_loss: metrics.latest_gen_loss().unwrap_or(0.0),
        disc_loss: metrics.latest_disc_loss().unwrap_or(0.0),
        l1_loss: metrics.latest_l1_loss().unwrap_or(0.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
        config: ModelConfig::from_model(model),
    };

    let meta_path = format!("{}/meta.json", checkpoint_dir);
    let meta_json = serde_json::to_string_pretty(&meta)?;
    std::fs::write(&meta_path, meta_json)?;

    // Save metrics
    let metrics_path = format!("{}/metrics.csv", checkpoint_dir);
    metrics.save_csv(&metrics_path)?;

    tracing::info!("Saved checkpoint to {}", checkpoint_dir);
    Ok(checkpoint_dir)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(checkpoint_dir: &str) -> anyhow::Result<CheckpointMeta> {
    let meta_path = format!("{}/meta.json", checkpoint_dir);
    let content = std::fs::read_to_string(&meta_path)?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Load generator weights from a checkpoint directory for inference
pub fn load_generator(model: &mut Pix2Pix, checkpoint_dir: &str) -> anyhow::Result<CheckpointMeta> {
    let gen_path = format!("{}/generator.pt", checkpoint_dir);
    if !Path::new(&gen_path).exists() {
        anyhow::bail!("No generator weights at {}", gen_path);
    }
    model.load_generator(&gen_path)?;

    let meta = load_checkpoint_meta(checkpoint_dir)?;
    tracing::info!("Loaded generator from {} (epoch {})", checkpoint_dir, meta.epoch);
    Ok(meta)
}

/// Rebuild a model with the checkpoint's architecture and load its generator
pub fn load_model(checkpoint_dir: &str, device: Device) -> anyhow::Result<(Pix2Pix, CheckpointMeta)> {
    let meta = load_checkpoint_meta(checkpoint_dir)?;
    let mut model = Pix2Pix::new(
        meta.config.generator_config(),
        meta.config.discriminator_config(),
        device,
    )?;
    let meta = load_generator(&mut model, checkpoint_dir)?;
    Ok((model, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiscriminatorConfig, GeneratorConfig};
    use crate::training::EpochSummary;

    fn small_model() -> Pix2Pix {
        let gen_config = GeneratorConfig {
            base_filters: 4,
            depth: 3,
            ..Default::default()
        };
        let disc_config = DiscriminatorConfig {
            base_filters: 4,
            ..Default::default()
        };
        Pix2Pix::new(gen_config, disc_config, Device::Cpu).unwrap()
    }

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            epoch: 10,
            gen_loss: 0.5,
            disc_loss: 0.6,
            l1_loss: 0.1,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            config: crate::utils::Config::default().model,
        };

        let json = serde_json::to_string(&meta).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(meta.epoch, loaded.epoch);
        assert_eq!(loaded.config.depth, 7);
    }

    #[test]
    fn test_save_and_load_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();

        let model = small_model();
        let mut metrics = TrainingMetrics::new();
        metrics.record_epoch(EpochSummary {
            gen_loss: 10.5,
            gen_adv_loss: 0.5,
            gen_l1_loss: 0.1,
            disc_loss: 0.6,
        });

        let path = save_checkpoint(&model, &metrics, "final", dir).unwrap();
        assert!(path.ends_with("checkpoint_final"));

        let mut restored = small_model();
        let meta = load_generator(&mut restored, &path).unwrap();
        assert_eq!(meta.epoch, 1);
        assert_eq!(meta.disc_loss, 0.6);
    }

    #[test]
    fn test_load_generator_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = small_model();

        assert!(load_generator(&mut model, dir.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_load_model_uses_checkpoint_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();

        // Depth 3 with 4 filters, unlike the default configuration
        let model = small_model();
        let path = save_checkpoint(&model, &TrainingMetrics::new(), "final", dir).unwrap();

        let (restored, meta) = load_model(&path, Device::Cpu).unwrap();
        assert_eq!(meta.config.depth, 3);
        assert_eq!(meta.config.gen_base_filters, 4);
        assert_eq!(restored.generator.depth(), 3);

        let condition = tch::Tensor::randn([1, 3, 32, 32], (tch::Kind::Float, Device::Cpu));
        let a = model.translate(&condition).unwrap();
        let b = restored.translate(&condition).unwrap();
        assert!(a.allclose(&b, 1e-5, 1e-6, false));
    }
}
