//! Training loop implementation for pix2pix
//!
//! Each batch runs a generator update followed by a discriminator update.
//! The discriminator sees a detached copy of the candidate, so its loss
//! never reaches the generator's parameters.

use indicatif::{ProgressBar, ProgressStyle};
use tch::{nn, Device, Tensor};
use tracing::{info, warn};

use super::losses::{discriminator_loss, generator_loss, GanMode, PatchLabels};
use super::metrics::{EMATracker, EpochSummary, TrainingMetrics};
use crate::data::{PairDataset, PairLoader};
use crate::error::Result;
use crate::model::{AdamParams, Discriminator, Pix2Pix};
use crate::utils::{save_checkpoint, save_samples};

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Optimizer settings shared by both networks
    pub adam: AdamParams,
    /// Weight of the L1 reconstruction loss
    pub lambda_l1: f64,
    /// Adversarial objective
    pub gan_mode: GanMode,
    /// Log progress every N batches
    pub log_every: usize,
    /// Directory for per-epoch sample images
    pub sample_dir: String,
    /// Save checkpoint every N epochs (0 disables periodic checkpoints)
    pub checkpoint_every: usize,
    /// Directory to save checkpoints
    pub checkpoint_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            adam: AdamParams::default(),
            lambda_l1: 100.0,
            gan_mode: GanMode::Vanilla,
            log_every: 10,
            sample_dir: "output".to_string(),
            checkpoint_every: 0,
            checkpoint_dir: "checkpoints".to_string(),
        }
    }
}

/// Scalar losses of one batch
#[derive(Debug, Clone, Copy, Default)]
pub struct StepLosses {
    pub gen_loss: f64,
    pub gen_adv_loss: f64,
    pub gen_l1_loss: f64,
    pub disc_loss: f64,
}

/// Pix2Pix Trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Train the pix2pix model
    ///
    /// # Arguments
    ///
    /// * `model` - Pix2Pix model to train
    /// * `loader` - PairLoader providing training batches
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train<D: PairDataset>(
        &mut self,
        model: &mut Pix2Pix,
        loader: &mut PairLoader<D>,
    ) -> anyhow::Result<&TrainingMetrics> {
        let mut gen_opt = model.gen_optimizer(self.config.adam)?;
        let mut disc_opt = model.disc_optimizer(self.config.adam)?;

        let num_batches = loader.num_batches();
        let log_every = self.config.log_every.max(1);

        info!(
            "Starting training for {} epochs, {} batches per epoch",
            self.config.epochs, num_batches
        );

        for epoch in 0..self.config.epochs {
            let mut totals = StepLosses::default();
            let mut batch_count = 0;
            let mut last_candidate: Option<Tensor> = None;
            let mut gen_ema = EMATracker::new(0.1);
            let mut disc_ema = EMATracker::new(0.1);

            // Progress bar for epoch
            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                    .progress_chars("##-"),
            );

            for (batch_idx, batch) in loader.iter().enumerate() {
                let batch = batch?;
                let condition = batch.condition.to_device(self.device);
                let target = batch.target.to_device(self.device);

                let (losses, candidate) = train_step(
                    model,
                    &mut gen_opt,
                    &mut disc_opt,
                    &condition,
                    &target,
                    &self.config,
                )?;

                totals.gen_loss += losses.gen_loss;
                totals.gen_adv_loss += losses.gen_adv_loss;
                totals.gen_l1_loss += losses.gen_l1_loss;
                totals.disc_loss += losses.disc_loss;
                batch_count += 1;
                last_candidate = Some(candidate);

                if batch_idx % log_every == 0 {
                    info!(
                        "[Epoch {}] [Batch {}/{}] [D loss: {:.4}] [G loss: {:.4}]",
                        epoch_label(epoch, self.config.epochs),
                        batch_idx,
                        num_batches,
                        losses.disc_loss,
                        losses.gen_loss
                    );
                }

                // Update progress bar
                gen_ema.update(losses.gen_loss);
                disc_ema.update(losses.disc_loss);
                pb.set_message(format!("G: {:.4}, D: {:.4}", gen_ema.value(), disc_ema.value()));
                pb.inc(1);
            }

            pb.finish_with_message("done");

            if batch_count == 0 {
                anyhow::bail!("Loader produced no batches");
            }

            // Calculate epoch averages
            let n = batch_count as f64;
            let summary = EpochSummary {
                gen_loss: totals.gen_loss / n,
                gen_adv_loss: totals.gen_adv_loss / n,
                gen_l1_loss: totals.gen_l1_loss / n,
                disc_loss: totals.disc_loss / n,
            };
            self.metrics.record_epoch(summary);

            info!(
                "Epoch {}: G_loss={:.4} (adv={:.4}, L1={:.4}), D_loss={:.4}",
                epoch_label(epoch, self.config.epochs),
                summary.gen_loss,
                summary.gen_adv_loss,
                summary.gen_l1_loss,
                summary.disc_loss
            );

            if self.metrics.check_discriminator_dominance(5) {
                warn!("Discriminator is overpowering the generator; consider lowering its learning rate.");
            }

            // Persist the last batch's candidates
            if let Some(candidate) = &last_candidate {
                let sample_path = format!("{}/{}.png", self.config.sample_dir, epoch);
                save_samples(candidate, &sample_path)?;
            }

            // Save checkpoint
            let every = self.config.checkpoint_every;
            if every > 0 && (epoch + 1) % every == 0 {
                save_checkpoint(
                    model,
                    &self.metrics,
                    &format!("epoch_{:04}", epoch + 1),
                    &self.config.checkpoint_dir,
                )?;
            }
        }

        // Save final model
        save_checkpoint(model, &self.metrics, "final", &self.config.checkpoint_dir)?;

        Ok(&self.metrics)
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

/// 1-based `current/total` label for the 0-based epoch index used in logs
fn epoch_label(epoch: usize, epochs: usize) -> String {
    format!("{}/{}", epoch + 1, epochs)
}

/// Generator update: adversarial + weighted L1 loss, generator parameters only
///
/// Returns the losses and the candidate images, still attached to the
/// generator graph.
pub fn generator_step(
    model: &Pix2Pix,
    gen_opt: &mut nn::Optimizer,
    condition: &Tensor,
    target: &Tensor,
    labels: &PatchLabels,
    config: &TrainingConfig,
) -> Result<(StepLosses, Tensor)> {
    let candidate = model.generator.try_forward_t(condition, true)?;
    let fake_output = model.discriminator.try_forward_t(&candidate, condition, true)?;

    let loss = generator_loss(
        &fake_output,
        &labels.valid,
        &candidate,
        target,
        config.lambda_l1,
        config.gan_mode,
    );

    gen_opt.zero_grad();
    loss.total.backward();
    gen_opt.step();

    let losses = StepLosses {
        gen_loss: loss.total.double_value(&[]),
        gen_adv_loss: loss.adversarial,
        gen_l1_loss: loss.reconstruction,
        disc_loss: 0.0,
    };
    Ok((losses, candidate))
}

/// Discriminator update on the real pair and the detached candidate pair
pub fn discriminator_step(
    model: &Pix2Pix,
    disc_opt: &mut nn::Optimizer,
    condition: &Tensor,
    target: &Tensor,
    candidate: &Tensor,
    labels: &PatchLabels,
    config: &TrainingConfig,
) -> Result<f64> {
    let real_output = model.discriminator.try_forward_t(target, condition, true)?;
    let fake_output = model
        .discriminator
        .try_forward_t(&candidate.detach(), condition, true)?;

    let d_loss = discriminator_loss(&real_output, &fake_output, labels, config.gan_mode);

    disc_opt.zero_grad();
    d_loss.backward();
    disc_opt.step();

    Ok(d_loss.double_value(&[]))
}

/// Single training step: generator update, then discriminator update
pub fn train_step(
    model: &Pix2Pix,
    gen_opt: &mut nn::Optimizer,
    disc_opt: &mut nn::Optimizer,
    condition: &Tensor,
    target: &Tensor,
    config: &TrainingConfig,
) -> Result<(StepLosses, Tensor)> {
    let size = condition.size();
    let patch_shape = Discriminator::patch_shape(size[2], size[3]);
    let labels = PatchLabels::new(size[0], patch_shape, condition.device());

    let (mut losses, candidate) =
        generator_step(model, gen_opt, condition, target, &labels, config)?;
    losses.disc_loss =
        discriminator_step(model, disc_opt, condition, target, &candidate, &labels, config)?;

    Ok((losses, candidate.detach()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ConstantPairs, LoaderOptions};
    use crate::model::{DiscriminatorConfig, GeneratorConfig};
    use tch::{nn::VarStore, Kind};

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

    fn batch() -> (Tensor, Tensor) {
        let condition = Tensor::rand([2, 3, 32, 32], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        let target = Tensor::rand([2, 3, 32, 32], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        (condition, target)
    }

    fn labels() -> PatchLabels {
        PatchLabels::new(2, Discriminator::patch_shape(32, 32), Device::Cpu)
    }

    fn snapshot(vs: &VarStore) -> Vec<Tensor> {
        vs.trainable_variables()
            .iter()
            .map(|t| t.detach().copy())
            .collect()
    }

    fn unchanged(vs: &VarStore, before: &[Tensor]) -> bool {
        vs.trainable_variables()
            .iter()
            .zip(before)
            .all(|(now, then)| now.equal(then))
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 100);
        assert_eq!(config.lambda_l1, 100.0);
        assert_eq!(config.log_every, 10);
    }

    #[test]
    fn test_epoch_label_is_one_based() {
        assert_eq!(epoch_label(0, 100), "1/100");
        assert_eq!(epoch_label(99, 100), "100/100");
    }

    #[test]
    fn test_generator_step_leaves_discriminator_unchanged() {
        let model = small_model();
        let mut gen_opt = model.gen_optimizer(AdamParams::default()).unwrap();
        let (condition, target) = batch();

        let gen_before = snapshot(&model.gen_vs);
        let disc_before = snapshot(&model.disc_vs);

        let config = TrainingConfig::default();
        generator_step(&model, &mut gen_opt, &condition, &target, &labels(), &config).unwrap();

        assert!(unchanged(&model.disc_vs, &disc_before));
        assert!(!unchanged(&model.gen_vs, &gen_before));
    }

    #[test]
    fn test_discriminator_step_leaves_generator_unchanged() {
        let model = small_model();
        let mut disc_opt = model.disc_optimizer(AdamParams::default()).unwrap();
        let (condition, target) = batch();
        let candidate = model.generator.forward_t(&condition, true);

        let gen_before = snapshot(&model.gen_vs);
        let disc_before = snapshot(&model.disc_vs);

        let config = TrainingConfig::default();
        discriminator_step(&model, &mut disc_opt, &condition, &target, &candidate, &labels(), &config)
            .unwrap();

        assert!(unchanged(&model.gen_vs, &gen_before));
        assert!(!unchanged(&model.disc_vs, &disc_before));
    }

    #[test]
    fn test_detached_candidate_blocks_generator_gradients() {
        let model = small_model();
        let mut disc_opt = model.disc_optimizer(AdamParams::default()).unwrap();
        let (condition, target) = batch();

        // Candidate still attached to the generator graph
        let candidate = model.generator.forward_t(&condition, true);
        assert!(candidate.requires_grad());

        let config = TrainingConfig::default();
        discriminator_step(&model, &mut disc_opt, &condition, &target, &candidate, &labels(), &config)
            .unwrap();

        for var in model.gen_vs.trainable_variables() {
            let grad = var.grad();
            if grad.defined() {
                assert_eq!(grad.abs().sum(Kind::Float).double_value(&[]), 0.0);
            }
        }

        // The discriminator did receive gradients
        let disc_has_grad = model
            .disc_vs
            .trainable_variables()
            .iter()
            .any(|v| v.grad().defined() && v.grad().abs().sum(Kind::Float).double_value(&[]) > 0.0);
        assert!(disc_has_grad);
    }

    #[test]
    fn test_train_step_returns_losses() {
        let model = small_model();
        let mut gen_opt = model.gen_optimizer(AdamParams::default()).unwrap();
        let mut disc_opt = model.disc_optimizer(AdamParams::default()).unwrap();
        let (condition, target) = batch();

        let config = TrainingConfig::default();
        let (losses, candidate) =
            train_step(&model, &mut gen_opt, &mut disc_opt, &condition, &target, &config).unwrap();

        assert_eq!(candidate.size(), vec![2, 3, 32, 32]);
        assert!(!candidate.requires_grad());
        assert!(losses.disc_loss > 0.0);
        let expected = losses.gen_adv_loss + config.lambda_l1 * losses.gen_l1_loss;
        assert!((losses.gen_loss - expected).abs() < 1e-3);
    }

    #[test]
    fn test_train_writes_samples_and_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let sample_dir = dir.path().join("output");
        let checkpoint_dir = dir.path().join("checkpoints");

        let mut model = small_model();
        let mut loader = PairLoader::new(
            ConstantPairs { count: 5, size: 32 },
            LoaderOptions {
                batch_size: 2,
                shuffle: true,
                drop_last: true,
                random_flip: false,
            },
        );

        let config = TrainingConfig {
            epochs: 2,
            log_every: 1,
            sample_dir: sample_dir.to_str().unwrap().to_string(),
            checkpoint_every: 1,
            checkpoint_dir: checkpoint_dir.to_str().unwrap().to_string(),
            ..Default::default()
        };
        let mut trainer = Trainer::new(config, Device::Cpu);

        let metrics = trainer.train(&mut model, &mut loader).unwrap();
        assert_eq!(metrics.num_epochs(), 2);
        assert!(metrics.latest_gen_loss().unwrap().is_finite());

        assert!(sample_dir.join("0.png").exists());
        assert!(sample_dir.join("1.png").exists());
        assert!(checkpoint_dir.join("checkpoint_epoch_0002").join("generator.pt").exists());
        assert!(checkpoint_dir.join("checkpoint_final").join("meta.json").exists());

        // Two full batches of two pairs, tiled side by side
        let sample = tch::vision::image::load(sample_dir.join("1.png")).unwrap();
        assert_eq!(sample.size(), vec![3, 32, 64]);
    }
}
