//! Training metrics for monitoring pix2pix progress
//!
//! Provides structures for tracking and logging training progress.

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Total generator losses per epoch
    pub gen_losses: Vec<f64>,
    /// Adversarial part of the generator loss per epoch
    pub gen_adv_losses: Vec<f64>,
    /// L1 part of the generator loss per epoch (unweighted)
    pub gen_l1_losses: Vec<f64>,
    /// Discriminator losses per epoch
    pub disc_losses: Vec<f64>,
}

/// Per-epoch averages handed to [`TrainingMetrics::record_epoch`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochSummary {
    pub gen_loss: f64,
    pub gen_adv_loss: f64,
    pub gen_l1_loss: f64,
    pub disc_loss: f64,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record epoch metrics
    pub fn record_epoch(&mut self, summary: EpochSummary) {
        self.gen_losses.push(summary.gen_loss);
        self.gen_adv_losses.push(summary.gen_adv_loss);
        self.gen_l1_losses.push(summary.gen_l1_loss);
        self.disc_losses.push(summary.disc_loss);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.gen_losses.len()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.gen_losses.last().copied()
    }

    /// Get latest discriminator loss
    pub fn latest_disc_loss(&self) -> Option<f64> {
        self.disc_losses.last().copied()
    }

    /// Get latest L1 reconstruction loss
    pub fn latest_l1_loss(&self) -> Option<f64> {
        self.gen_l1_losses.last().copied()
    }

    /// Check if the discriminator has overpowered the generator
    ///
    /// Indicators over the last `window` epochs:
    /// - Discriminator loss very low (separates pairs trivially)
    /// - Generator adversarial loss high (cannot fool it)
    pub fn check_discriminator_dominance(&self, window: usize) -> bool {
        if window == 0 || self.num_epochs() < window {
            return false;
        }

        let disc_ma = moving_average(&self.disc_losses, window);
        let adv_ma = moving_average(&self.gen_adv_losses, window);

        disc_ma < 0.05 && adv_ma > 5.0
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: &str) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "gen_loss", "gen_adv_loss", "gen_l1_loss", "disc_loss"])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                (i + 1).to_string(),
                self.gen_losses[i].to_string(),
                self.gen_adv_losses[i].to_string(),
                self.gen_l1_losses[i].to_string(),
                self.disc_losses[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EMATracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EMATracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}
