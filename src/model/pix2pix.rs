//! Pix2Pix wrapper combining Generator and Discriminator
//!
//! Each network owns a separate `VarStore`, so the two parameter sets are
//! disjoint and each optimizer can only ever touch its own network.

use tch::{nn, nn::VarStore, Device, Tensor};

use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};
use crate::error::Result;

/// Adam hyperparameters used for both networks
#[derive(Debug, Clone, Copy)]
pub struct AdamParams {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            lr: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
        }
    }
}

/// Complete pix2pix model
pub struct Pix2Pix {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl Pix2Pix {
    /// Create a new pix2pix model
    pub fn new(
        gen_config: GeneratorConfig,
        disc_config: DiscriminatorConfig,
        device: Device,
    ) -> Result<Self> {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&(gen_vs.root() / "generator"), gen_config)?;
        let discriminator = Discriminator::new(&(disc_vs.root() / "discriminator"), disc_config);

        Ok(Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        })
    }

    /// Create the standard 256x256 RGB -> RGB model
    pub fn with_defaults(device: Device) -> Result<Self> {
        Self::new(
            GeneratorConfig::default(),
            DiscriminatorConfig::default(),
            device,
        )
    }

    /// Translate condition images (inference mode)
    pub fn translate(&self, condition: &Tensor) -> Result<Tensor> {
        self.generator.translate(&condition.to_device(self.device))
    }

    /// Get generator optimizer
    pub fn gen_optimizer(&self, params: AdamParams) -> Result<nn::Optimizer> {
        build_adam(&self.gen_vs, params)
    }

    /// Get discriminator optimizer
    pub fn disc_optimizer(&self, params: AdamParams) -> Result<nn::Optimizer> {
        build_adam(&self.disc_vs, params)
    }

    /// Save both networks' weights
    pub fn save(&self, gen_path: &str, disc_path: &str) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load generator weights only (enough for translation)
    pub fn load_generator(&mut self, gen_path: &str) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        Ok(())
    }

    /// Number of trainable scalars in (generator, discriminator)
    pub fn parameter_counts(&self) -> (i64, i64) {
        let count = |vs: &VarStore| -> i64 {
            vs.trainable_variables().iter().map(|t| t.numel() as i64).sum()
        };
        (count(&self.gen_vs), count(&self.disc_vs))
    }
}

fn build_adam(vs: &VarStore, params: AdamParams) -> Result<nn::Optimizer> {
    let opt = nn::Adam {
        beta1: params.beta1,
        beta2: params.beta2,
        ..Default::default()
    }
    .build(vs, params.lr)?;
    Ok(opt)
}
