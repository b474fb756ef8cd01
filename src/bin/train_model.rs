//! Standalone binary for training a pix2pix model
//!
//! Usage:
//!   cargo run --bin train_model -- --data data/facades/train --epochs 200

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_pix2pix::{
    data::{LoaderOptions, PairDirection, PairLoader, PairedImageFolder},
    model::{AdamParams, DiscriminatorConfig, GeneratorConfig, Pix2Pix},
    training::{GanMode, Trainer, TrainingConfig},
};

/// Train pix2pix on a folder of side-by-side image pairs
#[derive(Parser)]
#[command(name = "train_model")]
#[command(about = "Train pix2pix on paired images")]
struct Args {
    /// Image folder of side-by-side pairs
    #[arg(short, long)]
    data: String,

    /// Number of training epochs
    #[arg(short, long, default_value = "100")]
    epochs: usize,

    /// Batch size
    #[arg(short, long, default_value = "4")]
    batch_size: usize,

    /// Side length of training images
    #[arg(long, default_value = "256")]
    image_size: i64,

    /// Learning rate of both networks
    #[arg(long, default_value = "0.0002")]
    lr: f64,

    /// Weight of the L1 reconstruction loss
    #[arg(long, default_value = "100.0")]
    lambda_l1: f64,

    /// Use least squares instead of cross entropy adversarial loss
    #[arg(long)]
    lsgan: bool,

    /// Use the right half of each pair as the condition
    #[arg(long)]
    reverse: bool,

    /// Randomly mirror pairs horizontally
    #[arg(long)]
    flip: bool,

    /// Directory for per-epoch sample images
    #[arg(long, default_value = "output")]
    sample_dir: String,

    /// Checkpoint directory
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: String,

    /// Save checkpoint every N epochs (0 = only at the end)
    #[arg(long, default_value = "0")]
    checkpoint_every: usize,

    /// Use GPU if available
    #[arg(long)]
    gpu: bool,
}

fn main() -> Result<()> {
    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    // Determine device
    let device = if args.gpu && tch::Cuda::is_available() {
        info!("Using CUDA GPU");
        tch::Device::Cuda(0)
    } else {
        info!("Using CPU");
        tch::Device::Cpu
    };

    let gen_config = GeneratorConfig::default();
    let divisor = gen_config.resolution_divisor();
    if args.image_size % divisor != 0 {
        anyhow::bail!(
            "Image size {} must be a multiple of {}",
            args.image_size,
            divisor
        );
    }

    // Load data
    let direction = if args.reverse {
        PairDirection::BToA
    } else {
        PairDirection::AToB
    };
    info!("Loading image pairs from {}", args.data);
    let dataset = PairedImageFolder::open(&args.data, args.image_size, direction)?;
    info!("Found {} pairs", dataset.files().len());

    let mut loader = PairLoader::new(
        dataset,
        LoaderOptions {
            batch_size: args.batch_size,
            shuffle: true,
            drop_last: false,
            random_flip: args.flip,
        },
    );

    // Create model
    let mut model = Pix2Pix::new(gen_config, DiscriminatorConfig::default(), device)?;

    let training_config = TrainingConfig {
        epochs: args.epochs,
        adam: AdamParams {
            lr: args.lr,
            ..Default::default()
        },
        lambda_l1: args.lambda_l1,
        gan_mode: if args.lsgan { GanMode::Lsgan } else { GanMode::Vanilla },
        sample_dir: args.sample_dir.clone(),
        checkpoint_every: args.checkpoint_every,
        checkpoint_dir: args.checkpoint_dir.clone(),
        ..Default::default()
    };

    info!("Starting training for {} epochs", args.epochs);
    info!("  Learning rate: {}", args.lr);
    info!("  L1 weight: {}", args.lambda_l1);

    let mut trainer = Trainer::new(training_config, device);
    let metrics = trainer.train(&mut model, &mut loader)?;

    // Print final results
    info!("Training complete!");
    info!(
        "Final metrics: G_loss={:.4}, D_loss={:.4}, L1={:.4}",
        metrics.latest_gen_loss().unwrap_or(0.0),
        metrics.latest_disc_loss().unwrap_or(0.0),
        metrics.latest_l1_loss().unwrap_or(0.0)
    );
    info!(
        "Generator saved to {}/checkpoint_final/generator.pt",
        args.checkpoint_dir
    );

    Ok(())
}
