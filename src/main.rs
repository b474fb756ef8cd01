//! Pix2Pix for paired image-to-image translation
//!
//! Main entry point providing CLI interface for:
//! - Training a pix2pix model on a folder of image pairs
//! - Translating a single image with a trained generator
//! - Writing a default configuration file

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_pix2pix::{
    data::{transforms, PairDirection, PairLoader, PairedImageFolder},
    model::Pix2Pix,
    training::Trainer,
    utils::{load_model, save_samples, Config},
};

/// Pix2Pix conditional GAN
#[derive(Parser)]
#[command(name = "pix2pix")]
#[command(version = "0.1.0")]
#[command(about = "Train and run a pix2pix image-to-image translation model")]
struct Cli {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the pix2pix model
    Train {
        /// Image folder of side-by-side pairs (overrides config)
        #[arg(short, long)]
        data: Option<String>,

        /// Number of epochs (overrides config)
        #[arg(short, long)]
        epochs: Option<usize>,
    },

    /// Translate a single image with a trained generator
    Translate {
        /// Checkpoint directory containing generator.pt
        #[arg(short, long)]
        model: String,

        /// Input image
        #[arg(short, long)]
        input: String,

        /// Output PNG path
        #[arg(short, long, default_value = "translated.png")]
        output: String,

        /// Treat the input as a side-by-side pair and use its condition half
        #[arg(long)]
        paired: bool,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train { data, epochs } => {
            train_model(&cli.config, data, epochs)?;
        }
        Commands::Translate {
            model,
            input,
            output,
            paired,
        } => {
            translate_image(&cli.config, &model, &input, &output, paired)?;
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

/// Train the pix2pix model
fn train_model(config_path: &str, data: Option<String>, epochs: Option<usize>) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(data) = data {
        config.data.root = data;
    }
    if let Some(epochs) = epochs {
        config.training.epochs = epochs;
    }
    config.validate()?;

    // Determine device
    let device = config.get_device();
    info!("Using device: {:?}", device);

    // Load dataset
    info!("Loading image pairs from {}", config.data.root);
    let dataset = PairedImageFolder::open(
        &config.data.root,
        config.data.image_size,
        config.data.direction,
    )?;
    info!("Found {} pairs", dataset.files().len());

    let mut loader = PairLoader::new(dataset, config.loader_options());

    // Create model
    let mut model = Pix2Pix::new(
        config.generator_config(),
        config.discriminator_config(),
        device,
    )?;
    let (gen_params, disc_params) = model.parameter_counts();
    info!(
        "Created Pix2Pix: generator {} params, discriminator {} params",
        gen_params, disc_params
    );

    // Train
    let mut trainer = Trainer::new(config.training_config(), device);
    let metrics = trainer.train(&mut model, &mut loader)?;

    info!(
        "Training complete. Final G_loss: {:.4}, D_loss: {:.4}",
        metrics.latest_gen_loss().unwrap_or(0.0),
        metrics.latest_disc_loss().unwrap_or(0.0)
    );

    Ok(())
}

/// Translate one image with a trained generator
fn translate_image(
    config_path: &str,
    model_dir: &str,
    input: &str,
    output: &str,
    paired: bool,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let device = config.get_device();

    // The architecture comes from the checkpoint, not from the config file
    let (model, meta) = load_model(model_dir, device)?;
    info!(
        "Loaded generator of depth {} trained for {} epochs",
        meta.config.depth, meta.epoch
    );

    let image = tch::vision::image::load(input)?;
    let condition = if paired {
        let (a, b) = transforms::split_pair(&image)?;
        match config.data.direction {
            PairDirection::AToB => a,
            PairDirection::BToA => b,
        }
    } else {
        image
    };

    let size = config.data.image_size;
    let condition = transforms::to_signed_unit(&tch::vision::image::resize(&condition, size, size)?);
    let candidate = model.translate(&condition.unsqueeze(0))?;

    save_samples(&candidate, output)?;
    info!("Saved translated image to {}", output);

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();

    if output_path.ends_with(".toml") {
        config.save_toml(output_path)?;
    } else {
        config.save_json(output_path)?;
    }

    info!("Created default configuration at {}", output_path);
    Ok(())
}
