//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Sample image output

mod config;
mod checkpoint;
mod samples;

pub use config::{Config, DataConfig, ModelConfig, TrainingConfigFile};
pub use checkpoint::{load_checkpoint_meta, load_generator, load_model, save_checkpoint, CheckpointMeta};
pub use samples::{save_samples, tile_batch};
