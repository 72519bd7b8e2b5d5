//! Training and play pipelines
//!
//! This module provides:
//! - Training an agent over many episodes with checkpointing
//! - Greedy play with a saved model
//! - Observers recording progress, episode logs and metrics

pub mod observers;
pub mod play;
pub mod training;

pub use observers::{EpisodeLogObserver, MetricsObserver, ProgressObserver, TrainingMetrics};
pub use play::{PlayConfig, PlayResult, play};
pub use training::{
    TrainingConfig, TrainingPipeline, TrainingResult, restore_weights, resume_training,
    save_weights,
};

pub use crate::ports::Observer;
