//! Ports (trait boundaries) for external dependencies.
//!
//! This module defines the interfaces between the learning core and
//! infrastructure. Following hexagonal architecture, these traits are owned by
//! the domain and implemented by adapters (the simulator, the reference
//! predictor, weight stores, observers).

pub mod environment;
pub mod observer;
pub mod predictor;
pub mod repository;

pub use environment::Environment;
pub use observer::{EpisodeSummary, Observer, OptimizeReport};
pub use predictor::{Predictor, Tensor, Weights, sync_weights};
pub use repository::{ONLINE_WEIGHTS, TARGET_WEIGHTS, WeightStore};
