//! Reinforcement-learning agent for the side-scrolling dino game
//!
//! This crate provides:
//! - A fixed-length state encoding of game observations
//! - A reference simulator of the game as an alternating-turn MDP
//! - Prioritized replay memory with multi-step return aggregation
//! - Categorical (C51) distributional Double-Q updates
//! - Training and play pipelines with pluggable predictors and weight stores

pub mod adapters;
pub mod agent;
pub mod categorical;
pub mod cli;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod replay;
pub mod simulator;
pub mod types;

pub use agent::{Agent, AgentConfig, EpsilonSchedule, StopFlag, TimingVerdict, TimingWindow};
pub use categorical::{CategoricalSupport, ValueDistribution, kl_divergence};
pub use encoder::encode;
pub use error::{Error, Result};
pub use replay::{MultiStepAggregator, ReplayMemory};
pub use simulator::Simulator;
pub use types::{Action, Experience, FeatureVector, GameState, ObstacleObservation};
