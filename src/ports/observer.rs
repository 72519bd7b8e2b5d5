//! Observer port - abstraction for training observation
//!
//! Observers receive training lifecycle events so that progress display,
//! episode logs and metrics stay decoupled from the training loop.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Summary of one finished episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// 1-based episode number
    pub episode: usize,
    /// Exploration rate the episode was played with
    pub epsilon: f64,
    /// Sum of shaped rewards of accepted transitions
    pub total_reward: f64,
    /// Accepted non-terminal steps
    pub score: usize,
    /// Observations discarded as late
    pub late_observations: usize,
    /// Observations discarded as anomalous
    pub anomalies: usize,
    /// Optimizer steps run during the episode
    pub optimizer_steps: usize,
}

/// Outcome of one batch update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    /// Mean KL divergence over the batch
    pub avg_td_error: f64,
    /// Mean KL divergence over terminal samples, if the batch held any
    pub avg_terminal_td_error: Option<f64>,
    /// Loss reported by the predictor's fit step
    pub loss: f64,
    /// Whether the target network was synchronized after this step
    pub target_synced: bool,
}

/// Observer trait for monitoring training
///
/// # Event Sequence
///
/// 1. `on_training_start(total_episodes)` - once
/// 2. For each episode:
///    - `on_episode_start(episode)`
///    - `on_optimize(episode, report)` - after every batch update
///    - `on_episode_end(summary)`
/// 3. `on_training_end()` - once, also when training is stopped early
///
/// # Examples
///
/// ```no_run
/// use dino_dqn::ports::{EpisodeSummary, Observer};
///
/// struct BestScore(usize);
///
/// impl Observer for BestScore {
///     fn on_episode_end(&mut self, summary: &EpisodeSummary) -> dino_dqn::Result<()> {
///         self.0 = self.0.max(summary.score);
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called once before the first episode.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn on_training_start(&mut self, _total_episodes: usize) -> Result<()> {
        Ok(())
    }

    /// Called when an episode starts (`episode` is 1-based).
    fn on_episode_start(&mut self, _episode: usize) -> Result<()> {
        Ok(())
    }

    /// Called after every batch update.
    fn on_optimize(&mut self, _episode: usize, _report: &OptimizeReport) -> Result<()> {
        Ok(())
    }

    /// Called when an episode ends.
    fn on_episode_end(&mut self, _summary: &EpisodeSummary) -> Result<()> {
        Ok(())
    }

    /// Called once after the last episode.
    ///
    /// # Default Implementation
    ///
    /// Does nothing. Override to flush outputs or finish progress bars.
    fn on_training_end(&mut self) -> Result<()> {
        Ok(())
    }
}
