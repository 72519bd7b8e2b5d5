//! Observer implementations for the training pipeline
//!
//! Observers allow composable reporting during training without coupling
//! training logic to specific output formats.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    Result,
    ports::{EpisodeSummary, Observer, OptimizeReport},
};

/// Separator written once at the start of every training session.
pub fn session_separator() -> String {
    format!("\n\n{}\n\n", "-".repeat(66))
}

/// Episode log line.
pub fn episode_line(summary: &EpisodeSummary) -> String {
    format!(
        "Episode: {}, Epsilon: {}, Total Reward: {}\n",
        summary.episode, summary.epsilon, summary.total_reward
    )
}

/// Appends one line per episode to a plain-text log file.
///
/// Write failures are reported as warnings and never abort training.
pub struct EpisodeLogObserver {
    path: PathBuf,
    file: Option<File>,
}

impl EpisodeLogObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, text: &str) {
        if self.file.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => self.file = Some(file),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "failed to open episode log");
                    return;
                }
            }
        }
        if let Some(file) = &mut self.file
            && let Err(e) = file.write_all(text.as_bytes())
        {
            warn!(path = %self.path.display(), error = %e, "failed to write episode log");
        }
    }
}

impl Observer for EpisodeLogObserver {
    fn on_training_start(&mut self, _total_episodes: usize) -> Result<()> {
        self.append(&session_separator());
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.append(&episode_line(summary));
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        if let Some(file) = &mut self.file
            && let Err(e) = file.flush()
        {
            warn!(path = %self.path.display(), error = %e, "failed to flush episode log");
        }
        Ok(())
    }
}

/// Progress bar observer - Shows training progress
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    high_score: usize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            high_score: 0,
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_training_start(&mut self, total_episodes: usize) -> Result<()> {
        let pb = ProgressBar::new(total_episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.high_score = self.high_score.max(summary.score);
        if let Some(pb) = &self.progress_bar {
            pb.set_position(summary.episode as u64);
            pb.set_message(format!(
                "score {} best {} eps {:.2}",
                summary.score, self.high_score, summary.epsilon
            ));
        }
        Ok(())
    }

    fn on_training_end(&mut self) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("best {}", self.high_score));
        }
        Ok(())
    }
}

/// Aggregated learning metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub episodes: usize,
    pub optimizer_steps: usize,
    pub target_syncs: usize,
    pub late_observations: usize,
    pub anomalies: usize,
    /// Mean TD error of the most recent batch update
    pub last_td_error: Option<f64>,
    pub mean_td_error: Option<f64>,
    pub mean_loss: Option<f64>,
}

/// Metrics observer - Tracks learning signals across the run
///
/// Clones share the same metrics, so a handle can be kept after the
/// observer is boxed into a pipeline.
#[derive(Clone, Default)]
pub struct MetricsObserver {
    metrics: Arc<Mutex<TrainingMetrics>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the metrics collected so far.
    pub fn metrics(&self) -> TrainingMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut TrainingMetrics)) {
        f(&mut self.metrics.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

fn running_mean(mean: Option<f64>, count: usize, value: f64) -> f64 {
    match mean {
        Some(mean) => mean + (value - mean) / count as f64,
        None => value,
    }
}

impl Observer for MetricsObserver {
    fn on_optimize(&mut self, _episode: usize, report: &OptimizeReport) -> Result<()> {
        self.update(|m| {
            m.optimizer_steps += 1;
            if report.target_synced {
                m.target_syncs += 1;
            }
            m.last_td_error = Some(report.avg_td_error);
            m.mean_td_error = Some(running_mean(
                m.mean_td_error,
                m.optimizer_steps,
                report.avg_td_error,
            ));
            m.mean_loss = Some(running_mean(m.mean_loss, m.optimizer_steps, report.loss));
        });
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.update(|m| {
            m.episodes += 1;
            m.late_observations += summary.late_observations;
            m.anomalies += summary.anomalies;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn summary(episode: usize) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            epsilon: 0.5,
            total_reward: 1.5,
            score: 15,
            late_observations: 1,
            anomalies: 0,
            optimizer_steps: 2,
        }
    }

    #[test]
    fn test_episode_log_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.txt");
        let mut observer = EpisodeLogObserver::new(&path);
        observer.on_training_start(2).unwrap();
        observer.on_episode_end(&summary(1)).unwrap();
        observer.on_training_end().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let expected = format!(
            "\n\n{}\n\nEpisode: 1, Epsilon: 0.5, Total Reward: 1.5\n",
            "-".repeat(66)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_episode_log_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut observer = EpisodeLogObserver::new(dir.path().join("missing").join("logs.txt"));
        assert!(observer.on_training_start(1).is_ok());
        assert!(observer.on_episode_end(&summary(1)).is_ok());
    }

    #[test]
    fn test_metrics_handle_shares_state() {
        let observer = MetricsObserver::new();
        let mut boxed: Box<dyn Observer> = Box::new(observer.clone());
        let report = OptimizeReport {
            avg_td_error: 0.4,
            avg_terminal_td_error: None,
            loss: 2.0,
            target_synced: true,
        };
        boxed.on_optimize(1, &report).unwrap();
        boxed
            .on_optimize(
                1,
                &OptimizeReport {
                    avg_td_error: 0.2,
                    target_synced: false,
                    ..report
                },
            )
            .unwrap();
        boxed.on_episode_end(&summary(1)).unwrap();

        let metrics = observer.metrics();
        assert_eq!(metrics.optimizer_steps, 2);
        assert_eq!(metrics.target_syncs, 1);
        assert_eq!(metrics.late_observations, 1);
        assert_eq!(metrics.last_td_error, Some(0.2));
        assert!((metrics.mean_td_error.unwrap() - 0.3).abs() < 1e-12);
    }
}
