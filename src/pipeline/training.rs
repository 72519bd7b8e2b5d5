//! Training pipeline for the learning agent

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    Result,
    agent::{Agent, StopFlag},
    ports::{Environment, Observer, ONLINE_WEIGHTS, Predictor, TARGET_WEIGHTS, WeightStore},
};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training episodes
    pub episodes: usize,

    /// Random seed
    pub seed: Option<u64>,

    /// Truncate episodes after this many actions
    pub max_steps_per_episode: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 100,
            seed: None,
            max_steps_per_episode: None,
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Episodes that ran to completion
    pub episodes: usize,

    /// Whether the run was stopped early
    pub interrupted: bool,

    /// Best episode score
    pub high_score: usize,

    /// Mean episode score
    pub average_score: f64,

    /// Mean total reward per episode
    pub average_reward: f64,

    /// Batch updates performed
    pub optimizer_steps: usize,

    /// Exploration rate after the last episode
    pub final_epsilon: f64,
}

impl TrainingResult {
    /// Save result to JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load result from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let result = serde_json::from_reader(file)?;
        Ok(result)
    }
}

/// Load saved weights into the agent.
///
/// A missing target set is replaced by a copy of the online weights.
/// Returns `false` when no online weights are stored.
pub fn restore_weights<E, P, S>(agent: &mut Agent<E, P>, store: &S) -> Result<bool>
where
    E: Environment,
    P: Predictor,
    S: WeightStore + ?Sized,
{
    let Some(online) = store.load(ONLINE_WEIGHTS)? else {
        return Ok(false);
    };
    agent.online_mut().set_weights(&online)?;
    let target = store.load(TARGET_WEIGHTS)?.unwrap_or(online);
    agent.target_mut().set_weights(&target)?;
    info!(location = %store.location(), "loaded saved weights");
    Ok(true)
}

/// Restore saved weights before continuing training.
///
/// A restored model starts greedy (epsilon 0) so that its behaviour is not
/// buried under random play; the schedule stays at its floor from there.
/// Returns whether weights were found.
///
/// # Errors
///
/// Propagates store and [`Predictor::set_weights`] failures.
pub fn resume_training<E, P, S>(agent: &mut Agent<E, P>, store: &S) -> Result<bool>
where
    E: Environment,
    P: Predictor,
    S: WeightStore + ?Sized,
{
    if !restore_weights(agent, store)? {
        return Ok(false);
    }
    agent.set_epsilon(0.0);
    info!("resuming from saved model with epsilon 0");
    Ok(true)
}

/// Save online and target weights.
pub fn save_weights<E, P, S>(agent: &Agent<E, P>, store: &S) -> Result<()>
where
    E: Environment,
    P: Predictor,
    S: WeightStore + ?Sized,
{
    store.save(ONLINE_WEIGHTS, &agent.online().weights())?;
    store.save(TARGET_WEIGHTS, &agent.target().weights())?;
    info!(location = %store.location(), "checkpoint saved");
    Ok(())
}

/// Training pipeline driving an agent for a number of episodes
pub struct TrainingPipeline {
    config: TrainingConfig,
    observers: Vec<Box<dyn Observer>>,
}

impl TrainingPipeline {
    /// Create a new training pipeline
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Add an observer to the pipeline
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Train the agent, checkpointing to `store`.
    ///
    /// Weights are saved after every episode that synchronized the target
    /// network and once at the end, including when `stop` was raised. When
    /// an episode fails, a best-effort checkpoint is attempted before the
    /// error is returned.
    pub fn run<E, P, S>(
        &mut self,
        agent: &mut Agent<E, P>,
        store: &S,
        stop: &StopFlag,
    ) -> Result<TrainingResult>
    where
        E: Environment,
        P: Predictor,
        S: WeightStore + ?Sized,
    {
        for observer in &mut self.observers {
            observer.on_training_start(self.config.episodes)?;
        }

        let result = match self.train(agent, store, stop) {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "training failed, saving checkpoint");
                if let Err(save_err) = save_weights(agent, store) {
                    warn!(error = %save_err, "checkpoint after failure could not be saved");
                }
                return Err(err);
            }
        };

        save_weights(agent, store)?;
        for observer in &mut self.observers {
            observer.on_training_end()?;
        }

        info!(
            episodes = result.episodes,
            high_score = result.high_score,
            interrupted = result.interrupted,
            "training finished"
        );
        Ok(result)
    }

    fn train<E, P, S>(
        &mut self,
        agent: &mut Agent<E, P>,
        store: &S,
        stop: &StopFlag,
    ) -> Result<TrainingResult>
    where
        E: Environment,
        P: Predictor,
        S: WeightStore + ?Sized,
    {
        let mut completed = 0;
        let mut interrupted = false;
        let mut total_score = 0;
        let mut total_reward = 0.0;

        for episode in 1..=self.config.episodes {
            if stop.is_stopped() {
                interrupted = true;
                break;
            }

            for observer in &mut self.observers {
                observer.on_episode_start(episode)?;
            }

            let observers = &mut self.observers;
            let mut synced = false;
            let outcome = agent.run_episode(
                episode,
                self.config.max_steps_per_episode,
                stop,
                |report| {
                    synced |= report.target_synced;
                    for observer in observers.iter_mut() {
                        observer.on_optimize(episode, report)?;
                    }
                    Ok(())
                },
            )?;

            if synced {
                save_weights(agent, store)?;
            }
            if outcome.interrupted {
                interrupted = true;
                break;
            }

            completed += 1;
            total_score += outcome.summary.score;
            total_reward += outcome.summary.total_reward;
            for observer in &mut self.observers {
                observer.on_episode_end(&outcome.summary)?;
            }
        }

        let average = |total: f64| {
            if completed > 0 {
                total / completed as f64
            } else {
                0.0
            }
        };

        Ok(TrainingResult {
            episodes: completed,
            interrupted,
            high_score: agent.high_score(),
            average_score: average(total_score as f64),
            average_reward: average(total_reward),
            optimizer_steps: agent.optimizer_steps(),
            final_epsilon: agent.epsilon(),
        })
    }
}
