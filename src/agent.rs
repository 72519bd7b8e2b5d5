//! Distributional Double-Q agent
//!
//! The agent plays episodes against an [`Environment`], stores multi-step
//! transitions in prioritized replay memory and periodically fits the online
//! [`Predictor`] towards projected categorical targets. A second predictor
//! serves as the target network and is synchronized on a fixed cadence.

pub mod config;
pub mod timing;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, error, info, warn};

pub use config::{AgentConfig, EpsilonSchedule, RewardConfig};
pub use timing::{TimingVerdict, TimingWindow};

use crate::{
    Error, Result,
    categorical::{CategoricalSupport, kl_divergence},
    encoder::encode,
    ports::{Environment, EpisodeSummary, OptimizeReport, Predictor, sync_weights},
    replay::{MultiStepAggregator, ReplayMemory},
    types::{Action, Experience, FeatureVector, GameState, NUM_ACTIONS},
};

/// Cooperative cancellation flag shared between the training loop and a
/// signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one training episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub summary: EpisodeSummary,
    /// The stop flag was raised before the episode finished
    pub interrupted: bool,
}

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Learning agent over an environment `E` and predictor `P`.
#[derive(Debug)]
pub struct Agent<E, P> {
    env: E,
    online: P,
    target: P,
    memory: ReplayMemory,
    aggregator: MultiStepAggregator,
    support: CategoricalSupport,
    config: AgentConfig,
    epsilon: f64,
    /// Calls to `maybe_optimize` once memory holds a full batch
    steps: usize,
    optimizer_steps: usize,
    high_score: usize,
    rng: StdRng,
}

impl<E: Environment, P: Predictor> Agent<E, P> {
    /// Create an agent; the target network starts as a copy of `online`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for an invalid config or
    /// predictors whose shape does not match it.
    pub fn new(env: E, online: P, mut target: P, config: AgentConfig) -> Result<Self> {
        config.validate()?;
        for predictor in [&online, &target] {
            if predictor.num_actions() != NUM_ACTIONS || predictor.atoms() != config.atoms {
                return Err(Error::config(format!(
                    "predictor shape {}x{} does not match {NUM_ACTIONS} actions x {} atoms",
                    predictor.num_actions(),
                    predictor.atoms(),
                    config.atoms
                )));
            }
        }
        sync_weights(&online, &mut target)?;

        Ok(Self {
            env,
            online,
            target,
            memory: ReplayMemory::new(config.memory_capacity, config.priority)?,
            aggregator: MultiStepAggregator::new(config.multi_steps, config.gamma)?,
            support: CategoricalSupport::new(config.v_min, config.v_max, config.atoms)?,
            epsilon: config.epsilon,
            config,
            steps: 0,
            optimizer_steps: 0,
            high_score: 0,
            rng: build_rng(None),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    pub fn high_score(&self) -> usize {
        self.high_score
    }

    pub fn optimizer_steps(&self) -> usize {
        self.optimizer_steps
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn support(&self) -> &CategoricalSupport {
        &self.support
    }

    pub fn online(&self) -> &P {
        &self.online
    }

    pub fn online_mut(&mut self) -> &mut P {
        &mut self.online
    }

    pub fn target(&self) -> &P {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut P {
        &mut self.target
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Greedy action on the online network's expected values.
    pub fn greedy_action(&self, state: &FeatureVector) -> Result<Action> {
        let dist = self.online.predict(state)?;
        Action::from_index(self.support.greedy_action(&dist))
    }

    /// ε-greedy action selection
    pub fn select_action(&mut self, state: &FeatureVector) -> Result<Action> {
        if self.rng.random::<f64>() < self.epsilon {
            Action::from_index(self.rng.random_range(0..NUM_ACTIONS))
        } else {
            self.greedy_action(state)
        }
    }

    /// Store a transition, initially with a high raw priority so it is
    /// sampled soon.
    pub fn remember(&mut self, experience: Experience) {
        self.memory.add(experience, self.config.initial_priority);
    }

    /// Apply the epsilon schedule once.
    pub fn decay_epsilon(&mut self) {
        self.epsilon = self.config.epsilon_schedule.apply(self.epsilon);
    }

    /// Run a batch update every `batch_size` calls once memory holds a full
    /// batch.
    pub fn maybe_optimize(&mut self) -> Result<Option<OptimizeReport>> {
        if self.memory.len() < self.config.batch_size {
            return Ok(None);
        }
        let due = self.steps % self.config.batch_size == 0;
        self.steps += 1;
        if due { self.optimize().map(Some) } else { Ok(None) }
    }

    /// One prioritized, categorical Double-Q batch update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientExperience`] if memory holds less than a
    /// batch, or any predictor error.
    pub fn optimize(&mut self) -> Result<OptimizeReport> {
        let batch = self.memory.sample(
            &mut self.rng,
            self.config.batch_size,
            self.config.priority_scale,
        )?;
        let indices = batch.indices;
        let experiences: Vec<Experience> = batch.experiences.into_iter().cloned().collect();

        let states: Vec<FeatureVector> = experiences.iter().map(|e| e.state.clone()).collect();
        let next_states: Vec<FeatureVector> =
            experiences.iter().map(|e| e.next_state.clone()).collect();

        let current = self.online.predict_batch(&states)?;
        let next_online = self.online.predict_batch(&next_states)?;
        let next_target = self.target.predict_batch(&next_states)?;
        let discount = self.aggregator.bootstrap_discount();

        let mut targets = Vec::with_capacity(experiences.len());
        let mut priorities = Vec::with_capacity(experiences.len());
        let mut terminal_errors = Vec::new();

        for (((experience, mut target), online_next), target_next) in experiences
            .iter()
            .zip(current)
            .zip(&next_online)
            .zip(&next_target)
        {
            let next_action = self.support.greedy_action(online_next);
            let action = experience.action.index();
            let projected = self.support.project(
                experience.reward,
                discount,
                experience.done,
                target_next.action(next_action),
            )?;

            let td_error = kl_divergence(&projected, target.action(action));
            if experience.done {
                terminal_errors.push(td_error);
            }
            priorities.push(td_error);
            target.set_action(action, &projected)?;
            targets.push(target);
        }

        self.memory.update_priorities(&indices, &priorities)?;
        let loss = self.online.fit(&states, &targets)?;
        self.optimizer_steps += 1;

        let avg_td_error = mean(&priorities).unwrap_or_default();
        let avg_terminal_td_error = mean(&terminal_errors);
        debug!(
            avg_td_error,
            ?avg_terminal_td_error,
            loss,
            step = self.optimizer_steps,
            "batch update"
        );

        let target_synced = self.optimizer_steps % self.config.target_update_interval == 0;
        if target_synced {
            sync_weights(&self.online, &mut self.target)?;
            info!(step = self.optimizer_steps, "target network synchronized");
        }

        Ok(OptimizeReport {
            avg_td_error,
            avg_terminal_td_error,
            loss,
            target_synced,
        })
    }

    fn begin_episode(&mut self) -> Result<GameState> {
        self.env.restart()?;
        self.env.pause(Duration::from_millis(self.config.settle_ms));
        self.env.start()?;
        self.env.observe()
    }

    /// Poll until at least the window minimum has passed since `previous_ms`,
    /// the episode ended, or the poll budget ran out.
    fn wait_next_observation(&mut self, previous_ms: f64) -> Result<GameState> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut next = self.env.observe()?;
        let mut polls = 0;
        while !next.done
            && next.time - previous_ms < self.config.timing.min_ms
            && polls < self.config.max_polls
        {
            self.env.pause(interval);
            next = self.env.observe()?;
            polls += 1;
        }
        Ok(next)
    }

    fn store_all(&mut self, experiences: Vec<Experience>) {
        for experience in experiences {
            self.remember(experience);
        }
    }

    /// Play and learn from one episode.
    ///
    /// `on_optimize` is called after every batch update. The episode ends on
    /// a terminal observation, after `max_steps` actions, or when `stop` is
    /// raised. Epsilon is decayed when the episode was not interrupted.
    pub fn run_episode<F>(
        &mut self,
        episode: usize,
        max_steps: Option<usize>,
        stop: &StopFlag,
        mut on_optimize: F,
    ) -> Result<EpisodeOutcome>
    where
        F: FnMut(&OptimizeReport) -> Result<()>,
    {
        let mut summary = EpisodeSummary {
            episode,
            epsilon: self.epsilon,
            total_reward: 0.0,
            score: 0,
            late_observations: 0,
            anomalies: 0,
            optimizer_steps: 0,
        };
        let mut interrupted = false;
        let mut actions = 0;

        self.aggregator.clear();
        let mut state = self.begin_episode()?;

        while !state.done {
            if stop.is_stopped() {
                interrupted = true;
                break;
            }
            if max_steps.is_some_and(|max| actions >= max) {
                let pending = self.aggregator.drain();
                self.store_all(pending);
                break;
            }

            let features = encode(&state);
            let action = self.select_action(&features)?;
            self.env.perform_action(action)?;
            actions += 1;

            // The optimization fills the time until the next observation.
            if let Some(report) = self.maybe_optimize()? {
                summary.optimizer_steps += 1;
                on_optimize(&report)?;
            }

            let next = self.wait_next_observation(state.time)?;
            let delta = next.time - state.time;

            match self.config.timing.classify(delta, next.done) {
                TimingVerdict::Late => {
                    warn!(delta, "observation arrived late, transition discarded");
                    summary.late_observations += 1;
                }
                TimingVerdict::Anomaly => {
                    error!(delta, "observation arrived early without terminal state");
                    summary.anomalies += 1;
                }
                TimingVerdict::LateTerminal => {
                    match self.aggregator.impute_terminal(self.config.rewards.crash) {
                        Some(experiences) => self.store_all(experiences),
                        None => warn!("lost terminal state, no pending transition to amend"),
                    }
                }
                TimingVerdict::Accept => {
                    let reward = self.config.rewards.reward(action, next.done);
                    if !next.done {
                        summary.score += 1;
                    }
                    summary.total_reward += reward;

                    let transition = Experience {
                        state: features,
                        action,
                        reward,
                        next_state: encode(&next),
                        done: next.done,
                    };
                    let ready = self.aggregator.push(transition);
                    self.store_all(ready);
                }
            }

            state = next;
        }

        if !interrupted {
            self.decay_epsilon();
        }
        self.high_score = self.high_score.max(summary.score);
        info!(
            episode,
            score = summary.score,
            high_score = self.high_score,
            total_reward = summary.total_reward,
            epsilon = summary.epsilon,
            "episode finished"
        );

        Ok(EpisodeOutcome {
            summary,
            interrupted,
        })
    }

    /// Play one greedy episode without learning and return its score
    /// (actions whose next observation was not terminal).
    pub fn play_episode(&mut self, max_steps: Option<usize>, stop: &StopFlag) -> Result<usize> {
        let mut state = self.begin_episode()?;
        let mut score = 0;
        while !state.done && !stop.is_stopped() && max_steps.is_none_or(|max| score < max) {
            let action = self.greedy_action(&encode(&state))?;
            self.env.perform_action(action)?;
            state = self.wait_next_observation(state.time)?;
            if !state.done {
                score += 1;
            }
        }
        self.high_score = self.high_score.max(score);
        Ok(score)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
