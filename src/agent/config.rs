//! Agent configuration

use serde::{Deserialize, Serialize};

use super::timing::TimingWindow;
use crate::{Error, Result, replay::PriorityParams, types::Action};

/// Per-episode exploration decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    /// `epsilon <- max(epsilon - decrement, min)`
    Linear { decrement: f64, min: f64 },
    /// `epsilon <- max(epsilon * factor, min)`
    Exponential { factor: f64, min: f64 },
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule::Linear {
            decrement: 0.01,
            min: 0.0,
        }
    }
}

impl EpsilonSchedule {
    /// Exploration rate for the next episode.
    pub fn apply(&self, epsilon: f64) -> f64 {
        match *self {
            EpsilonSchedule::Linear { decrement, min } => (epsilon - decrement).max(min),
            EpsilonSchedule::Exponential { factor, min } => (epsilon * factor).max(min),
        }
    }

    fn validate(&self) -> Result<()> {
        let (rate_ok, min) = match *self {
            EpsilonSchedule::Linear { decrement, min } => (decrement >= 0.0, min),
            EpsilonSchedule::Exponential { factor, min } => ((0.0..=1.0).contains(&factor), min),
        };
        if !rate_ok || !(0.0..=1.0).contains(&min) {
            return Err(Error::config(format!("invalid epsilon schedule {self:?}")));
        }
        Ok(())
    }
}

/// Shaped rewards for accepted transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub crash: f64,
    /// Jumping is made cheaper than surviving to discourage random jumps
    pub jump: f64,
    pub survive: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            crash: -1.0,
            jump: 0.0,
            survive: 0.1,
        }
    }
}

impl RewardConfig {
    pub fn reward(&self, action: Action, done: bool) -> f64 {
        if done {
            self.crash
        } else if action == Action::Jump {
            self.jump
        } else {
            self.survive
        }
    }
}

/// Hyperparameters of the learning agent.
///
/// Missing fields in a JSON file fall back to [`AgentConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub batch_size: usize,
    pub gamma: f64,
    pub multi_steps: usize,
    pub memory_capacity: usize,
    pub priority: PriorityParams,
    /// Exponent applied to stored priorities when sampling
    pub priority_scale: f64,
    /// Raw priority of freshly stored experiences
    pub initial_priority: f64,
    /// Optimizer steps between target network syncs
    pub target_update_interval: usize,
    pub v_min: f64,
    pub v_max: f64,
    pub atoms: usize,
    pub epsilon: f64,
    pub epsilon_schedule: EpsilonSchedule,
    pub rewards: RewardConfig,
    pub timing: TimingWindow,
    /// Upper bound on observation polls while waiting for the next step
    pub max_polls: usize,
    pub poll_interval_ms: u64,
    /// Pause after a restart before the episode is started
    pub settle_ms: u64,
    pub learning_rate: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            gamma: 0.9,
            multi_steps: 3,
            memory_capacity: 100_000,
            priority: PriorityParams::default(),
            priority_scale: 1.0,
            initial_priority: 10.0,
            target_update_interval: 40,
            v_min: -5.0,
            v_max: 5.0,
            atoms: 51,
            epsilon: 1.0,
            epsilon_schedule: EpsilonSchedule::default(),
            rewards: RewardConfig::default(),
            timing: TimingWindow::live(),
            max_polls: 200,
            poll_interval_ms: 5,
            settle_ms: 100,
            learning_rate: 0.05,
        }
    }
}

impl AgentConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_multi_steps(mut self, multi_steps: usize) -> Self {
        self.multi_steps = multi_steps;
        self
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    pub fn with_target_update_interval(mut self, interval: usize) -> Self {
        self.target_update_interval = interval;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_epsilon_schedule(mut self, schedule: EpsilonSchedule) -> Self {
        self.epsilon_schedule = schedule;
        self
    }

    pub fn with_timing(mut self, timing: TimingWindow) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Check every parameter for a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be positive"));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(Error::config(format!("gamma {} outside (0, 1]", self.gamma)));
        }
        if self.multi_steps == 0 {
            return Err(Error::config("multi_steps must be positive"));
        }
        if self.memory_capacity < self.batch_size {
            return Err(Error::config(format!(
                "memory_capacity {} is smaller than batch_size {}",
                self.memory_capacity, self.batch_size
            )));
        }
        if self.target_update_interval == 0 {
            return Err(Error::config("target_update_interval must be positive"));
        }
        if self.atoms < 2 || !(self.v_min < self.v_max) {
            return Err(Error::config(format!(
                "invalid support: {} atoms on [{}, {}]",
                self.atoms, self.v_min, self.v_max
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::config(format!("epsilon {} outside [0, 1]", self.epsilon)));
        }
        self.epsilon_schedule.validate()?;
        if self.timing.min_ms > self.timing.max_ms {
            return Err(Error::config(format!(
                "timing window [{}, {}] is empty",
                self.timing.min_ms, self.timing.max_ms
            )));
        }
        if self.max_polls == 0 {
            return Err(Error::config("max_polls must be positive"));
        }
        if !(self.priority_scale >= 0.0 && self.priority_scale.is_finite()) {
            return Err(Error::config(format!(
                "priority_scale {} must be non-negative",
                self.priority_scale
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::config(format!(
                "learning_rate {} must be positive",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.multi_steps, 3);
        assert_eq!(config.target_update_interval, 40);
        assert_eq!(config.initial_priority, 10.0);
    }

    #[test]
    fn test_epsilon_schedules() {
        let linear = EpsilonSchedule::default();
        assert!((linear.apply(1.0) - 0.99).abs() < 1e-12);
        assert_eq!(linear.apply(0.005), 0.0);

        let exponential = EpsilonSchedule::Exponential {
            factor: 0.5,
            min: 0.1,
        };
        assert_eq!(exponential.apply(0.8), 0.4);
        assert_eq!(exponential.apply(0.15), 0.1);
    }

    #[test]
    fn test_rewards() {
        let rewards = RewardConfig::default();
        assert_eq!(rewards.reward(Action::Jump, true), -1.0);
        assert_eq!(rewards.reward(Action::Jump, false), 0.0);
        assert_eq!(rewards.reward(Action::Crouch, false), 0.1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"batch_size": 8, "epsilon_schedule": {"kind": "exponential", "factor": 0.9, "min": 0.05}}"#)
                .unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.gamma, 0.9);
        assert!(matches!(
            config.epsilon_schedule,
            EpsilonSchedule::Exponential { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(AgentConfig::default().with_batch_size(0).validate().is_err());
        assert!(AgentConfig::default().with_gamma(0.0).validate().is_err());
        assert!(AgentConfig::default().with_memory_capacity(4).validate().is_err());
        assert!(AgentConfig::default().with_epsilon(1.5).validate().is_err());
    }
}
