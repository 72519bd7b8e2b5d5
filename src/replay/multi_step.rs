//! Multi-step return aggregation
//!
//! Raw single-step transitions are buffered in a sliding window of at most N
//! entries. Each emission folds the window into one experience whose reward is
//! the discounted sum of the window's rewards and whose next state is the last
//! entry's next state.

use std::collections::VecDeque;

use crate::{Error, Result, types::Experience};

/// Sliding-window n-step aggregator for one episode at a time.
#[derive(Debug, Clone)]
pub struct MultiStepAggregator {
    window: VecDeque<Experience>,
    steps: usize,
    gamma: f64,
}

impl MultiStepAggregator {
    /// Create an aggregator over `steps` transitions with discount `gamma`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `steps` is zero or `gamma`
    /// lies outside `(0, 1]`.
    pub fn new(steps: usize, gamma: f64) -> Result<Self> {
        if steps == 0 {
            return Err(Error::config("multi-step window must hold at least one step"));
        }
        if !(gamma > 0.0 && gamma <= 1.0) {
            return Err(Error::config(format!("discount {gamma} outside (0, 1]")));
        }
        Ok(Self {
            window: VecDeque::with_capacity(steps),
            steps,
            gamma,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Discount applied to the bootstrapped value of an aggregated experience.
    pub fn bootstrap_discount(&self) -> f64 {
        self.gamma.powi(self.steps as i32)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Append a raw transition and return the experiences that became ready.
    ///
    /// A terminal transition drains the whole window; otherwise one experience
    /// is emitted each time the window is full.
    pub fn push(&mut self, transition: Experience) -> Vec<Experience> {
        let terminal = transition.done;
        self.window.push_back(transition);
        if terminal {
            self.drain()
        } else if self.window.len() >= self.steps {
            self.emit().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// Drain the window entry by entry, shrinking the horizon each time.
    pub fn drain(&mut self) -> Vec<Experience> {
        let mut emitted = Vec::with_capacity(self.window.len());
        while let Some(experience) = self.emit() {
            emitted.push(experience);
        }
        emitted
    }

    /// Late-terminal handling: mark the newest transition terminal with the
    /// given reward, then drain.
    ///
    /// Returns `None` when there is no transition to amend.
    pub fn impute_terminal(&mut self, reward: f64) -> Option<Vec<Experience>> {
        let last = self.window.back_mut()?;
        last.done = true;
        last.reward = reward;
        Some(self.drain())
    }

    /// Forget the current window without emitting.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    fn emit(&mut self) -> Option<Experience> {
        let last = self.window.back()?;
        let next_state = last.next_state.clone();
        let done = last.done;

        let mut discount = 1.0;
        let mut reward = 0.0;
        for transition in &self.window {
            reward += discount * transition.reward;
            discount *= self.gamma;
        }

        let first = self.window.pop_front()?;
        Some(Experience {
            state: first.state,
            action: first.action,
            reward,
            next_state,
            done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, FeatureVector};

    fn transition(reward: f64, done: bool, marker: f64) -> Experience {
        let mut next = vec![0.0; crate::types::FEATURE_LEN];
        next[0] = marker;
        Experience {
            state: FeatureVector::zeros(),
            action: Action::Stand,
            reward,
            next_state: FeatureVector::from_values(next).unwrap(),
            done,
        }
    }

    #[test]
    fn test_window_fills_before_emitting() {
        let mut agg = MultiStepAggregator::new(3, 0.9).unwrap();
        assert!(agg.push(transition(0.1, false, 1.0)).is_empty());
        assert!(agg.push(transition(0.1, false, 2.0)).is_empty());
        let out = agg.push(transition(0.1, false, 3.0));
        assert_eq!(out.len(), 1);
        assert!((out[0].reward - (0.1 + 0.09 + 0.081)).abs() < 1e-12);
        assert_eq!(out[0].next_state[0], 3.0);
        assert!(!out[0].done);
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_terminal_drains_with_shrinking_horizon() {
        let mut agg = MultiStepAggregator::new(3, 0.9).unwrap();
        agg.push(transition(0.1, false, 1.0));
        agg.push(transition(0.1, false, 2.0));
        let out = agg.push(transition(-1.0, true, 3.0));

        let rewards: Vec<f64> = out.iter().map(|e| e.reward).collect();
        assert_eq!(rewards.len(), 3);
        // 0.1 + 0.9 * 0.1 + 0.81 * -1
        assert!((rewards[0] - -0.62).abs() < 1e-12);
        assert!((rewards[1] - -0.8).abs() < 1e-12);
        assert!((rewards[2] - -1.0).abs() < 1e-12);
        assert!(out.iter().all(|e| e.done && e.next_state[0] == 3.0));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_impute_terminal() {
        let mut agg = MultiStepAggregator::new(3, 0.5).unwrap();
        assert!(agg.impute_terminal(-1.0).is_none());

        agg.push(transition(0.1, false, 1.0));
        let out = agg.impute_terminal(-1.0).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].done);
        assert_eq!(out[0].reward, -1.0);
    }

    #[test]
    fn test_bootstrap_discount() {
        let agg = MultiStepAggregator::new(3, 0.9).unwrap();
        assert!((agg.bootstrap_discount() - 0.729).abs() < 1e-12);
        assert!(MultiStepAggregator::new(0, 0.9).is_err());
        assert!(MultiStepAggregator::new(3, 1.5).is_err());
    }
}
