//! Observation timing validation
//!
//! An action's effect is only attributable to it when the next observation
//! arrives inside an expected time window after the previous one.

use serde::{Deserialize, Serialize};

/// Verdict on one `(previous, next)` observation pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingVerdict {
    /// Inside the window: the transition is used.
    Accept,
    /// Above the window: not related to the action, discarded.
    Late,
    /// Below the window and terminal: the crash is attributed to the
    /// previous action.
    LateTerminal,
    /// Below the window and not terminal: the wait failed, discarded.
    Anomaly,
}

/// Accepted range of time deltas between consecutive observations, in ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingWindow {
    pub min_ms: f64,
    pub max_ms: f64,
}

impl TimingWindow {
    /// Window for the live game: two frames at 60 FPS.
    pub fn live() -> Self {
        Self {
            min_ms: 30.0,
            max_ms: 40.0,
        }
    }

    /// Window for the reference simulator, whose clock advances a fixed
    /// 50 ms per action.
    pub fn simulated() -> Self {
        Self {
            min_ms: 50.0,
            max_ms: 50.0,
        }
    }

    pub fn classify(&self, delta_ms: f64, terminal: bool) -> TimingVerdict {
        if delta_ms > self.max_ms {
            TimingVerdict::Late
        } else if delta_ms < self.min_ms {
            if terminal {
                TimingVerdict::LateTerminal
            } else {
                TimingVerdict::Anomaly
            }
        } else {
            TimingVerdict::Accept
        }
    }
}

impl Default for TimingWindow {
    fn default() -> Self {
        Self::live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_window() {
        let window = TimingWindow::live();
        assert_eq!(window.classify(35.0, false), TimingVerdict::Accept);
        assert_eq!(window.classify(30.0, true), TimingVerdict::Accept);
        assert_eq!(window.classify(40.0, false), TimingVerdict::Accept);
        assert_eq!(window.classify(41.0, false), TimingVerdict::Late);
        assert_eq!(window.classify(55.0, true), TimingVerdict::Late);
        assert_eq!(window.classify(12.0, true), TimingVerdict::LateTerminal);
        assert_eq!(window.classify(12.0, false), TimingVerdict::Anomaly);
    }

    #[test]
    fn test_simulated_window_accepts_fixed_step() {
        let window = TimingWindow::simulated();
        assert_eq!(window.classify(50.0, false), TimingVerdict::Accept);
        assert_eq!(window.classify(50.0, true), TimingVerdict::Accept);
        assert_eq!(window.classify(0.0, true), TimingVerdict::LateTerminal);
    }
}
