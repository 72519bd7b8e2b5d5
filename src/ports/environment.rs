//! Environment port - abstraction over the game being played
//!
//! Two adapters satisfy this contract: the reference [`Simulator`](crate::simulator::Simulator)
//! and a live-game adapter driving the browser (not part of this crate).

use std::time::Duration;

use crate::{
    Result,
    types::{Action, GameState},
};

/// Environment trait - the game the agent acts in.
///
/// # Event Sequence
///
/// 1. `restart()` - Reset to a fresh episode
/// 2. `start()` - Kick off the run (the live game needs a key press)
/// 3. `observe()` / `perform_action(..)` alternating until `observe().done`
pub trait Environment {
    /// Reset to a fresh episode.
    ///
    /// Must be called before the first observation of an episode.
    fn restart(&mut self) -> Result<()>;

    /// Start the episode after a restart.
    ///
    /// # Default Implementation
    ///
    /// Does nothing. Environments that start on their own need no kick-off.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Apply a player action.
    ///
    /// # Errors
    ///
    /// Implementations may reject actions on a finished episode.
    fn perform_action(&mut self, action: Action) -> Result<()>;

    /// Read-only snapshot of the current game.
    fn observe(&self) -> Result<GameState>;

    /// Wait before polling `observe()` again.
    ///
    /// # Default Implementation
    ///
    /// Sleeps the current thread. Simulated environments override this with
    /// a no-op since their clock only advances on actions.
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
