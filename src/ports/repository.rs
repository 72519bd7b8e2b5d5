//! Repository port for predictor weight persistence.

use crate::{Result, ports::predictor::Weights};

/// Name under which the online network's weights are stored.
pub const ONLINE_WEIGHTS: &str = "main";
/// Name under which the target network's weights are stored.
pub const TARGET_WEIGHTS: &str = "target";

/// Port for saving and loading named weight sets.
///
/// Absence of a weight set is not an error: `load` returns `Ok(None)` so
/// callers can decide whether to start fresh or fail.
///
/// # Examples
///
/// ```no_run
/// use dino_dqn::ports::{WeightStore, Weights};
///
/// fn checkpoint<S: WeightStore>(store: &S, online: &Weights) -> dino_dqn::Result<()> {
///     store.save("main", online)
/// }
/// ```
pub trait WeightStore {
    /// Persist `weights` under `name`, replacing any previous set.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written or serialization
    /// fails.
    fn save(&self, name: &str, weights: &Weights) -> Result<()>;

    /// Load the weights stored under `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data exists but cannot be read or decoded.
    fn load(&self, name: &str) -> Result<Option<Weights>>;

    /// Human-readable location, used in error messages.
    fn location(&self) -> String;
}
