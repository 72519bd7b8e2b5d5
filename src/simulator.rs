//! Reference dino game simulator
//!
//! A deterministic-given-the-RNG model of the browser game, used for tests and
//! offline training. Observations match the live game's shape, including the
//! obstacle distance law assumed by the encoder.

pub mod game;
pub mod spawn;

pub use game::{
    JUMP_PHASES, NUM_ENV_ACTIONS, OBSTACLE_CATALOG, Obstacle, SPAWN_DISTANCE, STEP_MS, SimState,
    Simulator, Turn,
};
pub use spawn::{EnvAction, SpawnPolicy, SpawnTier};
