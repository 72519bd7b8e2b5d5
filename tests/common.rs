//! Common test utilities for the dino-dqn test suite.
//!
//! Provides a scripted environment replaying fixed observations, and helpers
//! for building small agents.

#![allow(dead_code)]

use dino_dqn::{
    Action, GameState, Result,
    adapters::LinearPredictor,
    agent::{Agent, AgentConfig},
    ports::Environment,
    simulator::Simulator,
    types::{FEATURE_LEN, NUM_ACTIONS},
};
use rand::{SeedableRng, rngs::StdRng};

/// Environment replaying a fixed list of observations.
///
/// Every action advances to the next frame; polling without acting returns
/// the same frame again.
#[derive(Debug, Clone)]
pub struct ScriptedEnvironment {
    frames: Vec<GameState>,
    cursor: usize,
    pub actions: Vec<Action>,
    pub restarts: usize,
}

impl ScriptedEnvironment {
    /// Frames at the given `(time, done)` points, without obstacles.
    pub fn from_timeline(timeline: &[(f64, bool)]) -> Self {
        let frames = timeline
            .iter()
            .map(|&(time, done)| GameState {
                speed: 6.0,
                jumping: false,
                ypos: 0.0,
                obstacles: Vec::new(),
                time,
                done,
            })
            .collect();
        Self {
            frames,
            cursor: 0,
            actions: Vec::new(),
            restarts: 0,
        }
    }
}

impl Environment for ScriptedEnvironment {
    fn restart(&mut self) -> Result<()> {
        self.cursor = 0;
        self.restarts += 1;
        Ok(())
    }

    fn perform_action(&mut self, action: Action) -> Result<()> {
        self.actions.push(action);
        self.cursor = (self.cursor + 1).min(self.frames.len() - 1);
        Ok(())
    }

    fn observe(&self) -> Result<GameState> {
        Ok(self.frames[self.cursor].clone())
    }

    fn pause(&mut self, _duration: std::time::Duration) {}
}

/// Linear predictor pair sized for `config`.
pub fn predictors(config: &AgentConfig, seed: u64) -> (LinearPredictor, LinearPredictor) {
    let mut rng = StdRng::seed_from_u64(seed);
    let online = LinearPredictor::new(
        FEATURE_LEN,
        NUM_ACTIONS,
        config.atoms,
        config.learning_rate,
        &mut rng,
    )
    .unwrap();
    let target = online.clone();
    (online, target)
}

/// Seeded agent on the simulator.
pub fn simulator_agent(config: AgentConfig, seed: u64) -> Agent<Simulator, LinearPredictor> {
    let (online, target) = predictors(&config, seed);
    Agent::new(Simulator::with_seed(seed), online, target, config)
        .unwrap()
        .with_seed(seed)
}

/// Seeded agent on a scripted environment.
pub fn scripted_agent(
    env: ScriptedEnvironment,
    config: AgentConfig,
) -> Agent<ScriptedEnvironment, LinearPredictor> {
    let (online, target) = predictors(&config, 1);
    Agent::new(env, online, target, config).unwrap().with_seed(1)
}
