//! Greedy play with a trained model

use serde::{Deserialize, Serialize};
use tracing::info;

use super::training::restore_weights;
use crate::{
    Error, Result,
    agent::{Agent, StopFlag},
    ports::{Environment, Predictor, WeightStore},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayConfig {
    /// Episodes to play; `None` keeps restarting until stopped
    pub episodes: Option<usize>,
    pub max_steps_per_episode: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResult {
    pub scores: Vec<usize>,
    pub high_score: usize,
    pub average_score: f64,
}

/// Load the saved model and play greedy episodes, restarting after each
/// crash.
///
/// # Errors
///
/// Returns [`Error::ModelNotFound`] if `store` holds no online weights.
pub fn play<E, P, S>(
    agent: &mut Agent<E, P>,
    store: &S,
    config: &PlayConfig,
    stop: &StopFlag,
) -> Result<PlayResult>
where
    E: Environment,
    P: Predictor,
    S: WeightStore + ?Sized,
{
    if !restore_weights(agent, store)? {
        return Err(Error::ModelNotFound {
            location: store.location(),
        });
    }
    agent.set_epsilon(0.0);

    let mut scores = Vec::new();
    while !stop.is_stopped() && config.episodes.is_none_or(|n| scores.len() < n) {
        let score = agent.play_episode(config.max_steps_per_episode, stop)?;
        info!(episode = scores.len() + 1, score, "game over");
        scores.push(score);
    }

    let high_score = scores.iter().copied().max().unwrap_or_default();
    let average_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<usize>() as f64 / scores.len() as f64
    };
    Ok(PlayResult {
        scores,
        high_score,
        average_score,
    })
}
