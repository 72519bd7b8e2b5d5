//! CLI subcommands

pub mod play;
pub mod train;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    adapters::LinearPredictor,
    agent::{Agent, AgentConfig, TimingWindow},
    simulator::Simulator,
    types::{FEATURE_LEN, NUM_ACTIONS},
};

/// Flags shared by `train` and `play`.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding the saved model weights
    #[arg(long, default_value = "dino-model")]
    pub model_dir: PathBuf,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON file with `agent` and `training` sections
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of episodes
    #[arg(long)]
    pub episodes: Option<usize>,
}

/// Agent playing the reference simulator with the linear predictor.
pub(crate) fn build_simulator_agent(
    mut config: AgentConfig,
    seed: Option<u64>,
) -> Result<Agent<Simulator, LinearPredictor>> {
    // The simulator clock advances a fixed 50 ms per action.
    config.timing = TimingWindow::simulated();

    let simulator = match seed {
        Some(seed) => Simulator::with_seed(seed),
        None => Simulator::new(),
    };
    let mut init_rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let online = LinearPredictor::new(
        FEATURE_LEN,
        NUM_ACTIONS,
        config.atoms,
        config.learning_rate,
        &mut init_rng,
    )
    .context("failed to create predictor")?;
    let target = online.clone();

    let agent = Agent::new(simulator, online, target, config).context("failed to create agent")?;
    Ok(match seed {
        Some(seed) => agent.with_seed(seed.wrapping_add(2)),
        None => agent,
    })
}
