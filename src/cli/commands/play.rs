//! Play command - greedy play with a saved model

use anyhow::{Context, Result};
use clap::Parser;

use super::{CommonArgs, build_simulator_agent};
use crate::{
    adapters::MsgPackWeightStore,
    agent::StopFlag,
    cli::{config::RunConfig, output::print_play_result},
    pipeline::{PlayConfig, play},
};

#[derive(Parser, Debug)]
#[command(about = "Play with a trained model")]
pub struct PlayArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Truncate games after this many actions
    #[arg(long)]
    pub max_steps: Option<usize>,
}

pub fn execute(args: PlayArgs, stop: StopFlag) -> Result<()> {
    let config = RunConfig::load(args.common.config.as_deref())?;
    let mut agent = build_simulator_agent(config.agent, args.common.seed)?;
    let store = MsgPackWeightStore::new(&args.common.model_dir);

    let play_config = PlayConfig {
        episodes: args.common.episodes,
        max_steps_per_episode: args.max_steps,
    };
    let result = play(&mut agent, &store, &play_config, &stop).context("play failed")?;
    print_play_result(&result);
    Ok(())
}
