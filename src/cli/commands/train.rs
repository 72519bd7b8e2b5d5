//! Train command - train the agent on the reference simulator

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use super::{CommonArgs, build_simulator_agent};
use crate::{
    adapters::MsgPackWeightStore,
    agent::StopFlag,
    cli::{
        config::{RunConfig, sanitize_summary_path},
        output::print_training_result,
    },
    pipeline::{EpisodeLogObserver, ProgressObserver, TrainingPipeline, resume_training},
};

#[derive(Parser, Debug)]
#[command(about = "Train the agent")]
pub struct TrainArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Append per-episode lines to this log file
    #[arg(long, default_value = "logs.txt")]
    pub log_file: PathBuf,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Optional path for writing a summary JSON file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Truncate episodes after this many actions
    #[arg(long)]
    pub max_steps: Option<usize>,
}

pub fn execute(args: TrainArgs, stop: StopFlag) -> Result<()> {
    let mut config = RunConfig::load(args.common.config.as_deref())?;
    if let Some(episodes) = args.common.episodes {
        config.training.episodes = episodes;
    }
    if args.common.seed.is_some() {
        config.training.seed = args.common.seed;
    }
    if args.max_steps.is_some() {
        config.training.max_steps_per_episode = args.max_steps;
    }

    let mut agent = build_simulator_agent(config.agent.clone(), config.training.seed)?;
    let store = MsgPackWeightStore::new(&args.common.model_dir);
    if !resume_training(&mut agent, &store).context("failed to load saved weights")? {
        info!(dir = %args.common.model_dir.display(), "no saved model, starting fresh");
    }

    let mut pipeline = TrainingPipeline::new(config.training.clone())
        .with_observer(Box::new(EpisodeLogObserver::new(&args.log_file)));
    if args.progress {
        pipeline = pipeline.with_observer(Box::new(ProgressObserver::new()));
    }

    let result = pipeline
        .run(&mut agent, &store, &stop)
        .context("training failed")?;
    print_training_result(&result);

    if let Some(raw) = &args.summary {
        let path = sanitize_summary_path(raw);
        result
            .save(&path)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
        println!("\nSummary written to {}", path.display());
    }
    Ok(())
}
