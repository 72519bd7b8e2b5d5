//! dino - train and run a reinforcement-learning agent for the dino game
//!
//! Ctrl-C stops training at the next step; the current weights are saved
//! before the process exits.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dino_dqn::agent::StopFlag;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dino")]
#[command(version, about = "Distributional DQN agent for the dino game", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the agent on the reference simulator
    Train(dino_dqn::cli::commands::train::TrainArgs),

    /// Play greedily with a saved model
    Play(dino_dqn::cli::commands::play::PlayArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let stop = StopFlag::new();
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, stopping after the current step");
        handler_flag.stop();
    })
    .context("failed to install Ctrl-C handler")?;

    match cli.command {
        Commands::Train(args) => dino_dqn::cli::commands::train::execute(args, stop),
        Commands::Play(args) => dino_dqn::cli::commands::play::execute(args, stop),
    }
}
