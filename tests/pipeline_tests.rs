//! Training and play pipelines with weight stores and observers

mod common;

use common::simulator_agent;
use dino_dqn::{
    Error,
    adapters::{InMemoryWeightStore, MsgPackWeightStore},
    agent::{AgentConfig, StopFlag, TimingWindow},
    pipeline::{
        EpisodeLogObserver, MetricsObserver, PlayConfig, TrainingConfig, TrainingPipeline,
        TrainingResult, play, resume_training,
    },
    ports::{ONLINE_WEIGHTS, Predictor, TARGET_WEIGHTS, Tensor, WeightStore},
};
use tempfile::TempDir;

fn agent_config() -> AgentConfig {
    AgentConfig::default()
        .with_batch_size(8)
        .with_memory_capacity(2_000)
        .with_target_update_interval(5)
        .with_timing(TimingWindow::simulated())
}

fn training_config(episodes: usize) -> TrainingConfig {
    TrainingConfig {
        episodes,
        seed: Some(1),
        max_steps_per_episode: Some(300),
    }
}

#[test]
fn test_training_run_checkpoints_and_reports() {
    let store = InMemoryWeightStore::new();
    let metrics = MetricsObserver::new();
    let mut agent = simulator_agent(agent_config(), 1);

    let mut pipeline =
        TrainingPipeline::new(training_config(3)).with_observer(Box::new(metrics.clone()));
    let result = pipeline.run(&mut agent, &store, &StopFlag::new()).unwrap();

    assert_eq!(result.episodes, 3);
    assert!(!result.interrupted);
    assert!(result.optimizer_steps > 0);
    assert!((result.final_epsilon - 0.97).abs() < 1e-9);

    assert!(store.contains(ONLINE_WEIGHTS));
    assert!(store.contains(TARGET_WEIGHTS));
    assert_eq!(
        store.load(ONLINE_WEIGHTS).unwrap(),
        Some(agent.online().weights())
    );

    let collected = metrics.metrics();
    assert_eq!(collected.episodes, 3);
    assert_eq!(collected.optimizer_steps, result.optimizer_steps);
    assert_eq!(collected.target_syncs, result.optimizer_steps / 5);
}

#[test]
fn test_stop_before_first_episode_still_checkpoints() {
    let store = InMemoryWeightStore::new();
    let mut agent = simulator_agent(agent_config(), 2);
    let stop = StopFlag::new();
    stop.stop();

    let result = TrainingPipeline::new(training_config(10))
        .run(&mut agent, &store, &stop)
        .unwrap();

    assert!(result.interrupted);
    assert_eq!(result.episodes, 0);
    assert_eq!(store.count(), 2);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let store = InMemoryWeightStore::new();
        let mut agent = simulator_agent(agent_config(), 8);
        let result = TrainingPipeline::new(training_config(2))
            .run(&mut agent, &store, &StopFlag::new())
            .unwrap();
        (result.high_score, result.average_reward, agent.online().weights())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_play_without_model_fails() {
    let dir = TempDir::new().unwrap();
    let store = MsgPackWeightStore::new(dir.path().join("model"));
    let mut agent = simulator_agent(agent_config(), 3);

    let err = play(&mut agent, &store, &PlayConfig::default(), &StopFlag::new()).unwrap_err();
    assert!(matches!(err, Error::ModelNotFound { .. }));
    assert!(err.to_string().contains("train a model first"));
}

#[test]
fn test_train_then_play_from_disk() {
    let dir = TempDir::new().unwrap();
    let store = MsgPackWeightStore::new(dir.path().join("model"));
    let log_path = dir.path().join("logs.txt");

    let mut trainer = simulator_agent(agent_config(), 4);
    let result = TrainingPipeline::new(training_config(3))
        .with_observer(Box::new(EpisodeLogObserver::new(&log_path)))
        .run(&mut trainer, &store, &StopFlag::new())
        .unwrap();

    let summary_path = dir.path().join("summary.json");
    result.save(&summary_path).unwrap();
    let loaded = TrainingResult::load(&summary_path).unwrap();
    assert_eq!(loaded.episodes, 3);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.starts_with(&format!("\n\n{}\n\n", "-".repeat(66))));
    assert_eq!(log.matches("Episode: ").count(), 3);
    assert!(log.contains("Episode: 1, Epsilon: 1, Total Reward: "));

    let mut player = simulator_agent(agent_config(), 5);
    let config = PlayConfig {
        episodes: Some(2),
        max_steps_per_episode: Some(200),
    };
    let outcome = play(&mut player, &store, &config, &StopFlag::new()).unwrap();
    assert_eq!(outcome.scores.len(), 2);
    assert_eq!(player.epsilon(), 0.0);
    assert_eq!(player.online().weights(), trainer.online().weights());
}

#[test]
fn test_truncated_weight_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = MsgPackWeightStore::new(dir.path().join("model"));
    let mut agent = simulator_agent(agent_config(), 6);

    let mut weights = agent.online().weights();
    let kernel = weights.get("kernel").unwrap().clone();
    weights.insert(
        "kernel",
        Tensor {
            shape: kernel.shape,
            values: kernel.values[..10].to_vec(),
        },
    );
    store.save(ONLINE_WEIGHTS, &weights).unwrap();

    let err = play(&mut agent, &store, &PlayConfig::default(), &StopFlag::new()).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { got: 10, .. }));
}

#[test]
fn test_resumed_training_starts_greedy() {
    let store = InMemoryWeightStore::new();
    let mut fresh = simulator_agent(agent_config(), 7);
    assert!(!resume_training(&mut fresh, &store).unwrap());
    assert_eq!(fresh.epsilon(), 1.0);

    TrainingPipeline::new(training_config(1))
        .run(&mut fresh, &store, &StopFlag::new())
        .unwrap();

    let mut resumed = simulator_agent(agent_config(), 9);
    assert!(resume_training(&mut resumed, &store).unwrap());
    assert_eq!(resumed.epsilon(), 0.0);
    assert_eq!(resumed.online().weights(), fresh.online().weights());
    assert_eq!(resumed.target().weights(), fresh.target().weights());
}
