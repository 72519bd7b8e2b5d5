//! Configuration file handling for CLI commands

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{agent::AgentConfig, pipeline::TrainingConfig};

/// Contents of a `--config` JSON file.
///
/// Every section and field is optional; missing values use the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub agent: AgentConfig,
    pub training: TrainingConfig,
}

impl RunConfig {
    /// Load a config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        let config: RunConfig = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .agent
            .validate()
            .with_context(|| format!("invalid agent section in {}", path.display()))?;
        Ok(config)
    }
}

/// Normalize a `--summary` argument to a `.json` file path.
///
/// A directory-like path gets `training_summary.json` appended.
pub fn sanitize_summary_path(raw: &Path) -> PathBuf {
    let mut normalized = raw.to_path_buf();
    let raw_str = raw.as_os_str().to_string_lossy();

    if raw_str.ends_with(std::path::MAIN_SEPARATOR) || normalized.file_name().is_none() {
        normalized.push("training_summary.json");
        return normalized;
    }

    match normalized.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => normalized,
        _ => {
            normalized.set_extension("json");
            normalized
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_missing_path_gives_defaults() {
        let config = RunConfig::load(None).unwrap();
        assert_eq!(config.agent.batch_size, 32);
        assert_eq!(config.training.episodes, 100);
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"agent": {{"gamma": 0.95}}, "training": {{"episodes": 7}}}}"#
        )
        .unwrap();
        let config = RunConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.agent.gamma, 0.95);
        assert_eq!(config.agent.batch_size, 32);
        assert_eq!(config.training.episodes, 7);
    }

    #[test]
    fn test_invalid_agent_section_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"agent": {{"batch_size": 0}}}}"#).unwrap();
        assert!(RunConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_sanitize_summary_path() {
        assert_eq!(
            sanitize_summary_path(Path::new("out/run")),
            PathBuf::from("out/run.json")
        );
        assert_eq!(
            sanitize_summary_path(Path::new("out/run.JSON")),
            PathBuf::from("out/run.JSON")
        );
        let dir = format!("out{}", std::path::MAIN_SEPARATOR);
        assert_eq!(
            sanitize_summary_path(Path::new(&dir)),
            Path::new("out").join("training_summary.json")
        );
    }
}
