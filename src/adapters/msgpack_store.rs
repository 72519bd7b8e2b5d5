//! MessagePack implementation of the weight store.
//!
//! Each weight set lives in `<dir>/<name>.msgpack`, encoded with rmp_serde.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::{
    Result,
    error::Error,
    ports::{WeightStore, Weights},
};

/// Directory-backed weight store.
///
/// # Examples
///
/// ```no_run
/// use dino_dqn::adapters::MsgPackWeightStore;
/// use dino_dqn::ports::{WeightStore, Weights};
///
/// let store = MsgPackWeightStore::new("models");
/// store.save("main", &Weights::new())?;
/// assert!(store.load("main")?.is_some());
/// # Ok::<(), dino_dqn::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MsgPackWeightStore {
    dir: PathBuf,
}

impl MsgPackWeightStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the weight set `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.msgpack"))
    }
}

impl WeightStore for MsgPackWeightStore {
    fn save(&self, name: &str, weights: &Weights) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::Io {
            operation: format!("create model directory {:?}", self.dir),
            source,
        })?;

        let path = self.path_for(name);
        let mut file = File::create(&path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;

        rmp_serde::encode::write(&mut file, weights).map_err(|e| Error::SerializationContext {
            operation: format!("serialize weights '{name}' to MessagePack"),
            message: e.to_string(),
        })
    }

    fn load(&self, name: &str) -> Result<Option<Weights>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;

        let weights =
            rmp_serde::decode::from_read(file).map_err(|e| Error::SerializationContext {
                operation: format!("deserialize weights '{name}' from MessagePack"),
                message: e.to_string(),
            })?;

        Ok(Some(weights))
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
