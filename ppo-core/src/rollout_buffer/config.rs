//! Configuration of [`RolloutBuffer`](super::RolloutBuffer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`RolloutBuffer`](super::RolloutBuffer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RolloutBufferConfig {
    /// Size of minibatches.
    pub batch_size: usize,

    /// Seed of the random number generator used for shuffling.
    pub seed: u64,
}

impl Default for RolloutBufferConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            seed: 42,
        }
    }
}

impl RolloutBufferConfig {
    /// Sets the size of minibatches.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Constructs [`RolloutBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RolloutBufferConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
