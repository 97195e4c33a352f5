//! PPO agent for continuous control implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! The agent ([`ppo::Ppo`]) owns a Gaussian actor ([`actor::GaussianActor`]),
//! a state-value critic ([`critic::Critic`]) and a rollout buffer from
//! `ppo-core`. Networks plug in through the [`model::SubModel1`] trait; the
//! [`mlp`] module provides multilayer perceptrons for both roles.
pub mod actor;
pub mod critic;
pub mod dist;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod ppo;
pub mod util;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The GPU device of the given ordinal.
    Cuda(usize),
}

impl Device {
    /// Creates the corresponding [`candle_core::Device`].
    pub fn to_candle(self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => Ok(candle_core::Device::new_cuda(n)?),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}
