#![warn(missing_docs)]
//! Backend-independent building blocks of proximal policy optimization (PPO).
//!
//! This crate provides the pieces of a PPO learner that do not depend on a
//! neural network library:
//!
//! * [`RolloutBuffer`] stores on-policy transitions and produces shuffled
//!   minibatches covering the whole buffer once per call.
//! * [`gae`] computes generalized advantage estimates and normalizes them.
//! * [`RunningRewardStats`] keeps exponential running statistics of rewards.
//! * [`record`] is a small container of training statistics.
//!
//! Neural networks, optimizers and the update loop live in backend crates
//! such as `ppo-candle-agent`.
pub mod error;
pub mod gae;
pub mod record;
mod rollout_buffer;
mod running_stats;

pub use error::PpoError;
pub use rollout_buffer::{
    shuffled_batches, RolloutBatch, RolloutBuffer, RolloutBufferConfig, Transition,
};
pub use running_stats::RunningRewardStats;
