//! On-policy rollout buffer.
mod base;
mod batch;
mod config;
pub use base::{RolloutBuffer, Transition};
pub use batch::{shuffled_batches, RolloutBatch};
pub use config::RolloutBufferConfig;
