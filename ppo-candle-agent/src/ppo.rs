//! Proximal policy optimization (PPO) agent.
mod base;
mod config;
pub mod loss;
pub use base::{ActionSample, Ppo};
pub use config::PpoConfig;
