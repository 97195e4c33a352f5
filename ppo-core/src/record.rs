//! Statistics reported by a learning step.
//!
//! A [`Record`] is returned by each call to the `learn` method of a PPO agent.
//! It holds averaged losses and other diagnostics keyed by name, so that the
//! surrounding control loop can log or plot them as it sees fit.
//!
//! ```rust
//! use ppo_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_slice(&[("loss_actor", RecordValue::Scalar(-0.02))]);
//! record.insert("loss_critic", RecordValue::Scalar(0.4));
//! assert_eq!(record.get_scalar("loss_critic").unwrap(), 0.4);
//! ```
mod base;

pub use base::{Record, RecordValue};
