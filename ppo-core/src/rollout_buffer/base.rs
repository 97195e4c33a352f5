//! Rollout buffer holding the transitions of the current collection phase.
use super::{shuffled_batches, RolloutBatch, RolloutBufferConfig};
use crate::error::PpoError;
use log::trace;
use rand::{rngs::StdRng, SeedableRng};

/// A single environment step as seen by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation the action was chosen on.
    pub state: Vec<f32>,

    /// Bounded action sent to the environment.
    pub action: Vec<f32>,

    /// Sample of the policy distribution before squashing into `action`.
    pub raw_action: Vec<f32>,

    /// Log probability of `raw_action` under the collecting policy.
    pub log_prob: f32,

    /// State value estimated by the critic at collection time.
    pub value: f32,

    /// Reward received after the action.
    pub reward: f32,

    /// `true` if the episode terminated after this step.
    pub done: bool,
}

impl Transition {
    /// Creates a transition.
    pub fn new(
        state: Vec<f32>,
        action: Vec<f32>,
        raw_action: Vec<f32>,
        log_prob: f32,
        value: f32,
        reward: f32,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            raw_action,
            log_prob,
            value,
            reward,
            done,
        }
    }
}

/// Time-ordered storage of transitions for on-policy learning.
///
/// Fields are stored column-wise; index `i` of every column refers to the
/// same transition. The buffer has no capacity bound; the caller decides when
/// to learn and must [`clear`](RolloutBuffer::clear) it afterwards.
pub struct RolloutBuffer {
    batch_size: usize,
    states: Vec<Vec<f32>>,
    actions: Vec<Vec<f32>>,
    raw_actions: Vec<Vec<f32>>,
    log_probs: Vec<f32>,
    values: Vec<f32>,
    rewards: Vec<f32>,
    dones: Vec<i8>,
    rng: StdRng,
}

impl RolloutBuffer {
    /// Constructs an empty buffer.
    ///
    /// Returns [`PpoError::ZeroBatchSize`] if `config.batch_size` is zero.
    pub fn build(config: &RolloutBufferConfig) -> Result<Self, PpoError> {
        if config.batch_size == 0 {
            return Err(PpoError::ZeroBatchSize);
        }

        Ok(Self {
            batch_size: config.batch_size,
            states: vec![],
            actions: vec![],
            raw_actions: vec![],
            log_probs: vec![],
            values: vec![],
            rewards: vec![],
            dones: vec![],
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Appends a transition.
    pub fn store(&mut self, tr: Transition) {
        self.states.push(tr.state);
        self.actions.push(tr.action);
        self.raw_actions.push(tr.raw_action);
        self.log_probs.push(tr.log_prob);
        self.values.push(tr.value);
        self.rewards.push(tr.reward);
        self.dones.push(tr.done as i8);
    }

    /// Returns the number of stored transitions.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if no transition is stored.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Removes all transitions.
    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.raw_actions.clear();
        self.log_probs.clear();
        self.values.clear();
        self.rewards.clear();
        self.dones.clear();
    }

    /// Materializes all transitions and draws fresh minibatch indices.
    ///
    /// Each call shuffles anew, so calling it once per epoch gives a different
    /// minibatch order per epoch over the same data.
    pub fn generate_batches(&mut self) -> Result<RolloutBatch, PpoError> {
        let n = self.len();
        if n == 0 {
            return Err(PpoError::EmptyBuffer);
        }

        let (states, obs_dim) = flatten("state", &self.states)?;
        let (actions, act_dim) = flatten("action", &self.actions)?;
        let (raw_actions, raw_dim) = flatten("raw_action", &self.raw_actions)?;
        if raw_dim != act_dim {
            return Err(PpoError::ShapeMismatch {
                name: "raw_action",
                index: 0,
                expected: act_dim,
                actual: raw_dim,
            });
        }
        let batches = shuffled_batches(n, self.batch_size, &mut self.rng);
        trace!("Generated {} minibatches over {} transitions", batches.len(), n);

        Ok(RolloutBatch {
            states,
            obs_dim,
            actions,
            raw_actions,
            act_dim,
            log_probs: self.log_probs.clone(),
            values: self.values.clone(),
            rewards: self.rewards.clone(),
            dones: self.dones.clone(),
            batches,
        })
    }
}

/// Concatenates vectors of equal length into a flat row-major array.
fn flatten(name: &'static str, rows: &[Vec<f32>]) -> Result<(Vec<f32>, usize), PpoError> {
    let dim = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut flat = Vec::with_capacity(dim * rows.len());

    for (index, row) in rows.iter().enumerate() {
        if row.len() != dim {
            return Err(PpoError::ShapeMismatch {
                name,
                index,
                expected: dim,
                actual: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }

    Ok((flat, dim))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(t: usize) -> Transition {
        let t = t as f32;
        Transition::new(
            vec![t, -t],
            vec![0.1 * t],
            vec![0.2 * t],
            -t,
            2.0 * t,
            1.0,
            t == 3.0,
        )
    }

    #[test]
    fn test_store_and_generate() -> Result<(), PpoError> {
        let mut buffer = RolloutBuffer::build(&RolloutBufferConfig::default().batch_size(3))?;
        for t in 0..5 {
            buffer.store(transition(t));
        }
        assert_eq!(buffer.len(), 5);

        let batch = buffer.generate_batches()?;
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.obs_dim, 2);
        assert_eq!(batch.act_dim, 1);
        assert_eq!(&batch.states[4..6], &[2.0, -2.0]);
        assert_eq!(batch.raw_actions[3], 0.2 * 3.0);
        assert_eq!(batch.log_probs[2], -2.0);
        assert_eq!(batch.values, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(batch.dones, vec![0, 0, 0, 1, 0]);
        assert_eq!(batch.batches.len(), 2);

        // Stored data is untouched by batch generation
        assert_eq!(buffer.len(), 5);

        Ok(())
    }

    #[test]
    fn test_clear() -> Result<(), PpoError> {
        let mut buffer = RolloutBuffer::build(&RolloutBufferConfig::default())?;
        buffer.store(transition(0));
        buffer.store(transition(1));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.generate_batches(), Err(PpoError::EmptyBuffer));

        Ok(())
    }

    #[test]
    fn test_zero_batch_size() {
        let config = RolloutBufferConfig::default().batch_size(0);
        assert!(matches!(
            RolloutBuffer::build(&config),
            Err(PpoError::ZeroBatchSize)
        ));
    }

    #[test]
    fn test_shape_mismatch() -> Result<(), PpoError> {
        let mut buffer = RolloutBuffer::build(&RolloutBufferConfig::default())?;
        buffer.store(transition(0));
        buffer.store(Transition::new(vec![1.0], vec![0.0], vec![0.0], 0.0, 0.0, 0.0, false));

        assert_eq!(
            buffer.generate_batches(),
            Err(PpoError::ShapeMismatch {
                name: "state",
                index: 1,
                expected: 2,
                actual: 1
            })
        );

        let mut buffer = RolloutBuffer::build(&RolloutBufferConfig::default())?;
        buffer.store(Transition::new(vec![1.0], vec![0.0], vec![0.0, 0.0], 0.0, 0.0, 0.0, false));
        assert_eq!(
            buffer.generate_batches(),
            Err(PpoError::ShapeMismatch {
                name: "raw_action",
                index: 0,
                expected: 1,
                actual: 2
            })
        );

        Ok(())
    }

    #[test]
    fn test_fresh_shuffle_per_call() -> Result<(), PpoError> {
        let mut buffer = RolloutBuffer::build(&RolloutBufferConfig::default().batch_size(100))?;
        for t in 0..100 {
            buffer.store(transition(t));
        }

        let b1 = buffer.generate_batches()?.batches;
        let b2 = buffer.generate_batches()?.batches;
        assert_ne!(b1, b2);

        Ok(())
    }
}
