//! Minibatch indices over a snapshot of the rollout buffer.
use rand::{seq::SliceRandom, Rng};

/// Splits a random permutation of `[0, n)` into chunks of `batch_size`.
///
/// Every index appears in exactly one chunk. All chunks have `batch_size`
/// elements except the last one, which holds the remainder when `n` is not
/// a multiple of `batch_size`.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
pub fn shuffled_batches<R: Rng + ?Sized>(
    n: usize,
    batch_size: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    assert!(batch_size > 0, "batch_size must be positive");
    let mut ixs: Vec<usize> = (0..n).collect();
    ixs.shuffle(rng);
    ixs.chunks(batch_size).map(|c| c.to_vec()).collect()
}

/// All transitions of a rollout buffer as flat arrays, with minibatch indices.
///
/// `states` is a row-major matrix of shape `(len, obs_dim)`, `actions` and
/// `raw_actions` of shape `(len, act_dim)`. The remaining fields have one element per transition.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutBatch {
    /// States, flattened.
    pub states: Vec<f32>,

    /// Dimension of a state.
    pub obs_dim: usize,

    /// Actions, flattened.
    pub actions: Vec<f32>,

    /// Pre-squash samples of the policy distribution, flattened.
    pub raw_actions: Vec<f32>,

    /// Dimension of an action.
    pub act_dim: usize,

    /// Log probabilities of the raw actions under the policy that collected them.
    pub log_probs: Vec<f32>,

    /// State values estimated during collection.
    pub values: Vec<f32>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// `1` if the episode terminated at the transition, `0` otherwise.
    pub dones: Vec<i8>,

    /// Disjoint minibatch indices covering `[0, len)`.
    pub batches: Vec<Vec<usize>>,
}

impl RolloutBatch {
    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }
}
