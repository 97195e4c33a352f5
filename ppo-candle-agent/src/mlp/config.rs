use crate::util::OutDim;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp) and [`GaussianMlp`](super::GaussianMlp).
pub struct MlpConfig {
    pub(super) in_dim: i64,
    pub(super) units: Vec<i64>,
    pub(super) out_dim: i64,
    pub(super) activation_out: bool,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `units` - Numbers of units of the hidden layers.
    /// * `activation_out` - If `true`, activation function is added in the final layer.
    ///   Ignored by [`GaussianMlp`](super::GaussianMlp), whose mean head is linear.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }

    /// Returns the `(in_dim, out_dim)` pairs of the hidden layers.
    pub(super) fn hidden_in_out_pairs(&self) -> Vec<(i64, i64)> {
        let mut dims = vec![self.in_dim];
        dims.extend(self.units.iter().cloned());
        dims.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Returns the dimension of the last hidden layer, or the input if there is none.
    pub(super) fn feature_dim(&self) -> i64 {
        *self.units.last().unwrap_or(&self.in_dim)
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }
}
