//! Exponential running statistics of rewards.
use crate::error::PpoError;
use serde::{Deserialize, Serialize};

const DECAY: f64 = 0.99;

/// Running mean and variance of scalar rewards with exponential forgetting.
///
/// Every call to [`normalize`](Self::normalize) first updates the statistics
/// with the given reward and then standardizes the reward with them:
///
/// ```text
/// mean <- 0.99 * mean + 0.01 * r
/// var  <- 0.99 * var  + 0.01 * (r - mean)^2
/// r'    = (r - mean) / (sqrt(var) + epsilon)
/// ```
///
/// The statistics start at `mean = 0`, `var = 1` and live as long as the
/// owner; they are never reset between episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningRewardStats {
    mean: f64,
    var: f64,
    epsilon: f64,
}

impl Default for RunningRewardStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningRewardStats {
    /// Creates statistics with `mean = 0`, `var = 1` and `epsilon = 1e-8`.
    pub fn new() -> Self {
        Self {
            mean: 0.0,
            var: 1.0,
            epsilon: 1e-8,
        }
    }

    /// Current running mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Current running variance.
    pub fn var(&self) -> f64 {
        self.var
    }

    /// Updates the statistics with `reward` and returns the normalized reward.
    ///
    /// Returns [`PpoError::NonFiniteReward`] if `reward` or the result is NaN
    /// or infinite. A non-finite `reward` leaves the statistics unchanged.
    pub fn normalize(&mut self, reward: f32) -> Result<f32, PpoError> {
        let r = reward as f64;
        if !r.is_finite() {
            return Err(PpoError::NonFiniteReward(r));
        }
        self.mean = DECAY * self.mean + (1.0 - DECAY) * r;
        self.var = DECAY * self.var + (1.0 - DECAY) * (r - self.mean).powi(2);
        let normalized = (r - self.mean) / (self.var.sqrt() + self.epsilon);

        if !normalized.is_finite() {
            return Err(PpoError::NonFiniteReward(normalized));
        }

        Ok(normalized as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update() -> Result<(), PpoError> {
        let mut stats = RunningRewardStats::new();
        let r = stats.normalize(1.0)?;

        let mean = 0.01;
        let var = 0.99 + 0.01 * (1.0f64 - mean).powi(2);
        assert!((stats.mean() - mean).abs() < 1e-12);
        assert!((stats.var() - var).abs() < 1e-12);
        assert!((r as f64 - (1.0 - mean) / (var.sqrt() + 1e-8)).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn test_mean_tracks_constant_reward() -> Result<(), PpoError> {
        let mut stats = RunningRewardStats::new();
        for _ in 0..2000 {
            stats.normalize(5.0)?;
        }
        assert!((stats.mean() - 5.0).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn test_non_finite_reward() -> Result<(), PpoError> {
        let mut stats = RunningRewardStats::new();
        stats.normalize(1.0)?;
        let before = stats.clone();

        for &r in &[f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                stats.normalize(r),
                Err(PpoError::NonFiniteReward(_))
            ));
            assert_eq!(stats, before);
        }

        // Later finite rewards are still accepted
        assert!(stats.normalize(2.0)?.is_finite());

        Ok(())
    }
}
