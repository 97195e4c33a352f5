//! Generalized advantage estimation (GAE).
//!
//! For a time-ordered sequence of `n` transitions,
//!
//! ```text
//! delta[t] = r[t] + gamma * v[t + 1] * (1 - done[t]) - v[t]
//! adv[t]   = delta[t] + gamma * lambda * adv[t + 1]
//! ```
//!
//! for `t = n - 2, ..., 0`. The last transition has no successor value in the
//! buffer, so `adv[n - 1]` is left at zero and also seeds the recursion.
use crate::error::PpoError;

const NORMALIZE_EPS: f64 = 1e-8;

/// Computes raw GAE advantages.
///
/// `dones[t]` is nonzero if the episode terminated at step `t`.
/// Accumulation is done in `f64`.
pub fn gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[i8],
    gamma: f64,
    lambda: f64,
) -> Result<Vec<f32>, PpoError> {
    let n = rewards.len();
    check_len("values", n, values.len())?;
    check_len("dones", n, dones.len())?;

    let mut adv = vec![0f32; n];
    let mut last_adv = 0f64;

    for t in (0..n.saturating_sub(1)).rev() {
        let not_done = 1.0 - (dones[t] != 0) as i32 as f64;
        let delta =
            rewards[t] as f64 + gamma * values[t + 1] as f64 * not_done - values[t] as f64;
        last_adv = delta + gamma * lambda * last_adv;
        adv[t] = last_adv as f32;
    }

    Ok(adv)
}

/// Shifts and scales advantages to zero mean and unit population variance.
///
/// `1e-8` is added to the standard deviation, so a constant input maps to
/// zeros instead of NaN.
pub fn normalize(adv: &[f32]) -> Vec<f32> {
    if adv.is_empty() {
        return vec![];
    }

    let n = adv.len() as f64;
    let mean = adv.iter().map(|&a| a as f64).sum::<f64>() / n;
    let var = adv
        .iter()
        .map(|&a| (a as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = var.sqrt() + NORMALIZE_EPS;

    adv.iter()
        .map(|&a| ((a as f64 - mean) / std) as f32)
        .collect()
}

/// Computes GAE advantages and normalizes them over the whole array.
pub fn normalized_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[i8],
    gamma: f64,
    lambda: f64,
) -> Result<Vec<f32>, PpoError> {
    Ok(normalize(&gae(rewards, values, dones, gamma, lambda)?))
}

fn check_len(name: &'static str, expected: usize, actual: usize) -> Result<(), PpoError> {
    if expected != actual {
        return Err(PpoError::LengthMismatch {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(x: f32, y: f64, tol: f64) {
        assert!(
            (x as f64 - y).abs() < tol,
            "expected {}, got {} (tol = {})",
            y,
            x,
            tol
        );
    }

    #[test]
    fn test_gae_four_steps() -> Result<(), PpoError> {
        let (gamma, lambda) = (0.99, 0.95);
        let adv = gae(&[1.0; 4], &[0.0; 4], &[0, 0, 0, 1], gamma, lambda)?;

        // All values are zero, so every delta equals the reward.
        let a2 = 1.0;
        let a1 = 1.0 + gamma * lambda * a2;
        let a0 = 1.0 + gamma * lambda * a1;

        assert_close(adv[2], a2, 1e-6);
        assert_close(adv[1], a1, 1e-6);
        assert_close(adv[0], a0, 1e-6);
        assert_eq!(adv[3], 0.0);

        Ok(())
    }

    #[test]
    fn test_gae_matches_discounted_td_residuals() -> Result<(), PpoError> {
        let rewards = [0.5f32, -1.0, 2.0, 0.0, 1.5, -0.5];
        let values = [0.2f32, 0.4, -0.3, 1.0, 0.7, 0.1];
        let dones = [0i8, 0, 1, 0, 0, 0];
        let (gamma, lambda) = (0.9, 0.8);
        let n = rewards.len();
        let adv = gae(&rewards, &values, &dones, gamma, lambda)?;

        let delta: Vec<f64> = (0..n - 1)
            .map(|t| {
                let not_done = if dones[t] == 0 { 1.0 } else { 0.0 };
                rewards[t] as f64 + gamma * values[t + 1] as f64 * not_done - values[t] as f64
            })
            .collect();

        for t in 0..n - 1 {
            let expected: f64 = (t..n - 1)
                .map(|k| (gamma * lambda).powi((k - t) as i32) * delta[k])
                .sum();
            assert_close(adv[t], expected, 1e-5);
        }
        assert_eq!(adv[n - 1], 0.0);

        Ok(())
    }

    #[test]
    fn test_gae_single_transition() -> Result<(), PpoError> {
        assert_eq!(gae(&[3.0], &[1.0], &[1], 0.99, 0.95)?, vec![0.0]);
        assert_eq!(normalized_gae(&[3.0], &[1.0], &[1], 0.99, 0.95)?, vec![0.0]);
        Ok(())
    }

    #[test]
    fn test_gae_length_mismatch() {
        assert_eq!(
            gae(&[1.0, 1.0], &[0.0], &[0, 0], 0.99, 0.95),
            Err(PpoError::LengthMismatch {
                name: "values",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_normalize_moments() {
        let adv = [1.0f32, -3.0, 2.5, 0.0, 7.0, 4.0, -1.0];
        let norm = normalize(&adv);
        let n = norm.len() as f64;
        let mean = norm.iter().map(|&a| a as f64).sum::<f64>() / n;
        let std = (norm.iter().map(|&a| (a as f64 - mean).powi(2)).sum::<f64>() / n).sqrt();

        assert!(mean.abs() < 1e-6);
        assert!((std - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_constant() {
        assert_eq!(normalize(&[2.0, 2.0, 2.0]), vec![0.0, 0.0, 0.0]);
        assert!(normalize(&[]).is_empty());
    }
}
