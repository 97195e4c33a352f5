//! Clipped surrogate objective.
use anyhow::Result;
use candle_core::{DType, Tensor};

/// Element-wise clipped surrogate `min(r * A, clip(r, 1 - eps, 1 + eps) * A)`.
///
/// `ratio` and `adv` have the same shape. The actor loss is the negated mean
/// of the returned tensor.
pub fn clipped_surrogate(ratio: &Tensor, adv: &Tensor, clip: f64) -> Result<Tensor> {
    let unclipped = (ratio * adv)?;
    let clipped = (ratio.clamp(1.0 - clip, 1.0 + clip)? * adv)?;
    Ok(unclipped.minimum(&clipped)?)
}

/// Fraction of ratios outside `[1 - eps, 1 + eps]`.
pub fn clip_fraction(ratio: &Tensor, clip: f64) -> Result<f32> {
    let outside = (ratio - 1.0)?.abs()?.gt(clip)?.to_dtype(DType::F32)?;
    Ok(outside.mean_all()?.to_scalar::<f32>()?)
}
