//! Diagonal Gaussian distribution.
use anyhow::Result;
use candle_core::{Tensor, D};

/// `0.5 * ln(2 * pi)`
const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;

/// Diagonal Gaussian over the last dimension of `mean` and `std`.
pub struct DiagGaussian {
    mean: Tensor,
    std: Tensor,
    log_std: Tensor,
}

impl DiagGaussian {
    /// Creates a distribution, flooring the standard deviation at `std_min`.
    pub fn new(mean: Tensor, std: &Tensor, std_min: f64) -> Result<Self> {
        let std = std.maximum(std_min)?;
        let log_std = std.log()?;
        Ok(Self { mean, std, log_std })
    }

    /// Returns the mean.
    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    /// Returns the (floored) standard deviation.
    pub fn std(&self) -> &Tensor {
        &self.std
    }

    /// Draws a sample with the reparameterization `mean + std * eps`.
    pub fn rsample(&self) -> Result<Tensor> {
        let eps = self.mean.randn_like(0.0, 1.0)?;
        Ok((&self.mean + (&self.std * eps)?)?)
    }

    /// Log density of `x`, summed over the last dimension.
    pub fn log_prob(&self, x: &Tensor) -> Result<Tensor> {
        let z = ((x - &self.mean)? / &self.std)?;
        let lp = (((z.sqr()? * -0.5)? - &self.log_std)? - HALF_LN_2PI)?;
        Ok(lp.sum(D::Minus1)?)
    }

    /// Element-wise entropy, with the same shape as the mean.
    pub fn entropy(&self) -> Result<Tensor> {
        Ok((&self.log_std + (0.5 + HALF_LN_2PI))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_log_prob_standard_normal() -> Result<()> {
        let mean = Tensor::zeros((1, 2), candle_core::DType::F32, &Device::Cpu)?;
        let std = Tensor::ones((1, 2), candle_core::DType::F32, &Device::Cpu)?;
        let dist = DiagGaussian::new(mean, &std, 1e-6)?;

        let x = Tensor::new(&[[1.0f32, -2.0]], &Device::Cpu)?;
        let lp: Vec<f32> = dist.log_prob(&x)?.to_vec1()?;
        let expected = -0.5 * (1.0 + 4.0) - 2.0 * HALF_LN_2PI;
        assert!((lp[0] as f64 - expected).abs() < 1e-5);

        let h: Vec<Vec<f32>> = dist.entropy()?.to_vec2()?;
        assert!((h[0][0] as f64 - (0.5 + HALF_LN_2PI)).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn test_floored_std_is_finite() -> Result<()> {
        let mean = Tensor::zeros((11, 1), candle_core::DType::F32, &Device::Cpu)?;
        let std = Tensor::zeros((11, 1), candle_core::DType::F32, &Device::Cpu)?;
        let dist = DiagGaussian::new(mean, &std, 1e-6)?;

        let x = Tensor::arange(-5.0f32, 6.0, &Device::Cpu)?.reshape((11, 1))?;
        let lp: Vec<f32> = dist.log_prob(&x)?.to_vec1()?;
        let h: Vec<Vec<f32>> = dist.entropy()?.to_vec2()?;
        assert!(lp.iter().all(|v| v.is_finite()));
        assert!(h.iter().flatten().all(|v| v.is_finite()));

        Ok(())
    }

    #[test]
    fn test_rsample_shape() -> Result<()> {
        let mean = Tensor::zeros((4, 3), candle_core::DType::F32, &Device::Cpu)?;
        let std = Tensor::ones((4, 3), candle_core::DType::F32, &Device::Cpu)?;
        let dist = DiagGaussian::new(mean, &std, 1e-6)?;
        assert_eq!(dist.rsample()?.dims(), &[4, 3]);
        Ok(())
    }
}
