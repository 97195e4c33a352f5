//! Optimizers.
use crate::util::global_norm;
use anyhow::Result;
use candle_core::{backprop::GradStore, Tensor, Var};
use candle_nn::Optimizer as _;
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training the actor and the critic.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

impl OptimizerConfig {
    /// Constructs an optimizer over `vars`.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
        }
    }

    /// Overrides the learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::Adam { lr: _ } => Self::Adam { lr },
        }
    }

    /// Returns the learning rate.
    pub fn get_learning_rate(&self) -> f64 {
        match self {
            Self::Adam { lr } => *lr,
        }
    }
}

impl Default for OptimizerConfig {
    /// Adam with learning rate `3e-4`.
    fn default() -> Self {
        Self::Adam { lr: 3e-4 }
    }
}

/// Optimizers.
///
/// This is a thin wrapper of optimizers in `candle_optimisers`.
pub enum Optimizer {
    /// Adam optimizer.
    Adam(Adam),
}

impl Optimizer {
    /// Updates the variables with precomputed gradients.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::Adam(opt) => Ok(opt.step(grads)?),
        }
    }
}

/// Rescales the gradients of `vars` so that their joint L2 norm is at most `max_norm`.
///
/// Variables without a gradient are skipped. Returns the norm before clipping.
pub fn clip_grad_norm(grads: &mut GradStore, vars: &[Var], max_norm: f64) -> Result<f64> {
    let gs: Vec<Tensor> = vars
        .iter()
        .filter_map(|v| grads.get(v.as_tensor()).cloned())
        .collect();
    let norm = global_norm(&gs)?;
    let scale = max_norm / (norm + 1e-6);

    if scale < 1.0 {
        for var in vars {
            if let Some(g) = grads.get(var.as_tensor()) {
                let g = (g * scale)?;
                grads.insert(var.as_tensor(), g);
            }
        }
    }

    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn grads_of(vars: &[Var], target: f32) -> Result<GradStore> {
        // loss = sum((v - target)^2 / 2), grad = v - target
        let mut loss = Tensor::zeros((), DType::F32, &Device::Cpu)?;
        for v in vars {
            let d = (v.as_tensor() - target as f64)?;
            loss = (loss + (d.sqr()?.sum_all()? * 0.5)?)?;
        }
        Ok(loss.backward()?)
    }

    #[test]
    fn test_clip_grad_norm_scales_down() -> Result<()> {
        let v1 = Var::from_tensor(&Tensor::new(&[3.0f32], &Device::Cpu)?)?;
        let v2 = Var::from_tensor(&Tensor::new(&[4.0f32], &Device::Cpu)?)?;
        let vars = vec![v1.clone(), v2.clone()];
        let mut grads = grads_of(&vars, 0.0)?;

        let norm = clip_grad_norm(&mut grads, &vars, 0.5)?;
        assert!((norm - 5.0).abs() < 1e-5);

        let gs: Vec<Tensor> = vars
            .iter()
            .map(|v| grads.get(v.as_tensor()).unwrap().clone())
            .collect();
        assert!((global_norm(&gs)? - 0.5).abs() < 1e-4);

        // Direction is preserved
        let g1: Vec<f32> = gs[0].to_vec1()?;
        let g2: Vec<f32> = gs[1].to_vec1()?;
        assert!((g1[0] / g2[0] - 0.75).abs() < 1e-5);

        Ok(())
    }

    #[test]
    fn test_clip_grad_norm_keeps_small_gradients() -> Result<()> {
        let v = Var::from_tensor(&Tensor::new(&[0.1f32, 0.2], &Device::Cpu)?)?;
        let vars = vec![v.clone()];
        let mut grads = grads_of(&vars, 0.0)?;

        clip_grad_norm(&mut grads, &vars, 0.5)?;
        let g: Vec<f32> = grads.get(v.as_tensor()).unwrap().to_vec1()?;
        assert_eq!(g, vec![0.1, 0.2]);

        Ok(())
    }

    #[test]
    fn test_step_descends() -> Result<()> {
        let v = Var::from_tensor(&Tensor::new(&[1.0f32], &Device::Cpu)?)?;
        let mut opt = OptimizerConfig::Adam { lr: 0.1 }.build(vec![v.clone()])?;
        for _ in 0..5 {
            let grads = v.as_tensor().sqr()?.sum_all()?.backward()?;
            opt.step(&grads)?;
        }
        let x: Vec<f32> = v.as_tensor().to_vec1()?;
        assert!(x[0] < 1.0);

        Ok(())
    }

    #[test]
    fn test_learning_rate_override() {
        let config = OptimizerConfig::default().learning_rate(1e-3);
        assert_eq!(config, OptimizerConfig::Adam { lr: 1e-3 });
        assert_eq!(config.get_learning_rate(), 1e-3);
    }
}
