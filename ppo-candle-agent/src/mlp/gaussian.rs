use super::{create_linear_layers, mlp_forward, xavier_linear, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Module, Tensor};
use candle_nn::{init::Init, Linear, VarBuilder};

/// Policy network of a diagonal Gaussian with state-independent deviation.
///
/// The mean is a linear head on top of ReLU features. The log standard
/// deviation is a single learned vector shared by all states, initialized to
/// zero, i.e., unit standard deviation.
///
/// The output is `(mean, log_std)`, both of shape `(batch_size, out_dim)`.
pub struct GaussianMlp {
    _config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
    mean: Linear,
    log_std: Tensor,
}

impl SubModel1 for GaussianMlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = (Tensor, Tensor);

    fn forward(&self, xs: &Self::Input) -> Result<Self::Output> {
        let batch_size = xs.dims()[0];
        let xs = xs.to_device(&self.device)?;
        let features = mlp_forward(&xs, &self.layers, true)?;
        let mean = self.mean.forward(&features)?;
        let log_std = self.log_std.repeat((batch_size, 1))?;
        Ok((mean, log_std))
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let out_dim = config.out_dim as usize;
        let layers = create_linear_layers("mlp", vb.clone(), &config.hidden_in_out_pairs())?;
        let mean = xavier_linear(config.feature_dim() as _, out_dim, vb.pp("mean"))?;
        let log_std = vb.get_with_hints((1, out_dim), "log_std", Init::Const(0.0))?;

        Ok(Self {
            _config: config,
            device,
            layers,
            mean,
            log_std,
        })
    }
}
