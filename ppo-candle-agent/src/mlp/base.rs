use super::{create_linear_layers, mlp_forward, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{Linear, VarBuilder};

/// Multilayer perceptron with ReLU activation function.
///
/// Used as the state-value network with `out_dim = 1`.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        mlp_forward(&xs, &self.layers, self.config.activation_out)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let mut in_out_pairs = config.hidden_in_out_pairs();
        in_out_pairs.push((config.feature_dim(), config.out_dim));
        let layers = create_linear_layers("mlp", vb, &in_out_pairs)?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }
}
