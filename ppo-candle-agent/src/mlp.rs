//! Multilayer perceptron.
mod base;
mod config;
mod gaussian;
use anyhow::Result;
pub use base::Mlp;
use candle_core::{Module, Tensor};
use candle_nn::{init::Init, Linear, VarBuilder};
pub use config::MlpConfig;
pub use gaussian::GaussianMlp;

/// Linear layer with Xavier-uniform weights and zero biases.
fn xavier_linear(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Linear> {
    let bound = (6.0 / (in_dim + out_dim) as f64).sqrt();
    let init = Init::Uniform {
        lo: -bound,
        up: bound,
    };
    let ws = vb.get_with_hints((out_dim, in_dim), "weight", init)?;
    let bs = vb.get_with_hints(out_dim, "bias", Init::Const(0.0))?;
    Ok(Linear::new(ws, Some(bs)))
}

/// Returns linear layers with the given `(in_dim, out_dim)` pairs.
///
/// Layers are named `{prefix}.ln{i}`.
fn create_linear_layers(
    prefix: &str,
    vb: VarBuilder,
    in_out_pairs: &[(i64, i64)],
) -> Result<Vec<Linear>> {
    let vb = vb.pp(prefix);

    in_out_pairs
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| {
            xavier_linear(in_dim as _, out_dim as _, vb.pp(format!("ln{}", i)))
        })
        .collect()
}

/// Applies `layers` with ReLU between them.
///
/// ReLU is also applied after the last layer if `activation_out` is `true`.
fn mlp_forward(xs: &Tensor, layers: &[Linear], activation_out: bool) -> Result<Tensor> {
    let n_layers = layers.len();
    let mut xs = xs.clone();

    for (i, layer) in layers.iter().enumerate() {
        xs = layer.forward(&xs)?;
        if i + 1 < n_layers || activation_out {
            xs = xs.relu()?;
        }
    }

    Ok(xs)
}
