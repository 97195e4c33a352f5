//! Utilities.
use anyhow::Result;
use candle_core::Tensor;

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;
}

/// Returns the L2 norm of all elements of the given tensors.
pub fn global_norm(ts: &[Tensor]) -> Result<f64> {
    let mut sq = 0f64;
    for t in ts {
        sq += t.sqr()?.sum_all()?.to_dtype(candle_core::DType::F64)?.to_scalar::<f64>()?;
    }
    Ok(sq.sqrt())
}
