//! Actor with a squashed diagonal Gaussian policy.
use crate::{
    dist::DiagGaussian,
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::OutDim,
};
use anyhow::{Context, Result};
use candle_core::{backprop::GradStore, DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Bound of the action: `action = ACTION_BOUND * tanh(raw)`.
pub const ACTION_BOUND: f64 = 2.0;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`GaussianActor`].
pub struct ActorConfig<P: OutDim> {
    /// Configuration of the policy network.
    pub policy_config: Option<P>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,
}

impl<P: OutDim> Default for ActorConfig<P> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<P> ActorConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for policy function.
    pub fn policy_config(mut self, v: P) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`ActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Actor with a diagonal Gaussian policy squashed into `[-2, 2]`.
///
/// The log-probability of an action is the Normal density of the raw sample
/// before `tanh`. The Jacobian of the squashing is not included. Callers keep
/// the raw sample and pass it back to [`GaussianActor::evaluate`].
pub struct GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the action vector.
    out_dim: i64,

    policy: P,
    opt: Optimizer,
}

impl<P> GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`GaussianActor`].
    pub fn build(config: ActorConfig<P::Config>, device: Device) -> Result<GaussianActor<P>> {
        let policy_config = config.policy_config.context("policy_config is not set.")?;
        let out_dim = policy_config.get_out_dim();
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("actor");
            P::build(vb, policy_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            out_dim,
            policy,
            opt,
        })
    }

    /// Returns `(mean, std)` of the Gaussian distribution given observations.
    ///
    /// The shape of the both tensors is `(batch_size, action_dimension)`.
    /// The standard deviation is not floored here.
    pub fn forward(&self, obs: &Tensor) -> Result<(Tensor, Tensor)> {
        let (mean, log_std) = self.policy.forward(&obs.to_device(&self.device)?)?;
        debug_assert_eq!(mean.dims().len(), 2);
        debug_assert_eq!(mean.dims()[1], self.out_dim as usize);
        debug_assert_eq!(log_std.dims(), mean.dims());
        Ok((mean, log_std.exp()?))
    }

    /// Returns the distribution over raw (unsquashed) actions with `std >= std_min`.
    pub fn dist(&self, obs: &Tensor, std_min: f64) -> Result<DiagGaussian> {
        let (mean, std) = self.forward(obs)?;
        DiagGaussian::new(mean, &std, std_min)
    }

    /// Samples bounded actions.
    ///
    /// Returns `(action, raw, log_prob)` where `raw ~ N(mean, std)`,
    /// `action = 2 * tanh(raw)` and `log_prob` is the density of `raw`.
    pub fn sample_normal(&self, obs: &Tensor, std_min: f64) -> Result<(Tensor, Tensor, Tensor)> {
        let dist = self.dist(obs, std_min)?;
        let raw = dist.rsample()?;
        let log_prob = dist.log_prob(&raw)?;
        Ok((squash(&raw)?, raw, log_prob))
    }

    /// Returns `(2 * tanh(mean), mean, log_prob(mean))`.
    pub fn deterministic(&self, obs: &Tensor, std_min: f64) -> Result<(Tensor, Tensor, Tensor)> {
        let dist = self.dist(obs, std_min)?;
        let log_prob = dist.log_prob(dist.mean())?;
        let raw = dist.mean().clone();
        Ok((squash(&raw)?, raw, log_prob))
    }

    /// Returns `(log_prob, entropy)` of raw actions returned by
    /// [`Self::sample_normal`].
    ///
    /// `log_prob` has shape `(batch_size,)`, `entropy` is per element.
    pub fn evaluate(
        &self,
        obs: &Tensor,
        raw_actions: &Tensor,
        std_min: f64,
    ) -> Result<(Tensor, Tensor)> {
        let dist = self.dist(obs, std_min)?;
        let raw = raw_actions.to_device(&self.device)?;
        Ok((dist.log_prob(&raw)?, dist.entropy()?))
    }

    /// Returns the trainable variables.
    pub fn vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// Applies an optimizer step with precomputed gradients.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        self.opt.step(grads)
    }

    /// Save variables to prefix + ".pt".
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.save(path.as_path())?;
        info!("Save actor parameters to {:?}", path);

        Ok(path)
    }

    /// Load variables from prefix + ".pt".
    pub fn load(&mut self, prefix: impl AsRef<Path>) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.load(path.as_path())?;
        info!("Load actor parameters from {:?}", path);

        Ok(())
    }
}

fn squash(raw: &Tensor) -> Result<Tensor> {
    Ok((raw.tanh()? * ACTION_BOUND)?)
}
