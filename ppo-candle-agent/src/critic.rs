//! State value function.
use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{Context, Result};
use candle_core::{backprop::GradStore, DType, Device, Tensor, Var, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`Critic`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CriticConfig<V> {
    /// Configuration of value function network.
    pub value_config: Option<V>,

    /// Configuration of optimizer.
    pub opt_config: OptimizerConfig,
}

impl<V> Default for CriticConfig<V> {
    fn default() -> Self {
        Self {
            value_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<V> CriticConfig<V>
where
    V: DeserializeOwned + Serialize,
{
    /// Sets configurations for value function network.
    pub fn value_config(mut self, v: V) -> Self {
        self.value_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`CriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CriticConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// State value function.
pub struct Critic<V>
where
    V: SubModel1<Input = Tensor, Output = Tensor>,
{
    device: Device,
    varmap: VarMap,
    value: V,
    opt: Optimizer,
}

impl<V> Critic<V>
where
    V: SubModel1<Input = Tensor, Output = Tensor>,
    V::Config: DeserializeOwned + Serialize,
{
    /// Constructs [`Critic`].
    pub fn build(config: CriticConfig<V::Config>, device: Device) -> Result<Critic<V>> {
        let value_config = config.value_config.context("value_config is not set.")?;
        let varmap = VarMap::new();
        let value = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("critic");
            V::build(vb, value_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            value,
            opt,
        })
    }

    /// Returns state values of shape `(batch_size,)`.
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        let v = self.value.forward(&obs.to_device(&self.device)?)?;
        debug_assert_eq!(v.dims().len(), 2);
        debug_assert_eq!(v.dims()[1], 1);
        Ok(v.squeeze(D::Minus1)?)
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
        info!("Save critic parameters to {:?}", path);

        Ok(path)
    }

    /// Load variables from prefix + ".pt".
    pub fn load(&mut self, prefix: impl AsRef<Path>) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.load(path.as_path())?;
        info!("Load critic parameters from {:?}", path);

        Ok(())
    }
}
