//! Configuration of PPO agent.
use crate::{actor::ActorConfig, critic::CriticConfig, util::OutDim, Device};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`Ppo`](super::Ppo).
///
/// `P` and `V` are the configurations of the policy and value networks.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig<P: OutDim, V> {
    /// Configuration of the actor.
    pub actor_config: ActorConfig<P>,

    /// Configuration of the critic.
    pub critic_config: CriticConfig<V>,

    /// Discount factor.
    pub gamma: f64,

    /// Bias/variance trade-off of generalized advantage estimation.
    pub gae_lambda: f64,

    /// Clip width of the probability ratio.
    pub policy_clip: f64,

    /// Minibatch size.
    pub batch_size: usize,

    /// Number of transitions collected before each call of `learn`.
    pub horizon: usize,

    /// Number of passes over the rollout per `learn`.
    pub n_epochs: usize,

    /// Weight of the entropy bonus.
    pub entropy_coef: f64,

    /// Weight of the critic loss in the joint loss.
    pub value_coef: f64,

    /// Maximum gradient norm, applied to the actor and the critic separately.
    pub max_grad_norm: f64,

    /// Floor of the standard deviation when sampling actions.
    pub sample_std_min: f64,

    /// Floor of the standard deviation when updating the policy.
    pub update_std_min: f64,

    /// If `true`, rewards are normalized with running statistics before stored.
    pub normalize_reward: bool,

    /// Directory of checkpoints written by `save_models`.
    pub chkpt_dir: PathBuf,

    /// Random seed of minibatch shuffling.
    pub seed: u64,

    /// Device used for the actor and critic models.
    pub device: Device,
}

impl<P: OutDim, V> Default for PpoConfig<P, V> {
    fn default() -> Self {
        Self {
            actor_config: Default::default(),
            critic_config: Default::default(),
            gamma: 0.99,
            gae_lambda: 0.95,
            policy_clip: 0.2,
            batch_size: 64,
            horizon: 2048,
            n_epochs: 10,
            entropy_coef: 0.01,
            value_coef: 0.5,
            max_grad_norm: 0.5,
            sample_std_min: 1e-6,
            update_std_min: 1e-4,
            normalize_reward: false,
            chkpt_dir: PathBuf::from("tmp/ppo"),
            seed: 42,
            device: Device::Cpu,
        }
    }
}

impl<P, V> PpoConfig<P, V>
where
    P: DeserializeOwned + Serialize + OutDim,
    V: DeserializeOwned + Serialize,
{
    /// Configuration of actor.
    pub fn actor_config(mut self, actor_config: ActorConfig<P>) -> Self {
        self.actor_config = actor_config;
        self
    }

    /// Configuration of critic.
    pub fn critic_config(mut self, critic_config: CriticConfig<V>) -> Self {
        self.critic_config = critic_config;
        self
    }

    /// Sets the learning rate of both the actor and the critic.
    pub fn learning_rate(mut self, alpha: f64) -> Self {
        self.actor_config.opt_config = self.actor_config.opt_config.learning_rate(alpha);
        self.critic_config.opt_config = self.critic_config.opt_config.learning_rate(alpha);
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// GAE lambda.
    pub fn gae_lambda(mut self, v: f64) -> Self {
        self.gae_lambda = v;
        self
    }

    /// Clip width of the probability ratio.
    pub fn policy_clip(mut self, v: f64) -> Self {
        self.policy_clip = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Rollout horizon.
    pub fn horizon(mut self, v: usize) -> Self {
        self.horizon = v;
        self
    }

    /// Number of epochs per `learn`.
    pub fn n_epochs(mut self, v: usize) -> Self {
        self.n_epochs = v;
        self
    }

    /// Entropy coefficient.
    pub fn entropy_coef(mut self, v: f64) -> Self {
        self.entropy_coef = v;
        self
    }

    /// Critic loss coefficient.
    pub fn value_coef(mut self, v: f64) -> Self {
        self.value_coef = v;
        self
    }

    /// Maximum gradient norm.
    pub fn max_grad_norm(mut self, v: f64) -> Self {
        self.max_grad_norm = v;
        self
    }

    /// Floors of the standard deviation at sampling and update time.
    pub fn std_min(mut self, sample: f64, update: f64) -> Self {
        self.sample_std_min = sample;
        self.update_std_min = update;
        self
    }

    /// Enables reward normalization of stored transitions.
    pub fn normalize_reward(mut self, v: bool) -> Self {
        self.normalize_reward = v;
        self
    }

    /// Checkpoint directory.
    pub fn chkpt_dir(mut self, v: impl AsRef<Path>) -> Self {
        self.chkpt_dir = v.as_ref().to_path_buf();
        self
    }

    /// Random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Loads [`PpoConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        log::info!("Load config of PPO agent from {}", path_.to_str().unwrap_or("?"));
        Ok(b)
    }

    /// Saves [`PpoConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        log::info!("Save config of PPO agent into {}", path_.to_str().unwrap_or("?"));
        Ok(())
    }
}
