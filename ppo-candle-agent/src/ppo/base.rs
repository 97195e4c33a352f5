//! PPO agent.
use super::{
    loss::{clip_fraction, clipped_surrogate},
    PpoConfig,
};
use crate::{
    actor::GaussianActor,
    critic::Critic,
    model::SubModel1,
    opt::clip_grad_norm,
    util::OutDim,
};
use anyhow::Result;
use candle_core::{backprop::GradStore, Device, Tensor};
use log::{debug, info, trace};
use ppo_core::{
    gae::normalized_gae,
    record::{Record, RecordValue},
    RolloutBuffer, RolloutBufferConfig, RunningRewardStats, Transition,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Result of [`Ppo::choose_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSample {
    /// Bounded action handed to the environment.
    pub action: Vec<f32>,

    /// Sample of the policy distribution before squashing into `action`.
    pub raw_action: Vec<f32>,

    /// Log-probability of the raw (unsquashed) action.
    pub log_prob: f32,

    /// State value of the observation.
    pub value: f32,
}

/// Losses of a minibatch, kept on the graph.
struct MinibatchLosses {
    ratio: Tensor,
    entropy: Tensor,
    loss_actor: Tensor,
    loss_critic: Tensor,
}

/// Proximal policy optimization (PPO) agent for continuous actions.
///
/// The agent alternates between collecting `horizon` transitions with
/// [`Ppo::choose_action`] and [`Ppo::remember`], and a call of [`Ppo::learn`]
/// which consumes the rollout.
pub struct Ppo<P, V>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    V: SubModel1<Input = Tensor, Output = Tensor>,
    V::Config: DeserializeOwned + Serialize,
{
    actor: GaussianActor<P>,
    critic: Critic<V>,
    buffer: RolloutBuffer,
    reward_stats: RunningRewardStats,
    gamma: f64,
    gae_lambda: f64,
    policy_clip: f64,
    horizon: usize,
    n_epochs: usize,
    entropy_coef: f64,
    value_coef: f64,
    max_grad_norm: f64,
    sample_std_min: f64,
    update_std_min: f64,
    normalize_reward: bool,
    chkpt_dir: PathBuf,
    train: bool,
    device: Device,
}

impl<P, V> Ppo<P, V>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    V: SubModel1<Input = Tensor, Output = Tensor>,
    V::Config: DeserializeOwned + Serialize,
{
    /// Constructs PPO agent.
    pub fn build(config: PpoConfig<P::Config, V::Config>) -> Result<Self> {
        let device = config.device.to_candle()?;
        if device.is_cuda() {
            device.set_seed(config.seed)?;
        }
        let actor = GaussianActor::build(config.actor_config, device.clone())?;
        let critic = Critic::build(config.critic_config, device.clone())?;
        let buffer = RolloutBuffer::build(
            &RolloutBufferConfig::default()
                .batch_size(config.batch_size)
                .seed(config.seed),
        )?;

        Ok(Self {
            actor,
            critic,
            buffer,
            reward_stats: RunningRewardStats::new(),
            gamma: config.gamma,
            gae_lambda: config.gae_lambda,
            policy_clip: config.policy_clip,
            horizon: config.horizon,
            n_epochs: config.n_epochs,
            entropy_coef: config.entropy_coef,
            value_coef: config.value_coef,
            max_grad_norm: config.max_grad_norm,
            sample_std_min: config.sample_std_min,
            update_std_min: config.update_std_min,
            normalize_reward: config.normalize_reward,
            chkpt_dir: config.chkpt_dir,
            train: true,
            device,
        })
    }

    /// Samples an action for a single observation.
    ///
    /// In evaluation mode the action is `2 * tanh(mean)`.
    pub fn choose_action(&self, state: &[f32]) -> Result<ActionSample> {
        let obs = Tensor::from_slice(state, (1, state.len()), &self.device)?;
        let (action, raw_action, log_prob) = match self.train {
            true => self.actor.sample_normal(&obs, self.sample_std_min)?,
            false => self.actor.deterministic(&obs, self.sample_std_min)?,
        };
        let value = self.critic.forward(&obs)?;

        Ok(ActionSample {
            action: action.detach().squeeze(0)?.to_vec1::<f32>()?,
            raw_action: raw_action.detach().squeeze(0)?.to_vec1::<f32>()?,
            log_prob: log_prob.detach().squeeze(0)?.to_scalar::<f32>()?,
            value: value.detach().squeeze(0)?.to_scalar::<f32>()?,
        })
    }

    /// Stores a transition.
    ///
    /// The reward is normalized before stored if enabled in the configuration.
    pub fn remember(&mut self, mut transition: Transition) -> Result<()> {
        if self.normalize_reward {
            transition.reward = self.normalize_reward(transition.reward)?;
        }
        self.buffer.store(transition);
        Ok(())
    }

    /// Updates running reward statistics and returns the normalized reward.
    pub fn normalize_reward(&mut self, reward: f32) -> Result<f32> {
        Ok(self.reward_stats.normalize(reward)?)
    }

    /// Returns the running reward statistics.
    pub fn reward_stats(&self) -> &RunningRewardStats {
        &self.reward_stats
    }

    /// Returns `true` if the rollout reached the horizon.
    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= self.horizon
    }

    /// Number of transitions in the rollout.
    pub fn n_transitions(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the losses of a minibatch.
    ///
    /// `loss_critic` regresses the values onto `adv + V.detach()`, so its
    /// gradient flows through the critic only.
    fn minibatch_losses(
        &self,
        states: &Tensor,
        raw_actions: &Tensor,
        old_log_probs: &Tensor,
        adv: &Tensor,
    ) -> Result<MinibatchLosses> {
        let (new_log_probs, entropy) =
            self.actor.evaluate(states, raw_actions, self.update_std_min)?;
        let value = self.critic.forward(states)?;

        let ratio = (new_log_probs - old_log_probs)?.exp()?;
        let entropy = entropy.mean_all()?;
        let loss_actor = (clipped_surrogate(&ratio, adv, self.policy_clip)?
            .mean_all()?
            .neg()?
            - (&entropy * self.entropy_coef)?)?;
        let returns = (adv + value.detach())?;
        let loss_critic = (returns - &value)?.sqr()?.mean_all()?;

        Ok(MinibatchLosses {
            ratio,
            entropy,
            loss_actor,
            loss_critic,
        })
    }

    /// Backpropagates the total loss and clips the gradients of the actor and
    /// the critic separately.
    ///
    /// Returns the gradients with the pre-clip norms of both parameter sets.
    fn clipped_grads(&self, losses: &MinibatchLosses) -> Result<(GradStore, f64, f64)> {
        let loss = (&losses.loss_actor + (&losses.loss_critic * self.value_coef)?)?;
        let mut grads = loss.backward()?;
        let norm_actor = clip_grad_norm(&mut grads, &self.actor.vars(), self.max_grad_norm)?;
        let norm_critic = clip_grad_norm(&mut grads, &self.critic.vars(), self.max_grad_norm)?;
        Ok((grads, norm_actor, norm_critic))
    }

    /// Optimizes the actor and the critic on the rollout, then clears it.
    pub fn learn(&mut self) -> Result<Record> {
        let n_transitions = self.buffer.len();
        let mut loss_actor = 0f32;
        let mut loss_critic = 0f32;
        let mut entropy = 0f32;
        let mut clip_frac = 0f32;
        let mut grad_norm_actor = 0f32;
        let mut grad_norm_critic = 0f32;
        let mut n_updates = 0usize;

        for epoch in 0..self.n_epochs {
            trace!("generate_batches()");
            let batch = self.buffer.generate_batches()?;
            let n = batch.len();
            let adv = normalized_gae(
                &batch.rewards,
                &batch.values,
                &batch.dones,
                self.gamma,
                self.gae_lambda,
            )?;

            let states = Tensor::from_vec(batch.states, (n, batch.obs_dim), &self.device)?;
            let raw_actions =
                Tensor::from_vec(batch.raw_actions, (n, batch.act_dim), &self.device)?;
            let old_log_probs = Tensor::from_vec(batch.log_probs, n, &self.device)?;
            let adv = Tensor::from_vec(adv, n, &self.device)?;

            let mut epoch_loss_actor = 0f32;
            let mut epoch_loss_critic = 0f32;

            for ixs in batch.batches.iter() {
                let ixs = {
                    let ixs: Vec<u32> = ixs.iter().map(|&i| i as u32).collect();
                    let len = ixs.len();
                    Tensor::from_vec(ixs, len, &self.device)?
                };
                let s = states.index_select(&ixs, 0)?;
                let a = raw_actions.index_select(&ixs, 0)?;
                let old_lp = old_log_probs.index_select(&ixs, 0)?;
                let adv = adv.index_select(&ixs, 0)?;

                trace!("Losses");
                let losses = self.minibatch_losses(&s, &a, &old_lp, &adv)?;

                trace!("Backward pass and optimizer steps");
                let (grads, gn_a, gn_c) = self.clipped_grads(&losses)?;
                self.actor.step(&grads)?;
                self.critic.step(&grads)?;

                epoch_loss_actor += losses.loss_actor.to_scalar::<f32>()?;
                epoch_loss_critic += losses.loss_critic.to_scalar::<f32>()?;
                entropy += losses.entropy.to_scalar::<f32>()?;
                clip_frac += clip_fraction(&losses.ratio, self.policy_clip)?;
                grad_norm_actor += gn_a as f32;
                grad_norm_critic += gn_c as f32;
            }

            let k = batch.batches.len().max(1) as f32;
            debug!(
                "epoch {}: loss_actor = {}, loss_critic = {}",
                epoch,
                epoch_loss_actor / k,
                epoch_loss_critic / k
            );
            loss_actor += epoch_loss_actor;
            loss_critic += epoch_loss_critic;
            n_updates += batch.batches.len();
        }

        self.buffer.clear();

        let k = n_updates.max(1) as f32;
        let record = Record::from_slice(&[
            ("loss_actor", RecordValue::Scalar(loss_actor / k)),
            ("loss_critic", RecordValue::Scalar(loss_critic / k)),
            ("entropy", RecordValue::Scalar(entropy / k)),
            ("clip_fraction", RecordValue::Scalar(clip_frac / k)),
            ("grad_norm_actor", RecordValue::Scalar(grad_norm_actor / k)),
            ("grad_norm_critic", RecordValue::Scalar(grad_norm_critic / k)),
            ("n_transitions", RecordValue::Scalar(n_transitions as f32)),
        ]);
        info!(
            "learn: {} transitions, {} updates, loss_actor = {}, loss_critic = {}",
            n_transitions,
            n_updates,
            loss_actor / k,
            loss_critic / k
        );

        Ok(record)
    }

    /// Sets the agent to training mode: actions are sampled.
    pub fn train(&mut self) {
        self.train = true;
    }

    /// Sets the agent to evaluation mode: actions are deterministic.
    pub fn eval(&mut self) {
        self.train = false;
    }

    /// Returns `true` in training mode.
    pub fn is_train(&self) -> bool {
        self.train
    }

    /// Saves the actor and the critic into the checkpoint directory.
    pub fn save_models(&self) -> Result<Vec<PathBuf>> {
        self.save_params(&self.chkpt_dir)
    }

    /// Loads the actor and the critic from the checkpoint directory.
    pub fn load_models(&mut self) -> Result<()> {
        let dir = self.chkpt_dir.clone();
        self.load_params(&dir)
    }

    /// Saves the actor and the critic into `path`.
    pub fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(path)?;
        let actor_path = self.actor.save(path.join("actor_ppo"))?;
        let critic_path = self.critic.save(path.join("critic_ppo"))?;

        Ok(vec![actor_path, critic_path])
    }

    /// Loads the actor and the critic from `path`.
    pub fn load_params(&mut self, path: &Path) -> Result<()> {
        self.actor.load(path.join("actor_ppo"))?;
        self.critic.load(path.join("critic_ppo"))?;

        Ok(())
    }
}
