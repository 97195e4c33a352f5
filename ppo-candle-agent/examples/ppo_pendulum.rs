use anyhow::Result;
use clap::Parser;
use log::info;
use ppo_candle_agent::{
    actor::ActorConfig,
    critic::CriticConfig,
    mlp::{GaussianMlp, Mlp, MlpConfig},
    ppo::{Ppo, PpoConfig},
};
use ppo_core::Transition;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::PI;

const DIM_OBS: i64 = 3;
const DIM_ACT: i64 = 1;
const UNITS: [i64; 2] = [256, 256];
const LR: f64 = 3e-4;
const HORIZON: usize = 2048;
const BATCH_SIZE: usize = 64;
const N_EPOCHS: usize = 10;
const MAX_STEPS: usize = 200;
const N_EPISODES: usize = 300;

mod env {
    use super::*;

    const MAX_SPEED: f32 = 8.0;
    const MAX_TORQUE: f32 = 2.0;
    const DT: f32 = 0.05;
    const G: f32 = 10.0;
    const M: f32 = 1.0;
    const L: f32 = 1.0;

    /// Pendulum swing-up with observation `[cos(theta), sin(theta), theta_dot]`.
    pub struct Pendulum {
        theta: f32,
        theta_dot: f32,
        steps: usize,
        max_steps: usize,
        rng: StdRng,
    }

    impl Pendulum {
        pub fn new(max_steps: usize, seed: u64) -> Self {
            Self {
                theta: 0.0,
                theta_dot: 0.0,
                steps: 0,
                max_steps,
                rng: StdRng::seed_from_u64(seed),
            }
        }

        fn obs(&self) -> Vec<f32> {
            vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
        }

        fn angle_normalize(x: f32) -> f32 {
            (x + PI).rem_euclid(2.0 * PI) - PI
        }

        pub fn reset(&mut self) -> Vec<f32> {
            self.theta = self.rng.gen_range(-PI..PI);
            self.theta_dot = self.rng.gen_range(-1.0..1.0);
            self.steps = 0;
            self.obs()
        }

        /// Returns `(next_obs, reward, done)`.
        pub fn step(&mut self, act: &[f32]) -> (Vec<f32>, f32, bool) {
            let u = act[0].clamp(-MAX_TORQUE, MAX_TORQUE);
            let th = Self::angle_normalize(self.theta);
            let reward = -(th * th + 0.1 * self.theta_dot * self.theta_dot + 0.001 * u * u);

            let acc = 3.0 * G / (2.0 * L) * self.theta.sin() + 3.0 / (M * L * L) * u;
            self.theta_dot = (self.theta_dot + acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
            self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);
            self.steps += 1;

            (self.obs(), reward, self.steps >= self.max_steps)
        }
    }
}

use env::Pendulum;

fn create_agent(units: Vec<i64>, horizon: usize, model_dir: &str) -> Result<Ppo<GaussianMlp, Mlp>> {
    let actor_config = ActorConfig::default()
        .policy_config(MlpConfig::new(DIM_OBS, units.clone(), DIM_ACT, false));
    let critic_config =
        CriticConfig::default().value_config(MlpConfig::new(DIM_OBS, units, 1, false));
    let config = PpoConfig::default()
        .actor_config(actor_config)
        .critic_config(critic_config)
        .learning_rate(LR)
        .horizon(horizon)
        .batch_size(BATCH_SIZE)
        .n_epochs(N_EPOCHS)
        .chkpt_dir(model_dir);
    Ppo::build(config)
}

/// Train/eval PPO agent in pendulum environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Evaluate a trained agent, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,

    /// Number of episodes
    #[arg(short, long, default_value_t = N_EPISODES)]
    n_episodes: usize,

    /// Directory of checkpoints
    #[arg(short, long, default_value = "./ppo-candle-agent/examples/model/ppo_pendulum")]
    model_dir: String,
}

/// Trains the agent and returns the score of each episode.
fn train(n_episodes: usize, units: Vec<i64>, horizon: usize, model_dir: &str) -> Result<Vec<f32>> {
    let mut env = Pendulum::new(MAX_STEPS, 0);
    let mut agent = create_agent(units, horizon, model_dir)?;
    let mut scores = Vec::with_capacity(n_episodes);
    let mut best_score = f32::NEG_INFINITY;
    let mut n_steps = 0;
    let mut n_learns = 0;

    for i in 0..n_episodes {
        let mut obs = env.reset();
        let mut score = 0f32;
        let mut done = false;

        while !done {
            let sample = agent.choose_action(&obs)?;
            let (next_obs, reward, done_) = env.step(&sample.action);
            done = done_;
            score += reward;
            n_steps += 1;
            agent.remember(Transition::new(
                obs,
                sample.action,
                sample.raw_action,
                sample.log_prob,
                sample.value,
                reward,
                done,
            ))?;
            if agent.is_ready() {
                let record = agent.learn()?;
                n_learns += 1;
                info!(
                    "learn {}: loss_actor = {:.4}, loss_critic = {:.4}, entropy = {:.4}",
                    n_learns,
                    record.get_scalar("loss_actor")?,
                    record.get_scalar("loss_critic")?,
                    record.get_scalar("entropy")?
                );
            }
            obs = next_obs;
        }

        scores.push(score);
        let n = scores.len().min(100);
        let avg_score = scores[scores.len() - n..].iter().sum::<f32>() / n as f32;
        if avg_score > best_score {
            best_score = avg_score;
            agent.save_models()?;
        }
        info!(
            "episode {}: score = {:.1}, avg score = {:.1}, time steps = {}, learning steps = {}",
            i, score, avg_score, n_steps, n_learns
        );
    }

    Ok(scores)
}

fn eval(n_episodes: usize, units: Vec<i64>, model_dir: &str) -> Result<Vec<f32>> {
    let mut env = Pendulum::new(MAX_STEPS, 1);
    let mut agent = create_agent(units, HORIZON, model_dir)?;
    agent.load_models()?;
    agent.eval();

    let mut scores = Vec::with_capacity(n_episodes);
    for i in 0..n_episodes {
        let mut obs = env.reset();
        let mut score = 0f32;
        let mut done = false;
        while !done {
            let sample = agent.choose_action(&obs)?;
            let (next_obs, reward, done_) = env.step(&sample.action);
            score += reward;
            done = done_;
            obs = next_obs;
        }
        info!("eval episode {}: score = {:.1}", i, score);
        scores.push(score);
    }

    Ok(scores)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.eval {
        eval(args.n_episodes, UNITS.to_vec(), &args.model_dir)?;
    } else {
        train(args.n_episodes, UNITS.to_vec(), HORIZON, &args.model_dir)?;
    }

    Ok(())
}
