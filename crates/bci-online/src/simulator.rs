//! Synthetic multichannel signal source for tests and demos
//!
//! Generates label-dependent oscillations with gaussian noise and feeds a
//! live buffer from a background task at real-time cadence, standing in for
//! a hardware acquisition stream.

use crate::buffer::LiveBuffer;
use bci_core::{BciError, BciResult, TaskLabel};
use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::debug;

/// Configuration for the signal simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f32,
    /// Number of channels to simulate
    pub channel_count: usize,
    /// Gaussian noise standard deviation
    pub noise_std: f32,
    /// Task schedule: label and how long it is held, in seconds
    pub schedule: Vec<(TaskLabel, f32)>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 160.0,
            channel_count: 3,
            noise_std: 0.05,
            schedule: vec![(TaskLabel::Rest, 2.0), (TaskLabel::LeftHand, 2.0)],
            seed: 12,
        }
    }
}

/// Label-dependent oscillation frequency, mimicking task-specific rhythms.
fn task_frequency(label: TaskLabel) -> f32 {
    match label {
        TaskLabel::Rest => 10.0,
        TaskLabel::Calm => 8.0,
        TaskLabel::LeftHand => 20.0,
        TaskLabel::RightHand => 24.0,
        TaskLabel::BothLegs => 28.0,
        TaskLabel::BothHands => 32.0,
        TaskLabel::Active => 18.0,
    }
}

/// Deterministic synthetic signal generator
pub struct SignalSimulator {
    config: SimulatorConfig,
    noise: Normal<f32>,
    rng: StdRng,
    sample_index: u64,
}

impl SignalSimulator {
    pub fn new(config: SimulatorConfig) -> BciResult<Self> {
        if config.schedule.is_empty() {
            return Err(BciError::InvalidParameter {
                name: "schedule",
                reason: "at least one task entry is required".to_string(),
            });
        }
        let noise = Normal::new(0.0, config.noise_std.max(f32::EPSILON)).map_err(|e| {
            BciError::InvalidParameter {
                name: "noise_std",
                reason: e.to_string(),
            }
        })?;

        Ok(SignalSimulator {
            rng: StdRng::seed_from_u64(config.seed),
            noise,
            config,
            sample_index: 0,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Task label active at the given time, cycling through the schedule.
    pub fn label_at(&self, time: f32) -> TaskLabel {
        let cycle: f32 = self.config.schedule.iter().map(|(_, d)| d).sum();
        let mut t = time % cycle;
        for &(label, duration) in &self.config.schedule {
            if t < duration {
                return label;
            }
            t -= duration;
        }
        self.config.schedule[0].0
    }

    /// Generate the next chunk of signal and the label active at its end.
    pub fn generate_chunk(&mut self, duration: f32) -> (Array2<f32>, TaskLabel) {
        let fs = self.config.sampling_rate;
        let samples = (duration * fs).round() as usize;
        let mut chunk = Array2::zeros((self.config.channel_count, samples));

        for s in 0..samples {
            let t = (self.sample_index + s as u64) as f32 / fs;
            let freq = task_frequency(self.label_at(t));
            for ch in 0..self.config.channel_count {
                let phase = ch as f32 * 0.7;
                chunk[[ch, s]] = (2.0 * std::f32::consts::PI * freq * t + phase).sin()
                    + self.noise.sample(&mut self.rng);
            }
        }

        self.sample_index += samples as u64;
        let label = self.label_at((self.sample_index.saturating_sub(1)) as f32 / fs);
        (chunk, label)
    }
}

/// Drive a live buffer from a simulator at real-time cadence.
///
/// Pushes one chunk per tick until `total_duration` of signal has been
/// produced, then marks the buffer finished. Returns the producer task
/// handle.
pub fn spawn_producer(
    buffer: Arc<LiveBuffer>,
    mut simulator: SignalSimulator,
    chunk_duration: f32,
    total_duration: Option<f32>,
) -> JoinHandle<BciResult<()>> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs_f32(chunk_duration));
        let mut produced = 0.0f32;

        loop {
            ticker.tick().await;
            let (chunk, label) = simulator.generate_chunk(chunk_duration);
            buffer.push_chunk(chunk.view(), Some(label))?;
            produced += chunk_duration;
            debug!(produced, ?label, "simulator chunk pushed");

            if let Some(total) = total_duration {
                if produced >= total {
                    buffer.mark_finished();
                    return Ok(());
                }
            }
            if !buffer.is_live() {
                return Ok(());
            }
        }
    })
}
