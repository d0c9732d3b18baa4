//! Real-time streaming inference loop
//!
//! Reuses the offline window segmenter and feature pipeline in
//! transform-only mode against a live acquisition source. Each iteration
//! acquires the most recent window, infers a label with the persisted model
//! and emits a prediction event, pacing itself to the sample cadence of the
//! source. Cancellation is cooperative: liveness and the stop signal are
//! checked once per iteration, and in-flight inference always completes.

use crate::acquisition::AcquisitionSource;
use bci_analysis::{
    Classifier, FeaturePipeline, TrainedModel, TrainedModelMap, WindowSegmenter,
};
use bci_core::{BciError, BciResult, TaskLabel};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

/// Loop state, advanced once per iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamerState {
    Idle,
    Acquiring,
    WindowReady,
    Underrun,
    Inferring,
    Emitted,
}

/// One emitted online prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEvent {
    /// Timestamp-ordered index of the emitting iteration
    pub window_index: u64,
    pub predicted: TaskLabel,
    /// Ground-truth label recorded with the window, when collected
    pub truth: Option<TaskLabel>,
}

/// Streaming loop configuration
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Subject whose persisted model drives the predictions
    pub subject: u32,
    /// Record the concurrently supplied ground-truth label per event
    pub collect_ground_truth: bool,
}

/// Summary of one streaming run
#[derive(Debug)]
pub struct OnlineRunSummary {
    pub iterations: u64,
    pub underruns: u64,
    pub events: Vec<PredictionEvent>,
}

/// Sleep budget left in an iteration: `max(0, period - elapsed)`.
pub fn sleep_budget(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Producer/consumer real-time inference loop
pub struct OnlineStreamer {
    config: StreamerConfig,
    segmenter: WindowSegmenter,
    pipeline: FeaturePipeline,
    model: TrainedModel,
    state: StreamerState,
    events_tx: Option<mpsc::Sender<PredictionEvent>>,
}

impl OnlineStreamer {
    /// Build a streamer for one subject from a persisted model map.
    ///
    /// The window geometry and feature configuration come from the map, so
    /// online windowing is identical to what the model was trained on. A
    /// subject without a persisted model fails here with `ModelNotFound` —
    /// fatal for this subject's stream only.
    pub fn new(
        config: StreamerConfig,
        model_map: &TrainedModelMap,
        sampling_rate: f32,
    ) -> BciResult<Self> {
        let subject_model = model_map.get(config.subject)?;

        let mut pipeline = FeaturePipeline::new(&model_map.feature, Some(sampling_rate))?;
        if let Some(norm) = &subject_model.norm {
            pipeline.restore_stats(norm.clone());
        }

        // Single-window mode: step 0 yields exactly one trailing window.
        let segmenter = WindowSegmenter::new(model_map.window.window_length, 0.0)?;

        Ok(OnlineStreamer {
            config,
            segmenter,
            pipeline,
            model: subject_model.model.clone(),
            state: StreamerState::Idle,
            events_tx: None,
        })
    }

    /// Forward every emitted event into the given channel as well.
    pub fn with_event_sink(mut self, events_tx: mpsc::Sender<PredictionEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn state(&self) -> StreamerState {
        self.state
    }

    /// Run the loop until the source stops producing or the stop signal
    /// fires. The target iteration period is one sample tick, `1 / fs`.
    pub async fn run<S: AcquisitionSource>(
        &mut self,
        source: &S,
        stop: watch::Receiver<bool>,
    ) -> BciResult<OnlineRunSummary> {
        let sampling_rate = source.sampling_rate();
        let period = Duration::from_secs_f32(1.0 / sampling_rate);
        let window_seconds = self.segmenter.config().window_length;

        let mut summary = OnlineRunSummary {
            iterations: 0,
            underruns: 0,
            events: Vec::new(),
        };
        let mut window_index = 0u64;

        while source.is_live() && !*stop.borrow() {
            let started = Instant::now();
            summary.iterations += 1;

            self.state = StreamerState::Acquiring;
            let snapshot = source.last_window(window_seconds, self.config.collect_ground_truth);

            match self
                .segmenter
                .copy_latest(snapshot.data.view(), sampling_rate)
            {
                Err(BciError::InsufficientData { requested, available }) => {
                    // Expected while the buffer fills; retry without emitting.
                    self.state = StreamerState::Underrun;
                    summary.underruns += 1;
                    debug!(requested, available, "buffer underrun, retrying");
                }
                Err(e) => return Err(e),
                Ok(window) => {
                    self.state = StreamerState::WindowReady;
                    self.state = StreamerState::Inferring;
                    match self.infer(&window) {
                        Ok(predicted) => {
                            let event = PredictionEvent {
                                window_index,
                                predicted,
                                truth: snapshot.label,
                            };
                            window_index += 1;
                            if let Some(tx) = &self.events_tx {
                                // Slow or dropped consumers never stall the loop.
                                let _ = tx.try_send(event.clone());
                            }
                            summary.events.push(event);
                            self.state = StreamerState::Emitted;
                        }
                        Err(e) => {
                            // Transient per-iteration failure: log and keep
                            // looping.
                            warn!(error = %e, "inference failed for this window");
                        }
                    }
                }
            }

            sleep(sleep_budget(period, started.elapsed())).await;
        }

        self.state = StreamerState::Idle;
        Ok(summary)
    }

    fn infer(&self, window: &ndarray::Array2<f32>) -> BciResult<TaskLabel> {
        let features = self.pipeline.transform(&[window.view()])?;
        let predictions = self.model.predict(features.view())?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| BciError::EmptyDataset {
                reason: "classifier returned no prediction".to_string(),
            })
    }
}

/// Accuracy over events that carry ground truth; `None` without any.
pub fn online_accuracy(events: &[PredictionEvent]) -> Option<f32> {
    let scored: Vec<&PredictionEvent> = events.iter().filter(|e| e.truth.is_some()).collect();
    if scored.is_empty() {
        return None;
    }
    let hits = scored
        .iter()
        .filter(|e| e.truth == Some(e.predicted))
        .count();
    Some(hits as f32 / scored.len() as f32)
}
