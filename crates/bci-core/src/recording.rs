//! Recording and Epoch: containers for multichannel signal data

use crate::error::{BciError, BciResult};
use crate::labels::TaskLabel;
use ndarray::{Array2, ArrayView2, Axis};
use uuid::Uuid;

/// A continuous multichannel recording, channels x time.
///
/// Immutable once constructed; the optional label stream carries one task
/// label per sample (e.g. replayed trigger annotations).
#[derive(Debug, Clone)]
pub struct Recording {
    /// Unique identifier for this recording
    pub id: Uuid,
    /// Sample matrix, shape (channels, time)
    data: Array2<f32>,
    /// Sampling rate in Hz
    sampling_rate: f32,
    /// Optional per-sample label stream, same length as the time axis
    labels: Option<Vec<TaskLabel>>,
}

impl Recording {
    /// Create a new recording, validating rate and label stream length.
    pub fn new(
        data: Array2<f32>,
        sampling_rate: f32,
        labels: Option<Vec<TaskLabel>>,
    ) -> BciResult<Self> {
        if sampling_rate <= 0.0 {
            return Err(BciError::InvalidParameter {
                name: "sampling_rate",
                reason: format!("must be positive, got {}", sampling_rate),
            });
        }
        if let Some(ref stream) = labels {
            if stream.len() != data.ncols() {
                return Err(BciError::InvalidParameter {
                    name: "labels",
                    reason: format!(
                        "label stream length {} does not match {} samples",
                        stream.len(),
                        data.ncols()
                    ),
                });
            }
        }

        Ok(Recording {
            id: Uuid::new_v4(),
            data,
            sampling_rate,
            labels,
        })
    }

    /// Sample matrix view, shape (channels, time)
    pub fn data(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples per channel
    pub fn sample_count(&self) -> usize {
        self.data.ncols()
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f32 {
        self.sample_count() as f32 / self.sampling_rate
    }

    /// Per-sample label stream, if one was recorded
    pub fn labels(&self) -> Option<&[TaskLabel]> {
        self.labels.as_deref()
    }

    /// Basic statistics for one channel
    pub fn channel_stats(&self, channel: usize) -> BciResult<ChannelStats> {
        if channel >= self.channel_count() {
            return Err(BciError::ChannelMismatch {
                expected: self.channel_count(),
                actual: channel,
            });
        }
        let row = self.data.index_axis(Axis(0), channel).to_vec();
        Ok(ChannelStats::calculate(&row))
    }
}

/// A labeled, task-onset aligned excerpt of a recording.
///
/// Created by external segmentation and consumed read-only here.
#[derive(Debug, Clone)]
pub struct Epoch {
    /// Subject the epoch was recorded from
    pub subject: u32,
    /// Recording session within the subject
    pub session: u32,
    /// Task performed during the epoch
    pub label: TaskLabel,
    /// Sample matrix, shape (channels, time)
    data: Array2<f32>,
    /// Sampling rate in Hz
    sampling_rate: f32,
}

impl Epoch {
    /// Create a new epoch with shape/rate validation.
    pub fn new(
        subject: u32,
        session: u32,
        label: TaskLabel,
        data: Array2<f32>,
        sampling_rate: f32,
    ) -> BciResult<Self> {
        if sampling_rate <= 0.0 {
            return Err(BciError::InvalidParameter {
                name: "sampling_rate",
                reason: format!("must be positive, got {}", sampling_rate),
            });
        }
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(BciError::EmptyDataset {
                reason: format!(
                    "epoch for subject {} has shape ({}, {})",
                    subject,
                    data.nrows(),
                    data.ncols()
                ),
            });
        }

        Ok(Epoch {
            subject,
            session,
            label,
            data,
            sampling_rate,
        })
    }

    /// Sample matrix view, shape (channels, time)
    pub fn data(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples per channel
    pub fn sample_count(&self) -> usize {
        self.data.ncols()
    }
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone)]
pub struct ChannelStats {
    pub mean: f32,
    pub rms: f32,
    pub std_dev: f32,
    pub min: f32,
    pub max: f32,
    pub peak_to_peak: f32,
}

impl ChannelStats {
    pub fn calculate(data: &[f32]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f32;
        let mean = data.iter().sum::<f32>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f32>() / n).sqrt();
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
        let std_dev = variance.sqrt();
        let min = data.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_recording_creation() {
        let data = Array2::zeros((3, 1000));
        let rec = Recording::new(data, 100.0, None).unwrap();

        assert_eq!(rec.channel_count(), 3);
        assert_eq!(rec.sample_count(), 1000);
        assert!((rec.duration() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_recording_rejects_bad_rate() {
        let data = Array2::zeros((2, 100));
        assert!(matches!(
            Recording::new(data, 0.0, None),
            Err(BciError::InvalidParameter { name: "sampling_rate", .. })
        ));
    }

    #[test]
    fn test_recording_label_stream_length() {
        let data = Array2::zeros((2, 100));
        let labels = vec![TaskLabel::Rest; 99];
        assert!(Recording::new(data, 100.0, Some(labels)).is_err());
    }

    #[test]
    fn test_epoch_creation() {
        let data = Array2::from_shape_fn((3, 400), |(c, t)| (c * 400 + t) as f32);
        let epoch = Epoch::new(1, 0, TaskLabel::LeftHand, data, 100.0).unwrap();

        assert_eq!(epoch.subject, 1);
        assert_eq!(epoch.channel_count(), 3);
        assert_eq!(epoch.sample_count(), 400);
        assert_eq!(epoch.label, TaskLabel::LeftHand);
    }

    #[test]
    fn test_channel_stats() {
        let stats = ChannelStats::calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 1e-6);
        assert!((stats.peak_to_peak - 4.0).abs() < 1e-6);
        assert!((stats.min - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_recording_channel_stats() {
        let mut data = Array2::zeros((2, 4));
        data.row_mut(1).assign(&ndarray::arr1(&[2.0, 2.0, 2.0, 2.0]));
        let rec = Recording::new(data, 100.0, None).unwrap();

        let stats = rec.channel_stats(1).unwrap();
        assert!((stats.mean - 2.0).abs() < 1e-6);
        assert!(rec.channel_stats(5).is_err());
    }
}
