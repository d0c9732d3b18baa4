//! Sliding-window segmentation of epochs and live buffers
//!
//! Offline windows are non-owning views aliasing the epoch's backing array;
//! window counts can be large relative to epoch counts, so no sample data is
//! copied per window. The live-buffer path copies instead, because the
//! producer may overwrite the backing buffer before the consumer is done.

use bci_core::{BciError, BciResult, Epoch, TaskLabel};
use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Window geometry in seconds, converted to samples against a sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window length in seconds
    pub window_length: f32,
    /// Window step in seconds; 0.0 selects the degenerate whole-epoch mode
    pub window_step: f32,
}

/// Stride-based window extraction shared by the offline and online paths.
#[derive(Debug, Clone, Copy)]
pub struct WindowSegmenter {
    window_length: f32,
    window_step: f32,
}

/// Windows from a collection of equally shaped epochs, with labels and
/// source-epoch group ids replicated per window.
#[derive(Debug)]
pub struct WindowedEpochs<'a> {
    /// All windows, epoch-major; each aliases its source epoch's samples
    pub windows: Vec<ArrayView2<'a, f32>>,
    /// Task label of the source epoch, one per window
    pub labels: Vec<TaskLabel>,
    /// Source epoch index, one per window
    pub groups: Vec<usize>,
    /// Windows extracted from each epoch
    pub windows_per_epoch: usize,
}

impl WindowSegmenter {
    /// Create a segmenter, rejecting invalid geometry before any computation.
    pub fn new(window_length: f32, window_step: f32) -> BciResult<Self> {
        if window_length <= 0.0 {
            return Err(BciError::InvalidParameter {
                name: "window_length",
                reason: format!("must be positive, got {}", window_length),
            });
        }
        if window_step < 0.0 {
            return Err(BciError::InvalidParameter {
                name: "window_step",
                reason: format!("must be non negative, got {}", window_step),
            });
        }
        Ok(WindowSegmenter {
            window_length,
            window_step,
        })
    }

    pub fn from_config(config: WindowConfig) -> BciResult<Self> {
        Self::new(config.window_length, config.window_step)
    }

    pub fn config(&self) -> WindowConfig {
        WindowConfig {
            window_length: self.window_length,
            window_step: self.window_step,
        }
    }

    /// Window length in samples for the given sampling rate
    pub fn window_samples(&self, sampling_rate: f32) -> usize {
        (self.window_length * sampling_rate).round() as usize
    }

    /// Window step in samples for the given sampling rate
    pub fn step_samples(&self, sampling_rate: f32) -> usize {
        (self.window_step * sampling_rate).round() as usize
    }

    /// Number of windows produced from `total_samples` samples.
    pub fn window_count(&self, total_samples: usize, sampling_rate: f32) -> BciResult<usize> {
        let length = self.window_samples(sampling_rate);
        let step = self.step_samples(sampling_rate);
        if length == 0 {
            return Err(BciError::InvalidParameter {
                name: "window_length",
                reason: format!(
                    "{}s rounds to zero samples at {}Hz",
                    self.window_length, sampling_rate
                ),
            });
        }

        if step == 0 {
            // Whole-epoch mode: a single window of the first `length` samples.
            if total_samples < length {
                return Err(BciError::InsufficientData {
                    requested: length,
                    available: total_samples,
                });
            }
            return Ok(1);
        }

        let overlap = length as i64 - step as i64;
        let n = (total_samples as i64 - overlap) / step as i64;
        if n <= 0 {
            return Err(BciError::InsufficientData {
                requested: length,
                available: total_samples,
            });
        }
        Ok(n as usize)
    }

    /// Segment a (channels, time) matrix into windows aliasing `data`.
    ///
    /// Window `i` starts at sample `i * step` and spans `length` samples;
    /// no sample data is copied.
    pub fn segment<'a>(
        &self,
        data: ArrayView2<'a, f32>,
        sampling_rate: f32,
    ) -> BciResult<Vec<ArrayView2<'a, f32>>> {
        let total = data.ncols();
        let n = self.window_count(total, sampling_rate)?;
        let length = self.window_samples(sampling_rate);
        let step = self.step_samples(sampling_rate);

        let windows = (0..n)
            .map(|i| {
                let start = i * step;
                data.clone().slice_move(s![.., start..start + length])
            })
            .collect();
        Ok(windows)
    }

    /// Segment a collection of epochs.
    ///
    /// All epochs must share channel count, sample count and sampling rate;
    /// mixing epoch durations in one call is a caller error. Labels and
    /// source-epoch group ids are replicated once per window.
    pub fn segment_epochs<'a>(&self, epochs: &[&'a Epoch]) -> BciResult<WindowedEpochs<'a>> {
        let first = *epochs.first().ok_or_else(|| BciError::EmptyDataset {
            reason: "no epochs to segment".to_string(),
        })?;

        for epoch in epochs {
            if epoch.channel_count() != first.channel_count() {
                return Err(BciError::ChannelMismatch {
                    expected: first.channel_count(),
                    actual: epoch.channel_count(),
                });
            }
            if epoch.sample_count() != first.sample_count()
                || epoch.sampling_rate() != first.sampling_rate()
            {
                return Err(BciError::InvalidParameter {
                    name: "epochs",
                    reason: format!(
                        "epoch durations differ ({} vs {} samples); \
                         segment equal-duration epochs in one call",
                        first.sample_count(),
                        epoch.sample_count()
                    ),
                });
            }
        }

        let fs = first.sampling_rate();
        let windows_per_epoch = self.window_count(first.sample_count(), fs)?;

        let mut windows = Vec::with_capacity(epochs.len() * windows_per_epoch);
        let mut labels = Vec::with_capacity(epochs.len() * windows_per_epoch);
        let mut groups = Vec::with_capacity(epochs.len() * windows_per_epoch);

        for (epoch_idx, epoch) in epochs.iter().enumerate() {
            let views = self.segment(epoch.data(), fs)?;
            for view in views {
                windows.push(view);
                labels.push(epoch.label);
                groups.push(epoch_idx);
            }
        }

        Ok(WindowedEpochs {
            windows,
            labels,
            groups,
            windows_per_epoch,
        })
    }

    /// Copy the most recent window out of a live buffer view.
    ///
    /// The backing buffer is producer-controlled and may be overwritten
    /// before the caller's feature transform runs, so this hands back an
    /// owned copy of the trailing `window_length` seconds.
    pub fn copy_latest(
        &self,
        data: ArrayView2<'_, f32>,
        sampling_rate: f32,
    ) -> BciResult<Array2<f32>> {
        let length = self.window_samples(sampling_rate);
        let total = data.ncols();
        if total < length {
            return Err(BciError::InsufficientData {
                requested: length,
                available: total,
            });
        }
        Ok(data.slice(s![.., total - length..]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bci_core::TaskLabel;
    use ndarray::Array2;

    fn ramp(channels: usize, samples: usize) -> Array2<f32> {
        Array2::from_shape_fn((channels, samples), |(c, t)| (c * samples + t) as f32)
    }

    #[test]
    fn test_window_count_and_starts() {
        // channels=3, T=1000, fs=100Hz, length=2s (L=200), step=0.5s (S=50)
        let data = ramp(3, 1000);
        let segmenter = WindowSegmenter::new(2.0, 0.5).unwrap();
        let windows = segmenter.segment(data.view(), 100.0).unwrap();

        assert_eq!(windows.len(), 17);
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.shape(), &[3, 200]);
            // Window i starts exactly at sample i*S.
            assert_eq!(window[[0, 0]], (i * 50) as f32);
        }
        assert_eq!(windows[16][[0, 0]], 800.0);
        assert_eq!(windows[16][[0, 199]], 999.0);
    }

    #[test]
    fn test_window_content_matches_raw_slice() {
        let data = ramp(2, 300);
        let segmenter = WindowSegmenter::new(1.0, 0.5).unwrap();
        let windows = segmenter.segment(data.view(), 100.0).unwrap();

        let expected = data.slice(s![.., 50..150]);
        assert_eq!(windows[1], expected);
    }

    #[test]
    fn test_zero_step_single_window() {
        let data = ramp(2, 500);
        let segmenter = WindowSegmenter::new(2.0, 0.0).unwrap();
        let windows = segmenter.segment(data.view(), 100.0).unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].shape(), &[2, 200]);
        assert_eq!(windows[0], data.slice(s![.., ..200]));
    }

    #[test]
    fn test_negative_step_rejected() {
        assert!(matches!(
            WindowSegmenter::new(1.0, -0.5),
            Err(BciError::InvalidParameter { name: "window_step", .. })
        ));
    }

    #[test]
    fn test_non_positive_length_rejected() {
        assert!(matches!(
            WindowSegmenter::new(0.0, 0.5),
            Err(BciError::InvalidParameter { name: "window_length", .. })
        ));
    }

    #[test]
    fn test_window_longer_than_data() {
        let data = ramp(2, 100);
        let segmenter = WindowSegmenter::new(2.0, 0.5).unwrap();
        assert!(matches!(
            segmenter.segment(data.view(), 100.0),
            Err(BciError::InsufficientData { requested: 200, available: 100 })
        ));
    }

    #[test]
    fn test_step_larger_than_length() {
        // Gapped windows: L=100, S=150, T=1000 -> (1000 - (-50)) / 150 = 7
        let data = ramp(1, 1000);
        let segmenter = WindowSegmenter::new(1.0, 1.5).unwrap();
        let windows = segmenter.segment(data.view(), 100.0).unwrap();
        assert_eq!(windows.len(), 7);
        assert_eq!(windows[1][[0, 0]], 150.0);
    }

    #[test]
    fn test_segment_epochs_lockstep() {
        let fs = 100.0;
        let epochs: Vec<Epoch> = (0..4)
            .map(|i| {
                let label = if i % 2 == 0 {
                    TaskLabel::Rest
                } else {
                    TaskLabel::LeftHand
                };
                Epoch::new(1, 0, label, ramp(2, 300), fs).unwrap()
            })
            .collect();

        // L=100, S=100 -> 3 windows per epoch
        let segmenter = WindowSegmenter::new(1.0, 1.0).unwrap();
        let refs: Vec<&Epoch> = epochs.iter().collect();
        let windowed = segmenter.segment_epochs(&refs).unwrap();

        assert_eq!(windowed.windows_per_epoch, 3);
        assert_eq!(windowed.windows.len(), 12);
        assert_eq!(windowed.labels.len(), 12);
        assert_eq!(
            windowed.groups,
            vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3]
        );
        assert_eq!(windowed.labels[0], TaskLabel::Rest);
        assert_eq!(windowed.labels[3], TaskLabel::LeftHand);
    }

    #[test]
    fn test_segment_epochs_rejects_ragged_durations() {
        let fs = 100.0;
        let epochs = vec![
            Epoch::new(1, 0, TaskLabel::Rest, ramp(2, 300), fs).unwrap(),
            Epoch::new(1, 0, TaskLabel::Rest, ramp(2, 400), fs).unwrap(),
        ];
        let segmenter = WindowSegmenter::new(1.0, 1.0).unwrap();
        let refs: Vec<&Epoch> = epochs.iter().collect();
        assert!(matches!(
            segmenter.segment_epochs(&refs),
            Err(BciError::InvalidParameter { name: "epochs", .. })
        ));
    }

    #[test]
    fn test_copy_latest_trailing_window() {
        let data = ramp(2, 400);
        let segmenter = WindowSegmenter::new(1.0, 0.0).unwrap();
        let window = segmenter.copy_latest(data.view(), 100.0).unwrap();

        assert_eq!(window.shape(), &[2, 100]);
        assert_eq!(window[[0, 0]], 300.0);
        assert_eq!(window[[0, 99]], 399.0);
    }

    #[test]
    fn test_copy_latest_underrun() {
        let data = ramp(2, 50);
        let segmenter = WindowSegmenter::new(1.0, 0.0).unwrap();
        assert!(matches!(
            segmenter.copy_latest(data.view(), 100.0),
            Err(BciError::InsufficientData { requested: 100, available: 50 })
        ));
    }
}
