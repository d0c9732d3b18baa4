//! Rotating live signal buffer
//!
//! Single producer appends at the head, single consumer reads a trailing
//! window. Reads always copy out, because the producer may overwrite the
//! read region before the consumer's feature transform runs; margin
//! violations are prevented by capacity sizing, not by extra locking.

use bci_core::{BciError, BciResult, TaskLabel};
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Copy of the most recent samples with the concurrently recorded label.
#[derive(Debug, Clone)]
pub struct LiveSnapshot {
    /// Sample matrix, shape (channels, time); owned, not aliasing the buffer
    pub data: Array2<f32>,
    /// Ground-truth label recorded with the newest sample, if requested
    pub label: Option<TaskLabel>,
}

struct BufferState {
    channels: Vec<VecDeque<f32>>,
    current_label: Option<TaskLabel>,
    total_written: u64,
}

/// Rotating per-channel sample store shared between one producer task and
/// one consumer loop.
pub struct LiveBuffer {
    state: Mutex<BufferState>,
    live: AtomicBool,
    sampling_rate: f32,
    channel_count: usize,
    capacity: usize,
}

impl LiveBuffer {
    /// Create a buffer holding `history_seconds` of signal per channel.
    ///
    /// Capacity must exceed the longest window the consumer will request,
    /// with margin for one producer chunk, or the producer can lap the
    /// consumer.
    pub fn new(channel_count: usize, sampling_rate: f32, history_seconds: f32) -> BciResult<Self> {
        if sampling_rate <= 0.0 {
            return Err(BciError::InvalidParameter {
                name: "sampling_rate",
                reason: format!("must be positive, got {}", sampling_rate),
            });
        }
        if channel_count == 0 {
            return Err(BciError::InvalidParameter {
                name: "channel_count",
                reason: "must be at least 1".to_string(),
            });
        }
        let capacity = (sampling_rate * history_seconds).ceil() as usize;
        if capacity == 0 {
            return Err(BciError::InvalidParameter {
                name: "history_seconds",
                reason: format!("{}s holds no samples at {}Hz", history_seconds, sampling_rate),
            });
        }

        Ok(LiveBuffer {
            state: Mutex::new(BufferState {
                channels: (0..channel_count)
                    .map(|_| VecDeque::with_capacity(capacity))
                    .collect(),
                current_label: None,
                total_written: 0,
            }),
            live: AtomicBool::new(true),
            sampling_rate,
            channel_count,
            capacity,
        })
    }

    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a chunk at the head, dropping the oldest samples beyond
    /// capacity. Producer side.
    pub fn push_chunk(&self, chunk: ArrayView2<'_, f32>, label: Option<TaskLabel>) -> BciResult<()> {
        if chunk.nrows() != self.channel_count {
            return Err(BciError::ChannelMismatch {
                expected: self.channel_count,
                actual: chunk.nrows(),
            });
        }

        let mut state = self.state.lock().expect("live buffer poisoned");
        for (queue, row) in state.channels.iter_mut().zip(chunk.rows()) {
            for &sample in row {
                if queue.len() == self.capacity {
                    queue.pop_front();
                }
                queue.push_back(sample);
            }
        }
        state.total_written += chunk.ncols() as u64;
        if label.is_some() {
            state.current_label = label;
        }
        Ok(())
    }

    /// Copy out the trailing `seconds` of signal. Consumer side.
    ///
    /// Returns fewer samples than requested while the buffer is filling;
    /// the caller decides whether that is an underrun.
    pub fn snapshot(&self, seconds: f32) -> LiveSnapshot {
        let requested = (self.sampling_rate * seconds).round() as usize;
        let state = self.state.lock().expect("live buffer poisoned");

        let available = state.channels.first().map(|q| q.len()).unwrap_or(0);
        let take = requested.min(available);
        let mut data = Array2::zeros((self.channel_count, take));
        for (ch, queue) in state.channels.iter().enumerate() {
            for (i, &sample) in queue.iter().skip(queue.len() - take).enumerate() {
                data[[ch, i]] = sample;
            }
        }

        LiveSnapshot {
            data,
            label: state.current_label,
        }
    }

    /// Total samples written per channel since creation
    pub fn total_written(&self) -> u64 {
        self.state.lock().expect("live buffer poisoned").total_written
    }

    /// Producer signals end of data.
    pub fn mark_finished(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Whether the producer is still writing
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn chunk(channels: usize, samples: usize, offset: f32) -> Array2<f32> {
        Array2::from_shape_fn((channels, samples), |(c, t)| {
            offset + (c * samples + t) as f32
        })
    }

    #[test]
    fn test_snapshot_returns_trailing_samples() {
        let buffer = LiveBuffer::new(2, 100.0, 2.0).unwrap();
        buffer.push_chunk(chunk(2, 150, 0.0).view(), None).unwrap();

        let snapshot = buffer.snapshot(1.0);
        assert_eq!(snapshot.data.dim(), (2, 100));
        // Channel 0 of the chunk is 0..150; trailing 100 start at 50.
        assert_eq!(snapshot.data[[0, 0]], 50.0);
        assert_eq!(snapshot.data[[0, 99]], 149.0);
    }

    #[test]
    fn test_snapshot_short_while_filling() {
        let buffer = LiveBuffer::new(1, 100.0, 2.0).unwrap();
        buffer.push_chunk(chunk(1, 30, 0.0).view(), None).unwrap();

        let snapshot = buffer.snapshot(1.0);
        assert_eq!(snapshot.data.ncols(), 30);
    }

    #[test]
    fn test_rotation_drops_oldest() {
        let buffer = LiveBuffer::new(1, 10.0, 1.0).unwrap();
        assert_eq!(buffer.capacity(), 10);

        buffer.push_chunk(chunk(1, 10, 0.0).view(), None).unwrap();
        buffer.push_chunk(chunk(1, 5, 100.0).view(), None).unwrap();

        let snapshot = buffer.snapshot(1.0);
        assert_eq!(snapshot.data.ncols(), 10);
        // Oldest five samples rotated out.
        assert_eq!(snapshot.data[[0, 0]], 5.0);
        assert_eq!(snapshot.data[[0, 9]], 104.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let buffer = LiveBuffer::new(1, 10.0, 1.0).unwrap();
        buffer.push_chunk(chunk(1, 10, 0.0).view(), None).unwrap();

        let snapshot = buffer.snapshot(1.0);
        let before = snapshot.data.clone();

        // Producer overwrites the whole buffer; the snapshot must not move.
        buffer.push_chunk(chunk(1, 10, 500.0).view(), None).unwrap();
        assert_eq!(snapshot.data, before);
    }

    #[test]
    fn test_label_travels_with_samples() {
        let buffer = LiveBuffer::new(1, 10.0, 1.0).unwrap();
        buffer
            .push_chunk(chunk(1, 5, 0.0).view(), Some(TaskLabel::LeftHand))
            .unwrap();
        assert_eq!(buffer.snapshot(0.5).label, Some(TaskLabel::LeftHand));

        // Unlabeled chunks keep the last seen label.
        buffer.push_chunk(chunk(1, 5, 0.0).view(), None).unwrap();
        assert_eq!(buffer.snapshot(0.5).label, Some(TaskLabel::LeftHand));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let buffer = LiveBuffer::new(2, 10.0, 1.0).unwrap();
        assert!(matches!(
            buffer.push_chunk(chunk(3, 5, 0.0).view(), None),
            Err(BciError::ChannelMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_liveness_flag() {
        let buffer = LiveBuffer::new(1, 10.0, 1.0).unwrap();
        assert!(buffer.is_live());
        buffer.mark_finished();
        assert!(!buffer.is_live());
    }
}
