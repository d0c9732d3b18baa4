//! Acquisition source boundary
//!
//! The streaming loop treats signal acquisition purely as an external
//! capability: the last N seconds of signal (optionally with the
//! concurrently recorded ground-truth label) and a liveness signal.

use crate::buffer::{LiveBuffer, LiveSnapshot};

/// Capability contract of a live signal source
pub trait AcquisitionSource: Send + Sync {
    /// Sampling rate of the produced signal in Hz
    fn sampling_rate(&self) -> f32;

    /// Number of signal channels
    fn channel_count(&self) -> usize;

    /// Copy of the most recent `seconds` of signal. May return fewer
    /// samples than requested while the source is warming up. The label is
    /// included only when `with_label` is set.
    fn last_window(&self, seconds: f32, with_label: bool) -> LiveSnapshot;

    /// Whether the upstream producer is still generating data
    fn is_live(&self) -> bool;
}

impl AcquisitionSource for LiveBuffer {
    fn sampling_rate(&self) -> f32 {
        LiveBuffer::sampling_rate(self)
    }

    fn channel_count(&self) -> usize {
        LiveBuffer::channel_count(self)
    }

    fn last_window(&self, seconds: f32, with_label: bool) -> LiveSnapshot {
        let mut snapshot = self.snapshot(seconds);
        if !with_label {
            snapshot.label = None;
        }
        snapshot
    }

    fn is_live(&self) -> bool {
        LiveBuffer::is_live(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_buffer_as_acquisition_source() {
        let buffer = LiveBuffer::new(2, 100.0, 2.0).unwrap();
        let chunk = Array2::from_elem((2, 120), 1.0);
        buffer
            .push_chunk(chunk.view(), Some(bci_core::TaskLabel::Rest))
            .unwrap();

        let source: &dyn AcquisitionSource = &buffer;
        assert_eq!(source.sampling_rate(), 100.0);
        assert_eq!(source.channel_count(), 2);
        assert!(source.is_live());

        let with_label = source.last_window(1.0, true);
        assert_eq!(with_label.data.dim(), (2, 100));
        assert_eq!(with_label.label, Some(bci_core::TaskLabel::Rest));

        let without_label = source.last_window(1.0, false);
        assert_eq!(without_label.label, None);
    }
}
