//! BCI-Core: Foundation types for mental-task signal analysis
//!
//! Recordings, epochs, task labels and the shared error type used by the
//! offline training and online streaming crates.

pub mod error;
pub mod labels;
pub mod recording;

pub use error::{BciError, BciResult};
pub use labels::{ControlCommand, TaskLabel};
pub use recording::{ChannelStats, Epoch, Recording};
