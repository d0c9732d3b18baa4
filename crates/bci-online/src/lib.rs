//! BCI-Online: real-time streaming inference
//!
//! A single producer fills a rotating live buffer while the streaming loop
//! windows, transforms and classifies the most recent signal with models
//! persisted by the offline path.

pub mod acquisition;
pub mod buffer;
pub mod simulator;
pub mod streamer;

pub use acquisition::AcquisitionSource;
pub use buffer::{LiveBuffer, LiveSnapshot};
pub use simulator::{spawn_producer, SignalSimulator, SimulatorConfig};
pub use streamer::{
    online_accuracy, sleep_budget, OnlineRunSummary, OnlineStreamer, PredictionEvent,
    StreamerConfig, StreamerState,
};
