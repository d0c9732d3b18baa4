//! Error handling for the BCI workspace
//!
//! One error type shared by the offline and online paths. Configuration
//! problems surface at construction time, data problems at the call that
//! first touches the data.

use core::fmt;

/// Result type alias for BCI operations
pub type BciResult<T> = Result<T, BciError>;

/// Error type for all windowing, splitting, training and streaming operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BciError {
    /// Not enough samples to form the requested window(s)
    InsufficientData {
        /// Samples required for one window
        requested: usize,
        /// Samples actually available
        available: usize,
    },

    /// A parameter is outside its valid range; raised before any computation
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the violation
        reason: String,
    },

    /// Feature kind name not recognized by the pipeline configuration
    UnknownFeatureType {
        /// The offending kind name
        name: String,
    },

    /// A spectral feature was requested without a sampling rate
    MissingSamplingRate {
        /// Feature kind that needs the rate
        feature: String,
    },

    /// A custom pipeline was selected but no conforming transform was supplied
    InvalidPipelineObject {
        /// Description of what is missing
        reason: String,
    },

    /// Feature kind and classifier kind cannot be used together
    IncompatibleFeatureClassifier {
        /// Feature kind name
        feature: String,
        /// Classifier kind name
        classifier: String,
    },

    /// No fitted model exists for the requested subject
    ModelNotFound {
        /// Subject identifier
        subject: u32,
    },

    /// Channel count of incoming data does not match the expected layout
    ChannelMismatch {
        /// Expected channel count
        expected: usize,
        /// Actual channel count
        actual: usize,
    },

    /// Splitter or trainer invoked without usable data
    EmptyDataset {
        /// Description of what was empty
        reason: String,
    },

    /// Model-store or result-log serialization failure
    Serialization {
        /// Underlying error description
        reason: String,
    },

    /// File system failure while persisting or loading
    Io {
        /// Underlying error description
        reason: String,
    },
}

impl fmt::Display for BciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BciError::InsufficientData { requested, available } => {
                write!(f, "Insufficient data: {} samples required, {} available",
                       requested, available)
            }
            BciError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            BciError::UnknownFeatureType { name } => {
                write!(f, "Unknown feature type: '{}'", name)
            }
            BciError::MissingSamplingRate { feature } => {
                write!(f, "Sampling rate must be defined for feature '{}'", feature)
            }
            BciError::InvalidPipelineObject { reason } => {
                write!(f, "Invalid pipeline object: {}", reason)
            }
            BciError::IncompatibleFeatureClassifier { feature, classifier } => {
                write!(f, "Feature '{}' and classifier '{}' can not be used together",
                       feature, classifier)
            }
            BciError::ModelNotFound { subject } => {
                write!(f, "No trained model found for subject {}", subject)
            }
            BciError::ChannelMismatch { expected, actual } => {
                write!(f, "Channel mismatch: expected {}, got {}", expected, actual)
            }
            BciError::EmptyDataset { reason } => {
                write!(f, "Empty dataset: {}", reason)
            }
            BciError::Serialization { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            BciError::Io { reason } => {
                write!(f, "I/O error: {}", reason)
            }
        }
    }
}

impl std::error::Error for BciError {}

impl From<std::io::Error> for BciError {
    fn from(err: std::io::Error) -> Self {
        BciError::Io { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BciError::InsufficientData {
            requested: 200,
            available: 150,
        };
        let display = format!("{}", error);
        assert!(display.contains("200"));
        assert!(display.contains("150"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = BciError::ModelNotFound { subject: 4 };
        let error2 = BciError::ModelNotFound { subject: 4 };
        assert_eq!(error1, error2);
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BciError = io_err.into();
        assert!(matches!(err, BciError::Io { .. }));
    }
}
