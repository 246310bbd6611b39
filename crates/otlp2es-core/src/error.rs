//! Error types for document encoding

use thiserror::Error;

use crate::mode::MappingMode;
use crate::Signal;

/// Errors produced while constructing encoders or encoding signals.
///
/// Three classes are represented here:
/// - configuration errors ([`EncodeError::UnknownMappingMode`]), fatal at startup
/// - capability errors ([`EncodeError::UnsupportedSignal`], [`EncodeError::BodyMapUnsupported`]),
///   returned every time a mode is asked to encode a signal it does not handle
/// - data errors (everything else), scoped to a single call or a single data point
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The requested mapping mode is not one of the known modes
    #[error("unknown mapping mode {value:?}")]
    UnknownMappingMode { value: String },

    /// The configured mapping mode has no encoding for this signal
    #[error("mapping mode {:?} ({}) does not support {}", .mode.as_str(), .mode.code(), .signal)]
    UnsupportedSignal { mode: MappingMode, signal: Signal },

    /// Bodymap mode only encodes log records
    #[error("bodymap mode does not support encoding {0}")]
    BodyMapUnsupported(Signal),

    /// Bodymap mode requires a map-typed log body
    #[error("invalid log record body type for 'bodymap' mapping mode: {actual:?}")]
    InvalidBodyType { actual: &'static str },

    /// Number data point has no value, or a NaN/infinite one
    #[error("invalid number data point {metric:?}")]
    InvalidNumberDataPoint { metric: String },

    /// Histogram bucket counts and explicit bounds do not line up
    #[error("invalid histogram data point {metric:?}: {reason}")]
    InvalidHistogramDataPoint { metric: String, reason: String },

    /// Data point kind the encoder cannot turn into a document value
    #[error("unsupported data point type {kind} for metric {metric:?}")]
    UnsupportedDataPoint { metric: String, kind: &'static str },

    /// Two data points in one document share a metric name
    #[error("metric with name {metric:?} has already been encoded for this document")]
    DuplicateMetric { metric: String },

    /// JSON serialization failed
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for EncodeError
pub type Result<T> = std::result::Result<T, EncodeError>;
