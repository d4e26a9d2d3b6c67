//! Error handling for ACQ conversion
//!
//! Channel-level defects and storage failures share one error type so that
//! the extractor can report any of them against a channel index.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ACQ core operations
pub type AcqResult<T> = Result<T, AcqError>;

/// Error type for channel validation, binary output and metadata storage
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AcqError {
    /// The recording slot holds no channel at all
    #[error("channel is missing from the recording")]
    MissingChannel,

    /// The channel carries no sample data
    #[error("channel has no sample data")]
    MissingSamples,

    /// The channel does not advertise a sample rate
    #[error("channel has no sample rate")]
    MissingSampleRate,

    /// Sample rate is zero, negative or not a number
    #[error("invalid sample rate: {rate} Hz")]
    InvalidSamplingRate {
        /// Rate reported by the decoder
        rate: f64,
    },

    /// Statistics cannot be computed over zero samples
    #[error("channel has zero samples")]
    EmptySignal,

    /// Statistics contain NaN or infinity and cannot be stored as JSON numbers
    #[error("channel statistics are not finite")]
    NonFiniteStatistics,

    /// Filesystem failure on a specific path
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// An existing metadata document could not be parsed
    #[error("malformed metadata document {}: {source}", .path.display())]
    MalformedMetadata {
        /// Location of the document
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory store could not be encoded
    #[error("failed to encode metadata: {0}")]
    MetadataEncoding(#[source] serde_json::Error),

    /// A channel binary disagrees with its recorded sample count
    #[error(
        "binary size mismatch for {}: expected {expected_bytes} bytes, found {actual_bytes}",
        .path.display()
    )]
    BinarySizeMismatch {
        /// Binary file checked
        path: PathBuf,
        /// `4 * num_samples`
        expected_bytes: u64,
        /// Length on disk
        actual_bytes: u64,
    },
}

impl AcqError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AcqError::Io {
            path: path.into(),
            source,
        }
    }
}
