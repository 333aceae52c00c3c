//! Error types for payload decoding in bioguard-types.

use thiserror::Error;

/// A payload that could not be turned into a [`Reading`](crate::Reading).
///
/// Decode warnings are never fatal: the caller logs them and drops the
/// payload, leaving the connection and the presentation untouched.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeWarning {
    /// The payload split into fewer segments than the protocol requires.
    #[error("unexpected payload format: expected {expected} segments, got {actual} in {payload:?}")]
    TooFewSegments {
        /// Minimum number of segments.
        expected: usize,
        /// Number of segments found.
        actual: usize,
        /// The decoded text, for logging.
        payload: String,
    },
}

impl DecodeWarning {
    /// The decoded text that triggered the warning.
    pub fn payload(&self) -> &str {
        match self {
            Self::TooFewSegments { payload, .. } => payload,
        }
    }
}

/// Result type alias using bioguard-types' DecodeWarning type.
pub type DecodeResult<T> = std::result::Result<T, DecodeWarning>;
