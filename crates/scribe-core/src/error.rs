//! Unified error types for the scribe-core public API.
//!
//! Every public operation returns `Result<T, ScribeError>`. Errors are always
//! returned to the immediate caller; nothing in this layer panics across a
//! boundary or retries internally.
//!
//! # Error Hierarchy
//!
//! ```text
//! ScribeError
//! ├── Load { reason }              -- artifact missing/corrupt, engine init failure
//! ├── InvalidParameter { reason }  -- out-of-range configuration value
//! ├── Scorer { reason }            -- no scorer loaded, or scorer artifact invalid
//! ├── Decode { reason }            -- engine-internal decode failure
//! └── UseAfterFinish               -- operation on a Terminal stream or closed model
//! ```
//!
//! Each variant maps to a stable integer [`ErrorCode`] for the C ABI, where
//! operations report status as `0 = success` and non-zero codes resolve to a
//! human-readable message via [`ErrorCode::message`].

use thiserror::Error;

/// Result type alias for scribe-core.
pub type ScribeResult<T> = Result<T, ScribeError>;

/// The canonical error type for scribe-core public API.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// Model or streaming state could not be loaded/allocated.
    ///
    /// Fatal to the attempted call only, never to the process. No partial
    /// handle survives a failed load.
    #[error("Load failed: {reason}")]
    Load { reason: String },

    /// Caller supplied an out-of-range configuration value.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// Scorer configuration failed (no scorer loaded, or artifact invalid).
    #[error("Scorer error: {reason}")]
    Scorer { reason: String },

    /// Engine-internal decode failure. Does not invalidate the session.
    #[error("Decode failed: {reason}")]
    Decode { reason: String },

    /// Operation invoked on a finished stream or closed model.
    ///
    /// A programming-error class: the underlying handle may already be freed,
    /// so this layer fails fast instead of attempting recovery.
    #[error("Use after finish: the stream is finished or the model is closed")]
    UseAfterFinish,
}

impl ScribeError {
    /// Create a load error.
    pub fn load(reason: impl Into<String>) -> Self {
        ScribeError::Load {
            reason: reason.into(),
        }
    }

    /// Create an invalid-parameter error.
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        ScribeError::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Create a scorer error.
    pub fn scorer(reason: impl Into<String>) -> Self {
        ScribeError::Scorer {
            reason: reason.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        ScribeError::Decode {
            reason: reason.into(),
        }
    }

    /// The stable status code for this error, as reported over the C ABI.
    pub fn code(&self) -> ErrorCode {
        match self {
            ScribeError::Load { .. } => ErrorCode::Load,
            ScribeError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            ScribeError::Scorer { .. } => ErrorCode::Scorer,
            ScribeError::Decode { .. } => ErrorCode::Decode,
            ScribeError::UseAfterFinish => ErrorCode::UseAfterFinish,
        }
    }
}

/// Stable status codes for the C ABI.
///
/// `Ok` is `0`; failure codes are grouped by class so that new codes can be
/// added within a group without renumbering.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Success.
    Ok = 0x0000,
    /// Model/scorer artifact missing, unreadable, or incompatible.
    Load = 0x1000,
    /// Out-of-range configuration value.
    InvalidParameter = 0x2000,
    /// Scorer configuration failure.
    Scorer = 0x3000,
    /// Engine-internal decode failure.
    Decode = 0x4000,
    /// Operation on a finished stream or closed model.
    UseAfterFinish = 0x5000,
}

impl ErrorCode {
    /// Resolve a raw status code received over the ABI.
    ///
    /// Returns `None` for values that are not scribe status codes.
    pub fn from_i32(code: i32) -> Option<ErrorCode> {
        match code {
            0x0000 => Some(ErrorCode::Ok),
            0x1000 => Some(ErrorCode::Load),
            0x2000 => Some(ErrorCode::InvalidParameter),
            0x3000 => Some(ErrorCode::Scorer),
            0x4000 => Some(ErrorCode::Decode),
            0x5000 => Some(ErrorCode::UseAfterFinish),
            _ => None,
        }
    }

    /// Human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Ok => "no error",
            ErrorCode::Load => "failed to load model or allocate engine state",
            ErrorCode::InvalidParameter => "invalid parameter",
            ErrorCode::Scorer => "scorer configuration failed",
            ErrorCode::Decode => "decoding failed",
            ErrorCode::UseAfterFinish => "operation on a finished stream or closed model",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> i32 {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScribeError::load("model.bin not found");
        assert_eq!(err.to_string(), "Load failed: model.bin not found");

        let err = ScribeError::invalid_parameter("beam width must be non-zero");
        assert!(err.to_string().contains("beam width"));
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(ScribeError::load("x").code(), ErrorCode::Load);
        assert_eq!(
            ScribeError::invalid_parameter("x").code(),
            ErrorCode::InvalidParameter
        );
        assert_eq!(ScribeError::scorer("x").code(), ErrorCode::Scorer);
        assert_eq!(ScribeError::decode("x").code(), ErrorCode::Decode);
        assert_eq!(ScribeError::UseAfterFinish.code(), ErrorCode::UseAfterFinish);
    }

    #[test]
    fn test_error_code_round_trip() {
        for code in [
            ErrorCode::Ok,
            ErrorCode::Load,
            ErrorCode::InvalidParameter,
            ErrorCode::Scorer,
            ErrorCode::Decode,
            ErrorCode::UseAfterFinish,
        ] {
            assert_eq!(ErrorCode::from_i32(code as i32), Some(code));
        }
        assert_eq!(ErrorCode::from_i32(-1), None);
        assert_eq!(ErrorCode::from_i32(0x6000), None);
    }

    #[test]
    fn test_error_code_message() {
        assert_eq!(ErrorCode::Ok.message(), "no error");
        assert!(ErrorCode::UseAfterFinish.message().contains("finished"));
    }
}
