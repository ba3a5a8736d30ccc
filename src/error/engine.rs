// Engine error types and constants

use crate::error::{ErrorCode, ExtractionError};
use log::error;
use std::fmt;

/// Engine error code constants
///
/// Single source of truth for the numeric codes reported across the
/// engine boundary (CLI exit payloads, host bindings).
///
/// Error code range: 3001-3005
pub struct EngineErrorCodes {}

impl EngineErrorCodes {
    /// `analyze` was called before a successful `initialize`
    pub const ENGINE_NOT_READY: i32 = 3001;

    /// Required tables or configuration failed validation during `initialize`
    pub const INITIALIZATION_FAILURE: i32 = 3002;

    /// Unsupported sample rate, channel layout, or sample content
    pub const INVALID_AUDIO: i32 = 3003;

    /// Signal shorter than the minimum analysis duration
    pub const INSUFFICIENT_AUDIO: i32 = 3004;

    /// Unexpected numeric failure inside the extraction pipeline
    pub const INTERNAL_EXTRACTION_FAILURE: i32 = 3005;
}

/// Log an engine error with structured context
///
/// Emits the numeric code, the component, and the human-readable message
/// so host logs can be filtered by code.
pub fn log_engine_error(err: &EngineError, context: &str) {
    error!(
        "Engine error in {}: code={}, component=FeatureEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors returned across the engine boundary
///
/// Every failure of `initialize` or `analyze` is translated into exactly
/// one of these variants. Partial feature vectors are never returned.
///
/// Error code range: 3001-3005
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `initialize` never ran or failed; call it before analyzing
    EngineNotReady,

    /// Required tables or configuration are missing or corrupt
    InitializationFailure { reason: String },

    /// Unsupported sample rate or channel layout; the caller must re-encode
    InvalidAudio { reason: String },

    /// Signal shorter than the minimum analysis duration
    InsufficientAudio { required_ms: u32, actual_ms: u32 },

    /// Unexpected numeric failure (e.g. LPC root solver did not converge)
    InternalExtractionFailure { reason: String },
}

impl ErrorCode for EngineError {
    fn code(&self) -> i32 {
        match self {
            EngineError::EngineNotReady => EngineErrorCodes::ENGINE_NOT_READY,
            EngineError::InitializationFailure { .. } => EngineErrorCodes::INITIALIZATION_FAILURE,
            EngineError::InvalidAudio { .. } => EngineErrorCodes::INVALID_AUDIO,
            EngineError::InsufficientAudio { .. } => EngineErrorCodes::INSUFFICIENT_AUDIO,
            EngineError::InternalExtractionFailure { .. } => {
                EngineErrorCodes::INTERNAL_EXTRACTION_FAILURE
            }
        }
    }

    fn message(&self) -> String {
        match self {
            EngineError::EngineNotReady => {
                "Engine not ready. Call initialize() first.".to_string()
            }
            EngineError::InitializationFailure { reason } => {
                format!("Engine initialization failed: {}", reason)
            }
            EngineError::InvalidAudio { reason } => format!("Invalid audio: {}", reason),
            EngineError::InsufficientAudio {
                required_ms,
                actual_ms,
            } => format!(
                "Insufficient audio: need at least {} ms, got {} ms",
                required_ms, actual_ms
            ),
            EngineError::InternalExtractionFailure { reason } => {
                format!("Internal extraction failure: {}", reason)
            }
        }
    }
}

impl EngineError {
    /// Whether retrying the same input can succeed
    ///
    /// Extraction is deterministic, so only internal failures (possibly
    /// caused by resource exhaustion) are worth a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::InternalExtractionFailure { .. })
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EngineError::{} (code {}): {}",
            self.variant_name(),
            self.code(),
            self.message()
        )
    }
}

impl EngineError {
    fn variant_name(&self) -> &'static str {
        match self {
            EngineError::EngineNotReady => "EngineNotReady",
            EngineError::InitializationFailure { .. } => "InitializationFailure",
            EngineError::InvalidAudio { .. } => "InvalidAudio",
            EngineError::InsufficientAudio { .. } => "InsufficientAudio",
            EngineError::InternalExtractionFailure { .. } => "InternalExtractionFailure",
        }
    }
}

impl std::error::Error for EngineError {}

/// Pipeline failures surface as internal extraction failures
impl From<ExtractionError> for EngineError {
    fn from(err: ExtractionError) -> Self {
        EngineError::InternalExtractionFailure {
            reason: err.to_string(),
        }
    }
}
