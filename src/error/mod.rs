// Error types for the feature extraction engine
//
// This module defines the public engine error taxonomy and the internal
// pipeline errors, providing structured error handling with numeric codes
// suitable for host bindings.

mod engine;
mod extraction;

pub use engine::{log_engine_error, EngineError, EngineErrorCodes};
pub use extraction::ExtractionError;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the engine boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
