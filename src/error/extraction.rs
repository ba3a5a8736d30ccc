// Internal pipeline errors
//
// These never cross the engine boundary directly; the facade converts them
// into `EngineError::InternalExtractionFailure`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Companion-matrix eigenvalue iteration did not converge
    LpcNonConvergence { frame: usize },

    /// A descriptor produced NaN or infinity
    NonFiniteDescriptor { descriptor: &'static str, frame: usize },

    /// Descriptor series disagree on frame count
    SeriesMisaligned {
        descriptor: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A functional slot was never written
    IncompleteFeatureVector { missing: Vec<String> },

    /// A functional was measured as NaN or infinity
    NonFiniteFeature { name: String },

    /// Windower produced no frames for a signal that passed validation
    NoFrames,
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::LpcNonConvergence { frame } => {
                write!(f, "LPC root solver did not converge at frame {}", frame)
            }
            ExtractionError::NonFiniteDescriptor { descriptor, frame } => {
                write!(f, "descriptor {} is not finite at frame {}", descriptor, frame)
            }
            ExtractionError::SeriesMisaligned {
                descriptor,
                expected,
                actual,
            } => write!(
                f,
                "descriptor {} has {} frames, expected {}",
                descriptor, actual, expected
            ),
            ExtractionError::IncompleteFeatureVector { missing } => {
                write!(f, "feature vector missing {} entries: {:?}", missing.len(), missing)
            }
            ExtractionError::NonFiniteFeature { name } => {
                write!(f, "feature {} is not finite", name)
            }
            ExtractionError::NoFrames => write!(f, "windower produced no frames"),
        }
    }
}

impl std::error::Error for ExtractionError {}
