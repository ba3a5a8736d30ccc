// eGeMAPS Engine - acoustic voice feature extraction
// Deterministic eGeMAPSv02 functionals from decoded PCM

// Module declarations
pub mod analysis;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod feature_set;
pub mod signal;
pub mod summary;
pub mod testing;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::{AnalysisOptions, AnalysisReport, Engine, EngineState};
pub use error::{EngineError, ErrorCode};
pub use feature_set::{FeatureValue, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use signal::{DecodedAudio, PcmSamples};
pub use summary::VoiceSummary;
