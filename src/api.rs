// Public API for host bindings
//
// Thin free functions over a process-wide `Engine`, so hosts that cannot
// hold a Rust object (FFI, scripting bridges) can drive the engine by
// name. Rust callers that want several configurations should own an
// `Engine` directly instead.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use crate::config::EngineConfig;
use crate::engine::{AnalysisOptions, AnalysisReport, Engine, EngineState};
use crate::error::EngineError;
use crate::feature_set::{FeatureVector, FEATURE_NAMES};
use crate::signal::DecodedAudio;

/// Global engine instance with the reference configuration
///
/// Analysis takes the read lock, so concurrent calls run in parallel;
/// only `reinitialize_engine` and `configure_engine_from_file` take the
/// write lock.
static ENGINE: Lazy<RwLock<Engine>> = Lazy::new(|| RwLock::new(Engine::new()));

fn read_engine() -> Result<RwLockReadGuard<'static, Engine>, EngineError> {
    ENGINE.read().map_err(|_| EngineError::InternalExtractionFailure {
        reason: "engine lock poisoned".to_string(),
    })
}

fn write_engine() -> Result<RwLockWriteGuard<'static, Engine>, EngineError> {
    ENGINE.write().map_err(|_| EngineError::InternalExtractionFailure {
        reason: "engine lock poisoned".to_string(),
    })
}

/// Get the engine and recipe version
pub fn get_version() -> String {
    Engine::version().to_string()
}

/// Initialize the global engine
///
/// Safe to call repeatedly and from several threads; the work happens once.
///
/// # Errors
/// `InitializationFailure` if tables or configuration are invalid
pub fn initialize_engine() -> Result<(), EngineError> {
    read_engine()?.initialize()
}

/// Retry initialization of a failed global engine
///
/// Waits for in-flight analyses to finish before resetting.
pub fn reinitialize_engine() -> Result<(), EngineError> {
    write_engine()?.reinitialize()
}

/// Replace the global engine with one built from a JSON config file
///
/// A missing or malformed file falls back to the reference recipe (see
/// `EngineConfig::load_from_file`). The replacement is initialized before
/// it is swapped in, so a failure leaves the current engine untouched.
///
/// # Errors
/// `InitializationFailure` if the loaded configuration is invalid
pub fn configure_engine_from_file<P: AsRef<Path>>(path: P) -> Result<(), EngineError> {
    let engine = Engine::with_config(EngineConfig::load_from_file(path));
    engine.initialize()?;
    *write_engine()? = engine;
    log::info!("[API] Global engine reconfigured");
    Ok(())
}

pub fn is_engine_ready() -> bool {
    read_engine().map(|engine| engine.is_ready()).unwrap_or(false)
}

pub fn engine_state() -> Result<EngineState, EngineError> {
    Ok(read_engine()?.state())
}

/// Extract the 88 eGeMAPSv02 functionals
///
/// # Errors
/// Any `EngineError`; see `Engine::analyze`
pub fn analyze_audio(audio: &DecodedAudio) -> Result<FeatureVector, EngineError> {
    read_engine()?.analyze(audio)
}

/// Extract features with optional contours and voice summary
pub fn analyze_audio_detailed(
    audio: &DecodedAudio,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, EngineError> {
    read_engine()?.analyze_detailed(audio, options)
}

/// Canonical feature names in output order
pub fn get_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_engine() {
        assert_eq!(get_version(), Engine::version());
    }

    #[test]
    fn test_feature_names_are_canonical() {
        let names = get_feature_names();
        assert_eq!(names.len(), 88);
        assert_eq!(names[0], "F0semitoneFrom27.5Hz_sma3nz_amean");
        assert_eq!(names[87], "equivalentSoundLevel_dBp");
    }

    #[test]
    fn test_global_engine_initializes() {
        initialize_engine().unwrap();
        assert!(is_engine_ready());
        assert_eq!(engine_state().unwrap(), EngineState::Ready);
        // Ready engine is left alone
        reinitialize_engine().unwrap();
        assert!(is_engine_ready());
    }

    #[test]
    fn test_configure_from_missing_file_uses_reference_recipe() {
        configure_engine_from_file("/nonexistent/egemaps.json").unwrap();
        assert!(is_engine_ready());
        assert_eq!(engine_state().unwrap(), EngineState::Ready);
    }

    #[test]
    fn test_configure_rejects_invalid_file_config() {
        let path = std::env::temp_dir().join(format!("egemaps_api_{}.json", std::process::id()));
        let mut config = EngineConfig::default();
        config.framing.hop_size_ms = 0.0;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let result = configure_engine_from_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(EngineError::InitializationFailure { .. })));
    }

    #[test]
    fn test_global_analysis_rejects_invalid_rate() {
        initialize_engine().unwrap();
        let audio = DecodedAudio::from_f32(vec![0.0; 4_000], 4_000, 1);
        assert!(matches!(
            analyze_audio(&audio),
            Err(EngineError::InvalidAudio { .. })
        ));
    }
}
