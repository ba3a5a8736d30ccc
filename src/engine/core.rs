//! Engine: the feature extraction facade.
//!
//! One `Engine` owns the configuration and the assets prepared by
//! `initialize`. Initialization runs at most once per engine, even when
//! several threads race to call it; analysis calls share the assets
//! read-only and run concurrently without coordination.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::analysis::functionals::FunctionalAggregator;
use crate::analysis::lld::{LldExtractor, LldMatrix};
use crate::config::EngineConfig;
use crate::engine::assets::EngineAssets;
use crate::engine::report::{AnalysisOptions, AnalysisReport, LldTimeSeries};
use crate::error::{log_engine_error, EngineError};
use crate::feature_set::FeatureVector;
use crate::signal::{DecodedAudio, SignalBuffer};
use crate::summary::VoiceSummary;

/// Revision of the extraction recipe as a literal, so `concat!` can use it
macro_rules! recipe_revision {
    () => {
        "2"
    };
}

/// Revision of the extraction recipe; bumped whenever feature values change
pub const RECIPE_REVISION: &str = recipe_revision!();

/// Version string reported by `Engine::version`
pub const ENGINE_VERSION: &str = concat!(
    "egemaps_engine/",
    env!("CARGO_PKG_VERSION"),
    " (eGeMAPSv02, recipe ",
    recipe_revision!(),
    ")"
);

/// Lifecycle state of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Failed,
}

/// eGeMAPSv02 feature extraction engine
pub struct Engine {
    config: EngineConfig,
    assets: OnceCell<Result<Arc<EngineAssets>, EngineError>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the reference configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with a custom configuration
    ///
    /// The configuration is validated by `initialize`, not here.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            assets: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Prepare tables and validate configuration
    ///
    /// Idempotent: the first call does the work, later calls (and callers
    /// racing with the first) return the same outcome. A failed
    /// initialization stays failed until `reinitialize`.
    ///
    /// # Errors
    /// `InitializationFailure` if the configuration or a table is invalid
    pub fn initialize(&self) -> Result<(), EngineError> {
        let outcome = self.assets.get_or_init(|| {
            let span = tracing::info_span!("engine_initialize");
            let _guard = span.enter();

            let result = EngineAssets::load(&self.config).map(Arc::new);
            match &result {
                Ok(_) => log::info!("[Engine] Initialized ({})", ENGINE_VERSION),
                Err(err) => log_engine_error(err, "initialize"),
            }
            result
        });
        outcome.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    /// Retry initialization after a failure
    ///
    /// Requires exclusive access, so it cannot interleave with analysis.
    /// A ready engine is left untouched.
    pub fn reinitialize(&mut self) -> Result<(), EngineError> {
        if self.is_ready() {
            return Ok(());
        }
        log::info!("[Engine] Reinitializing");
        self.assets = OnceCell::new();
        self.initialize()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.assets.get(), Some(Ok(_)))
    }

    pub fn state(&self) -> EngineState {
        match self.assets.get() {
            None => EngineState::Uninitialized,
            Some(Ok(_)) => EngineState::Ready,
            Some(Err(_)) => EngineState::Failed,
        }
    }

    /// Engine and recipe version
    pub fn version() -> &'static str {
        ENGINE_VERSION
    }

    /// Extract the 88 eGeMAPSv02 functionals from decoded audio
    ///
    /// Deterministic: identical input and configuration give bit-identical
    /// output.
    ///
    /// # Errors
    /// - `EngineNotReady` before a successful `initialize`
    /// - `InvalidAudio` for unsupported rate, channel layout or samples
    /// - `InsufficientAudio` for signals below the minimum duration
    /// - `InternalExtractionFailure` for numeric failures in the pipeline
    pub fn analyze(&self, audio: &DecodedAudio) -> Result<FeatureVector, EngineError> {
        self.run(audio, "analyze").map(|(features, _)| features)
    }

    /// Like `analyze`, with optional contours and summary
    pub fn analyze_detailed(
        &self,
        audio: &DecodedAudio,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport, EngineError> {
        let (features, matrix) = self.run(audio, "analyze_detailed")?;

        let summary = options
            .include_summary
            .then(|| VoiceSummary::from_analysis(&features, &matrix));
        let lld_time_series = options
            .include_lld_time_series
            .then(|| LldTimeSeries::from_matrix(&matrix));

        Ok(AnalysisReport {
            engine_version: ENGINE_VERSION.to_string(),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            duration_ms: matrix.duration_secs() * 1000.0,
            frame_count: matrix.frame_count(),
            voiced_frame_count: matrix.voiced_frame_count(),
            features,
            summary,
            lld_time_series,
        })
    }

    fn run(&self, audio: &DecodedAudio, context: &str) -> Result<(FeatureVector, LldMatrix), EngineError> {
        let span = tracing::info_span!(
            "analyze",
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            samples = audio.samples.len()
        );
        let _guard = span.enter();

        let result = self.pipeline(audio);
        if let Err(err) = &result {
            log_engine_error(err, context);
        }
        result
    }

    fn pipeline(&self, audio: &DecodedAudio) -> Result<(FeatureVector, LldMatrix), EngineError> {
        let assets = match self.assets.get() {
            Some(Ok(assets)) => Arc::clone(assets),
            _ => return Err(EngineError::EngineNotReady),
        };

        let buffer = SignalBuffer::build(audio, &self.config.limits)?;

        // Numeric code below must not unwind across the engine boundary
        let extracted = catch_unwind(AssertUnwindSafe(|| {
            let tables = assets.tables_for(&self.config, buffer.sample_rate());
            let matrix = LldExtractor::new(&self.config, tables).extract(&buffer)?;
            let features = FunctionalAggregator::new().aggregate(&matrix)?;
            Ok::<_, EngineError>((features, matrix))
        }));

        let (features, matrix) = match extracted {
            Ok(result) => result?,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Err(EngineError::InternalExtractionFailure {
                    reason: format!("extraction panicked: {}", reason),
                });
            }
        };

        log::debug!(
            "[Engine] Extracted {} features ({} defined) from {} frames, {} voiced",
            features.len(),
            features.defined_count(),
            matrix.frame_count(),
            matrix.voiced_frame_count()
        );

        Ok((features, matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, secs: f32) -> DecodedAudio {
        let n = (sample_rate as f32 * secs) as usize;
        let samples = (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect();
        DecodedAudio::from_f32(samples, sample_rate, 1)
    }

    #[test]
    fn test_lifecycle_states() {
        let engine = Engine::new();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(!engine.is_ready());

        engine.initialize().unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        // Idempotent
        engine.initialize().unwrap();
        assert!(engine.is_ready());
    }

    #[test]
    fn test_analyze_before_initialize_is_not_ready() {
        let engine = Engine::new();
        assert_eq!(engine.analyze(&sine(220.0, 16_000, 1.5)), Err(EngineError::EngineNotReady));
    }

    #[test]
    fn test_failed_engine_stays_failed_until_reinitialized() {
        let mut config = EngineConfig::default();
        config.formants.lpc_order = 2;
        let mut engine = Engine::with_config(config);

        assert!(matches!(
            engine.initialize(),
            Err(EngineError::InitializationFailure { .. })
        ));
        assert_eq!(engine.state(), EngineState::Failed);
        assert_eq!(engine.analyze(&sine(220.0, 16_000, 1.5)), Err(EngineError::EngineNotReady));

        // Still invalid, still failed
        assert!(engine.reinitialize().is_err());
        assert_eq!(engine.state(), EngineState::Failed);
    }

    #[test]
    fn test_detailed_report_options() {
        let engine = Engine::new();
        engine.initialize().unwrap();
        let audio = sine(220.0, 16_000, 1.2);

        let bare = engine.analyze_detailed(&audio, &AnalysisOptions::default()).unwrap();
        assert!(bare.summary.is_none());
        assert!(bare.lld_time_series.is_none());
        assert_eq!(bare.features.len(), 88);

        let options = AnalysisOptions {
            include_lld_time_series: true,
            include_summary: true,
        };
        let full = engine.analyze_detailed(&audio, &options).unwrap();
        let series = full.lld_time_series.as_ref().unwrap();
        assert_eq!(series.timestamps_ms.len(), full.frame_count);
        assert_eq!(series.f0_hz.len(), full.frame_count);
        assert_eq!(full.features, bare.features);

        let mean_hz = full.summary.as_ref().unwrap().pitch.mean_hz.unwrap();
        assert!((mean_hz - 220.0).abs() < 4.4, "mean pitch {}", mean_hz);
    }

    #[test]
    fn test_version_names_recipe() {
        assert!(Engine::version().starts_with("egemaps_engine/"));
        assert!(Engine::version().ends_with(&format!("(eGeMAPSv02, recipe {})", RECIPE_REVISION)));
        assert!(RECIPE_REVISION.parse::<u32>().is_ok_and(|revision| revision > 0));
    }
}
