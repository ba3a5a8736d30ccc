//! Engine configuration
//!
//! `EngineConfig::default()` is the reference eGeMAPSv02 recipe. Downstream
//! consumers compare feature values across recordings, so the defaults are
//! pinned constants; a JSON file can override them for experimentation, at
//! the cost of reference compatibility.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::windower::EdgePolicy;

/// Spectral/energy analysis window length (Hamming)
pub const FRAME_SIZE_MS: f64 = 25.0;
/// Pitch analysis window length (Gaussian)
pub const PITCH_FRAME_SIZE_MS: f64 = 60.0;
/// Hop between consecutive frames
pub const HOP_SIZE_MS: f64 = 10.0;
/// Gaussian window sigma, relative to half the window length
pub const GAUSSIAN_SIGMA: f64 = 0.4;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub pitch: PitchConfig,
    #[serde(default)]
    pub formants: FormantConfig,
    #[serde(default)]
    pub limits: InputLimits,
}

/// Frame windowing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Spectral/energy window length in milliseconds
    pub frame_size_ms: f64,
    /// Pitch window length in milliseconds (centred on the spectral frame)
    pub pitch_frame_size_ms: f64,
    /// Hop size in milliseconds
    pub hop_size_ms: f64,
    /// Gaussian window sigma for the pitch frame
    pub gaussian_sigma: f64,
    /// What to do with a trailing frame shorter than the window
    pub edge_policy: EdgePolicy,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            frame_size_ms: FRAME_SIZE_MS,
            pitch_frame_size_ms: PITCH_FRAME_SIZE_MS,
            hop_size_ms: HOP_SIZE_MS,
            gaussian_sigma: GAUSSIAN_SIGMA,
            edge_policy: EdgePolicy::Drop,
        }
    }
}

/// Pitch tracker parameters
///
/// Candidate scoring and path costs follow the autocorrelation tracker of
/// Boersma (1993).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchConfig {
    pub f0_min_hz: f64,
    pub f0_max_hz: f64,
    /// Voiced candidates kept per frame
    pub max_candidates: usize,
    /// Frames whose peak is below this fraction of the global peak lean unvoiced
    pub silence_threshold: f64,
    /// Minimum normalized autocorrelation strength for a voiced decision
    pub voicing_threshold: f64,
    /// Penalty favouring higher-frequency candidates, per octave
    pub octave_cost: f64,
    /// Transition penalty for frame-to-frame pitch jumps, per octave
    pub octave_jump_cost: f64,
    /// Transition penalty for voiced/unvoiced switches
    pub voiced_unvoiced_cost: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            f0_min_hz: 55.0,
            f0_max_hz: 1000.0,
            max_candidates: 6,
            silence_threshold: 0.03,
            voicing_threshold: 0.45,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
        }
    }
}

/// LPC formant analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormantConfig {
    /// Formant analysis runs on the signal resampled to this rate (if lower than input)
    pub resample_rate_hz: u32,
    /// First-order pre-emphasis coefficient
    pub pre_emphasis: f64,
    pub lpc_order: usize,
    pub num_formants: usize,
    /// Roots below this frequency are discarded
    pub min_formant_hz: f64,
    /// Upper bound on Schur iterations before reporting non-convergence
    pub max_solver_iterations: usize,
}

impl Default for FormantConfig {
    fn default() -> Self {
        Self {
            resample_rate_hz: 11_000,
            pre_emphasis: 0.7,
            lpc_order: 11,
            num_formants: 3,
            min_formant_hz: 50.0,
            max_solver_iterations: 1_000,
        }
    }
}

/// Accepted input envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputLimits {
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub max_channels: u16,
    /// Shortest signal accepted by `analyze`
    pub min_duration_ms: u32,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_sample_rate: 8_000,
            max_sample_rate: 48_000,
            max_channels: 8,
            min_duration_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the reference defaults if the file
    /// doesn't exist or the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Strict parse for callers that must not silently fall back
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Check internal consistency
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        let framing = &self.framing;
        if !(framing.frame_size_ms > 0.0 && framing.hop_size_ms > 0.0) {
            return Err("frame and hop sizes must be positive".to_string());
        }
        if framing.hop_size_ms > framing.frame_size_ms {
            return Err(format!(
                "hop size {} ms exceeds frame size {} ms",
                framing.hop_size_ms, framing.frame_size_ms
            ));
        }
        if framing.pitch_frame_size_ms < framing.frame_size_ms {
            return Err("pitch frame must be at least as long as the spectral frame".to_string());
        }
        if !(framing.gaussian_sigma > 0.0 && framing.gaussian_sigma <= 1.0) {
            return Err(format!("gaussian sigma {} out of (0, 1]", framing.gaussian_sigma));
        }

        let pitch = &self.pitch;
        if !(pitch.f0_min_hz > 0.0 && pitch.f0_min_hz < pitch.f0_max_hz) {
            return Err(format!(
                "invalid F0 range {}..{} Hz",
                pitch.f0_min_hz, pitch.f0_max_hz
            ));
        }
        // The pitch window has to hold at least three periods of the lowest F0
        let min_window_ms = 3000.0 / pitch.f0_min_hz;
        if framing.pitch_frame_size_ms + 1e-9 < min_window_ms {
            return Err(format!(
                "pitch frame {} ms too short for F0 floor {} Hz (need {:.1} ms)",
                framing.pitch_frame_size_ms, pitch.f0_min_hz, min_window_ms
            ));
        }
        if pitch.max_candidates == 0 {
            return Err("at least one pitch candidate is required".to_string());
        }
        if !(0.0..1.0).contains(&pitch.voicing_threshold) {
            return Err(format!("voicing threshold {} out of [0, 1)", pitch.voicing_threshold));
        }

        let formants = &self.formants;
        if formants.lpc_order < 2 * formants.num_formants {
            return Err(format!(
                "LPC order {} cannot resolve {} formants",
                formants.lpc_order, formants.num_formants
            ));
        }
        if !(0.0..1.0).contains(&formants.pre_emphasis) {
            return Err(format!("pre-emphasis {} out of [0, 1)", formants.pre_emphasis));
        }
        if formants.max_solver_iterations == 0 {
            return Err("solver iteration limit must be positive".to_string());
        }

        let limits = &self.limits;
        if limits.min_sample_rate == 0 || limits.min_sample_rate > limits.max_sample_rate {
            return Err("invalid sample rate range".to_string());
        }
        if limits.max_channels == 0 {
            return Err("max_channels must be positive".to_string());
        }
        if f64::from(limits.min_duration_ms) < framing.pitch_frame_size_ms {
            return Err(format!(
                "minimum duration {} ms shorter than one analysis window",
                limits.min_duration_ms
            ));
        }
        if 2.0 * pitch.f0_max_hz >= f64::from(limits.min_sample_rate) {
            return Err(format!(
                "F0 ceiling {} Hz too close to Nyquist at {} Hz",
                pitch.f0_max_hz, limits.min_sample_rate
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.framing.frame_size_ms, 25.0);
        assert_eq!(config.framing.pitch_frame_size_ms, 60.0);
        assert_eq!(config.framing.hop_size_ms, 10.0);
        assert_eq!(config.framing.edge_policy, EdgePolicy::Drop);
        assert_eq!(config.formants.lpc_order, 11);
        assert_eq!(config.limits.min_duration_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let parsed =
            EngineConfig::from_json_str(r#"{"limits": {"min_sample_rate": 16000, "max_sample_rate": 48000, "max_channels": 2, "min_duration_ms": 500}}"#)
                .unwrap();
        assert_eq!(parsed.limits.min_sample_rate, 16000);
        assert_eq!(parsed.pitch, PitchConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_from_file("/nonexistent/egemaps.json");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_validate_rejects_inverted_f0_range() {
        let mut config = EngineConfig::default();
        config.pitch.f0_min_hz = 500.0;
        config.pitch.f0_max_hz = 100.0;
        assert!(config.validate().unwrap_err().contains("F0 range"));
    }

    #[test]
    fn test_validate_rejects_hop_larger_than_frame() {
        let mut config = EngineConfig::default();
        config.framing.hop_size_ms = 40.0;
        assert!(config.validate().unwrap_err().contains("hop size"));
    }

    #[test]
    fn test_validate_rejects_short_pitch_window() {
        let mut config = EngineConfig::default();
        config.pitch.f0_min_hz = 30.0;
        assert!(config.validate().unwrap_err().contains("too short"));
    }
}
