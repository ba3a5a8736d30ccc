//! Human-oriented voice summary derived from a feature vector
//!
//! Converts the raw functionals into units people read (Hz, percent,
//! centimetres) and grades perturbation and noise measures against the
//! usual clinical reference ranges. Every field is optional: a recording
//! without voiced frames has no pitch, formants or perturbation.

use serde::Serialize;

use crate::analysis::lld::pitch::semitones_to_hz;
use crate::analysis::lld::LldMatrix;
use crate::feature_set::FeatureVector;

/// Speed of sound in cm/s used for vocal tract length
pub const SPEED_OF_SOUND_CM_S: f64 = 35_000.0;

/// Jitter (%) upper bounds for excellent / good / normal
pub const JITTER_LIMITS: [f64; 3] = [1.0, 2.0, 3.0];
/// Shimmer (dB) upper bounds for excellent / good / normal
pub const SHIMMER_LIMITS: [f64; 3] = [1.0, 2.0, 3.0];
/// HNR (dB) lower bounds for excellent / good / normal
pub const HNR_LIMITS: [f64; 3] = [18.0, 12.0, 7.0];

/// Pitch register of a mean F0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchCategory {
    VeryDeep,
    Deep,
    Average,
    Higher,
}

impl PitchCategory {
    pub fn from_hz(pitch_hz: f64) -> Self {
        if pitch_hz < 100.0 {
            PitchCategory::VeryDeep
        } else if pitch_hz < 130.0 {
            PitchCategory::Deep
        } else if pitch_hz < 165.0 {
            PitchCategory::Average
        } else {
            PitchCategory::Higher
        }
    }
}

/// Grade of a measure against its reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalStatus {
    Excellent,
    Good,
    Normal,
    /// Jitter/shimmer above, or HNR below, the normal range
    OutOfRange,
}

impl ClinicalStatus {
    /// Grade a lower-is-better measure against ascending upper bounds
    pub fn lower_is_better(value: f64, limits: [f64; 3]) -> Self {
        if value <= limits[0] {
            ClinicalStatus::Excellent
        } else if value <= limits[1] {
            ClinicalStatus::Good
        } else if value <= limits[2] {
            ClinicalStatus::Normal
        } else {
            ClinicalStatus::OutOfRange
        }
    }

    /// Grade a higher-is-better measure against descending lower bounds
    pub fn higher_is_better(value: f64, limits: [f64; 3]) -> Self {
        if value >= limits[0] {
            ClinicalStatus::Excellent
        } else if value >= limits[1] {
            ClinicalStatus::Good
        } else if value >= limits[2] {
            ClinicalStatus::Normal
        } else {
            ClinicalStatus::OutOfRange
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchSummary {
    pub mean_hz: Option<f64>,
    pub min_hz: Option<f64>,
    pub max_hz: Option<f64>,
    /// 0-100, 100 for perfectly periodic voicing; falls linearly to 0 at
    /// the upper end of the normal jitter range
    pub stability: Option<f64>,
    pub category: Option<PitchCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormantSummary {
    pub f1_hz: Option<f64>,
    pub f2_hz: Option<f64>,
    pub f3_hz: Option<f64>,
    pub vocal_tract_length_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedMetrics {
    pub jitter_percent: Option<f64>,
    pub jitter_status: Option<ClinicalStatus>,
    pub shimmer_db: Option<f64>,
    pub shimmer_status: Option<ClinicalStatus>,
    pub hnr_db: Option<f64>,
    pub hnr_status: Option<ClinicalStatus>,
    pub h1_h2_db: Option<f64>,
    pub alpha_ratio_db: Option<f64>,
    pub hammarberg_index_db: Option<f64>,
    pub loudness: Option<f64>,
}

/// Summary of one analyzed recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSummary {
    pub pitch: PitchSummary,
    pub formants: FormantSummary,
    pub metrics: DetailedMetrics,
}

impl VoiceSummary {
    /// Build the summary from a feature vector and the matching LLD matrix
    pub fn from_analysis(features: &FeatureVector, matrix: &LldMatrix) -> Self {
        let get = |name: &str| features.get(name).and_then(|v| v.value());

        let voiced_f0: Vec<f64> = matrix.f0_hz().into_iter().flatten().collect();
        let mean_hz = get("F0semitoneFrom27.5Hz_sma3nz_amean").map(semitones_to_hz);
        let jitter_percent = get("jitterLocal_sma3nz_amean").map(|j| j * 100.0);
        let shimmer_db = get("shimmerLocaldB_sma3nz_amean");
        let hnr_db = get("HNRdBACF_sma3nz_amean");

        let f1 = get("F1frequency_sma3nz_amean");
        let f3 = get("F3frequency_sma3nz_amean");

        VoiceSummary {
            pitch: PitchSummary {
                mean_hz,
                min_hz: voiced_f0.iter().copied().reduce(f64::min),
                max_hz: voiced_f0.iter().copied().reduce(f64::max),
                stability: jitter_percent.map(pitch_stability),
                category: mean_hz.map(PitchCategory::from_hz),
            },
            formants: FormantSummary {
                f1_hz: f1,
                f2_hz: get("F2frequency_sma3nz_amean"),
                f3_hz: f3,
                vocal_tract_length_cm: f1.zip(f3).and_then(|(f1, f3)| estimate_vocal_tract_length(f1, f3)),
            },
            metrics: DetailedMetrics {
                jitter_percent,
                jitter_status: jitter_percent.map(|j| ClinicalStatus::lower_is_better(j, JITTER_LIMITS)),
                shimmer_db,
                shimmer_status: shimmer_db.map(|s| ClinicalStatus::lower_is_better(s, SHIMMER_LIMITS)),
                hnr_db,
                hnr_status: hnr_db.map(|h| ClinicalStatus::higher_is_better(h, HNR_LIMITS)),
                h1_h2_db: get("logRelF0-H1-H2_sma3nz_amean"),
                alpha_ratio_db: get("alphaRatioV_sma3nz_amean"),
                hammarberg_index_db: get("hammarbergIndexV_sma3nz_amean"),
                loudness: get("loudness_sma3_amean"),
            },
        }
    }
}

/// Pitch stability score from jitter in percent
pub fn pitch_stability(jitter_percent: f64) -> f64 {
    (100.0 * (1.0 - jitter_percent / JITTER_LIMITS[2])).clamp(0.0, 100.0)
}

/// Vocal tract length in cm from F1 and formant dispersion
///
/// Averages the quarter-wavelength estimate c / (4·F1) with the dispersion
/// estimate c / (2·ΔF), ΔF = (F3 - F1) / 2. Returns `None` for
/// non-increasing or non-positive formants.
pub fn estimate_vocal_tract_length(f1_hz: f64, f3_hz: f64) -> Option<f64> {
    if f1_hz <= 0.0 || f3_hz <= f1_hz {
        return None;
    }
    let from_f1 = SPEED_OF_SOUND_CM_S / (4.0 * f1_hz);
    let spacing = (f3_hz - f1_hz) / 2.0;
    let from_dispersion = SPEED_OF_SOUND_CM_S / (2.0 * spacing);
    Some((from_f1 + from_dispersion) / 2.0)
}

/// Signed distance in semitones from `from_hz` to `to_hz`
pub fn semitones_between(from_hz: f64, to_hz: f64) -> Option<f64> {
    if from_hz <= 0.0 || to_hz <= 0.0 {
        return None;
    }
    Some(12.0 * (to_hz / from_hz).log2())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_categories() {
        assert_eq!(PitchCategory::from_hz(85.0), PitchCategory::VeryDeep);
        assert_eq!(PitchCategory::from_hz(120.0), PitchCategory::Deep);
        assert_eq!(PitchCategory::from_hz(150.0), PitchCategory::Average);
        assert_eq!(PitchCategory::from_hz(220.0), PitchCategory::Higher);
    }

    #[test]
    fn test_clinical_grading() {
        assert_eq!(ClinicalStatus::lower_is_better(0.5, JITTER_LIMITS), ClinicalStatus::Excellent);
        assert_eq!(ClinicalStatus::lower_is_better(2.5, JITTER_LIMITS), ClinicalStatus::Normal);
        assert_eq!(ClinicalStatus::lower_is_better(4.0, SHIMMER_LIMITS), ClinicalStatus::OutOfRange);
        assert_eq!(ClinicalStatus::higher_is_better(20.0, HNR_LIMITS), ClinicalStatus::Excellent);
        assert_eq!(ClinicalStatus::higher_is_better(13.0, HNR_LIMITS), ClinicalStatus::Good);
        assert_eq!(ClinicalStatus::higher_is_better(3.0, HNR_LIMITS), ClinicalStatus::OutOfRange);
    }

    #[test]
    fn test_vocal_tract_length() {
        // Uniform 17.5 cm tube: F1 = 500 Hz, F3 = 2500 Hz
        let vtl = estimate_vocal_tract_length(500.0, 2500.0).unwrap();
        assert!((vtl - 17.5).abs() < 1e-9);
        assert_eq!(estimate_vocal_tract_length(500.0, 400.0), None);
    }

    #[test]
    fn test_semitones_between() {
        assert!((semitones_between(110.0, 220.0).unwrap() - 12.0).abs() < 1e-12);
        assert!((semitones_between(220.0, 110.0).unwrap() + 12.0).abs() < 1e-12);
        assert_eq!(semitones_between(0.0, 110.0), None);
    }

    #[test]
    fn test_stability_scale() {
        assert_eq!(pitch_stability(0.0), 100.0);
        assert_eq!(pitch_stability(3.0), 0.0);
        assert_eq!(pitch_stability(10.0), 0.0);
        assert!((pitch_stability(1.5) - 50.0).abs() < 1e-9);
    }
}
