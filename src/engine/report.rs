//! Options and result types for detailed analysis.

use serde::{Deserialize, Serialize};

use crate::analysis::lld::{Descriptor, LldMatrix};
use crate::feature_set::FeatureVector;
use crate::summary::VoiceSummary;

/// What `Engine::analyze_detailed` should return besides the feature vector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Include per-frame F0, loudness and HNR contours
    #[serde(default)]
    pub include_lld_time_series: bool,
    /// Include the human-oriented voice summary
    #[serde(default)]
    pub include_summary: bool,
}

/// Per-frame contours for visualization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LldTimeSeries {
    /// Frame centre times in milliseconds
    pub timestamps_ms: Vec<f64>,
    pub voiced: Vec<bool>,
    /// `null` on unvoiced frames
    pub f0_hz: Vec<Option<f64>>,
    pub loudness: Vec<f64>,
    /// `null` on unvoiced frames
    pub hnr_db: Vec<Option<f64>>,
}

impl LldTimeSeries {
    pub fn from_matrix(matrix: &LldMatrix) -> Self {
        Self {
            timestamps_ms: matrix.frame_times().iter().map(|t| t * 1000.0).collect(),
            voiced: matrix.voiced().to_vec(),
            f0_hz: matrix.f0_hz(),
            loudness: matrix.series(Descriptor::Loudness).dense(),
            hnr_db: matrix.series(Descriptor::HnrDbAcf).values.clone(),
        }
    }
}

/// Result of a detailed analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub engine_version: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: f64,
    pub frame_count: usize,
    pub voiced_frame_count: usize,
    pub features: FeatureVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<VoiceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lld_time_series: Option<LldTimeSeries>,
}
