// Functionals module - LLD contours to the 88-value feature vector
//
// Each functional family reads one descriptor series, smooths it with a
// 3-frame moving average (sma3 over every frame, sma3nz over the frames
// where the descriptor is defined) and summarizes it. The "V"/"UV"
// families restrict spectral descriptors to voiced or unvoiced frames
// before smoothing. Empty scopes produce undefined values, never zeros.

pub mod stats;

use crate::analysis::lld::{Descriptor, LldMatrix};
use crate::error::ExtractionError;
use crate::feature_set::{FeatureValue, FeatureVector, FeatureVectorBuilder};

use stats::Segment;

/// Full family: moments, percentiles and slope statistics
const FULL_SET: [(&str, Descriptor); 2] = [
    ("F0semitoneFrom27.5Hz_sma3nz", Descriptor::F0Semitone),
    ("loudness_sma3", Descriptor::Loudness),
];

/// Mean and coefficient of variation over every frame
const ALL_FRAMES: [(&str, Descriptor); 5] = [
    ("spectralFlux_sma3", Descriptor::SpectralFlux),
    ("mfcc1_sma3", Descriptor::Mfcc1),
    ("mfcc2_sma3", Descriptor::Mfcc2),
    ("mfcc3_sma3", Descriptor::Mfcc3),
    ("mfcc4_sma3", Descriptor::Mfcc4),
];

/// Mean and coefficient of variation over frames where the descriptor is defined
const DEFINED_FRAMES: [(&str, Descriptor); 14] = [
    ("jitterLocal_sma3nz", Descriptor::JitterLocal),
    ("shimmerLocaldB_sma3nz", Descriptor::ShimmerLocalDb),
    ("HNRdBACF_sma3nz", Descriptor::HnrDbAcf),
    ("logRelF0-H1-H2_sma3nz", Descriptor::LogRelF0H1H2),
    ("logRelF0-H1-A3_sma3nz", Descriptor::LogRelF0H1A3),
    ("F1frequency_sma3nz", Descriptor::F1Frequency),
    ("F1bandwidth_sma3nz", Descriptor::F1Bandwidth),
    ("F1amplitudeLogRelF0_sma3nz", Descriptor::F1Amplitude),
    ("F2frequency_sma3nz", Descriptor::F2Frequency),
    ("F2bandwidth_sma3nz", Descriptor::F2Bandwidth),
    ("F2amplitudeLogRelF0_sma3nz", Descriptor::F2Amplitude),
    ("F3frequency_sma3nz", Descriptor::F3Frequency),
    ("F3bandwidth_sma3nz", Descriptor::F3Bandwidth),
    ("F3amplitudeLogRelF0_sma3nz", Descriptor::F3Amplitude),
];

/// Voiced-frame mean/CV, with an optional unvoiced-frame mean
const VOICING_SPLIT: [(&str, Option<&str>, Descriptor); 9] = [
    ("alphaRatioV_sma3nz", Some("alphaRatioUV_sma3nz"), Descriptor::AlphaRatio),
    ("hammarbergIndexV_sma3nz", Some("hammarbergIndexUV_sma3nz"), Descriptor::HammarbergIndex),
    ("slopeV0-500_sma3nz", Some("slopeUV0-500_sma3nz"), Descriptor::Slope0To500),
    ("slopeV500-1500_sma3nz", Some("slopeUV500-1500_sma3nz"), Descriptor::Slope500To1500),
    ("spectralFluxV_sma3nz", Some("spectralFluxUV_sma3nz"), Descriptor::SpectralFlux),
    ("mfcc1V_sma3nz", None, Descriptor::Mfcc1),
    ("mfcc2V_sma3nz", None, Descriptor::Mfcc2),
    ("mfcc3V_sma3nz", None, Descriptor::Mfcc3),
    ("mfcc4V_sma3nz", None, Descriptor::Mfcc4),
];

/// Computes the feature vector from an LLD matrix
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionalAggregator;

impl FunctionalAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Summarize `matrix` into the 88 functionals
    ///
    /// # Errors
    /// `IncompleteFeatureVector` if any functional was not produced
    pub fn aggregate(&self, matrix: &LldMatrix) -> Result<FeatureVector, ExtractionError> {
        let span = tracing::debug_span!("functionals", frames = matrix.frame_count());
        let _guard = span.enter();

        let mut builder = FeatureVectorBuilder::new();
        let times = matrix.frame_times();

        for (base, descriptor) in FULL_SET {
            let series = &matrix.series(descriptor).values;
            let segments = if descriptor == Descriptor::F0Semitone {
                stats::defined_segments(times, &stats::smooth_sma3_nz(series))
            } else {
                vec![Segment {
                    times: times.to_vec(),
                    values: stats::smooth_sma3(&matrix.series(descriptor).dense()),
                }]
            };
            full_set(&mut builder, base, &segments);
        }

        for (base, descriptor) in ALL_FRAMES {
            let smoothed = stats::smooth_sma3(&matrix.series(descriptor).dense());
            mean_and_cv(&mut builder, base, &smoothed);
        }

        for (base, descriptor) in DEFINED_FRAMES {
            let defined = defined_values(&stats::smooth_sma3_nz(&matrix.series(descriptor).values));
            mean_and_cv(&mut builder, base, &defined);
        }

        for (voiced_base, unvoiced_base, descriptor) in VOICING_SPLIT {
            let series = &matrix.series(descriptor).values;
            let voiced = masked(series, matrix.voiced(), true);
            mean_and_cv(&mut builder, voiced_base, &defined_values(&stats::smooth_sma3_nz(&voiced)));

            if let Some(unvoiced_base) = unvoiced_base {
                let unvoiced = masked(series, matrix.voiced(), false);
                let values = defined_values(&stats::smooth_sma3_nz(&unvoiced));
                builder.set(&format!("{}_amean", unvoiced_base), stats::mean(&values).into());
            }
        }

        temporal(&mut builder, matrix);

        builder.build()
    }
}

fn defined_values(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Keep values on frames whose voicing equals `keep`
fn masked(values: &[Option<f64>], voiced: &[bool], keep: bool) -> Vec<Option<f64>> {
    values
        .iter()
        .zip(voiced)
        .map(|(v, &is_voiced)| if is_voiced == keep { *v } else { None })
        .collect()
}

fn mean_and_cv(builder: &mut FeatureVectorBuilder, base: &str, values: &[f64]) {
    builder.set(&format!("{}_amean", base), stats::mean(values).into());
    builder.set(&format!("{}_stddevNorm", base), stats::stddev_norm(values).into());
}

fn full_set(builder: &mut FeatureVectorBuilder, base: &str, segments: &[Segment]) {
    let values: Vec<f64> = segments.iter().flat_map(|s| s.values.iter().copied()).collect();
    mean_and_cv(builder, base, &values);

    let p20 = stats::percentile(&values, 20.0);
    let p80 = stats::percentile(&values, 80.0);
    builder.set(&format!("{}_percentile20.0", base), p20.into());
    builder.set(&format!("{}_percentile50.0", base), stats::percentile(&values, 50.0).into());
    builder.set(&format!("{}_percentile80.0", base), p80.into());
    let range = p20.zip(p80).map(|(low, high)| high - low);
    builder.set(&format!("{}_pctlrange0-2", base), range.into());

    let runs = stats::slope_runs(segments);
    builder.set(&format!("{}_meanRisingSlope", base), stats::mean(&runs.rising).into());
    builder.set(&format!("{}_stddevRisingSlope", base), stats::stddev(&runs.rising).into());
    builder.set(&format!("{}_meanFallingSlope", base), stats::mean(&runs.falling).into());
    builder.set(&format!("{}_stddevFallingSlope", base), stats::stddev(&runs.falling).into());
}

/// Rate and segment-length features plus the equivalent sound level
fn temporal(builder: &mut FeatureVectorBuilder, matrix: &LldMatrix) {
    let duration = matrix.duration_secs();
    let per_second = |count: usize| {
        if duration > 0.0 {
            FeatureValue::Measured(count as f64 / duration)
        } else {
            FeatureValue::Undefined
        }
    };

    let loudness = stats::smooth_sma3(&matrix.series(Descriptor::Loudness).dense());
    builder.set("loudnessPeaksPerSec", per_second(stats::count_peaks(&loudness)));

    let runs = stats::flag_runs(matrix.voiced());
    let lengths = |voiced: bool| -> Vec<f64> {
        runs.iter()
            .filter(|(flag, _)| *flag == voiced)
            .map(|(_, frames)| *frames as f64 * matrix.hop_secs())
            .collect()
    };
    let voiced_lengths = lengths(true);
    let unvoiced_lengths = lengths(false);

    builder.set("VoicedSegmentsPerSec", per_second(voiced_lengths.len()));
    builder.set("MeanVoicedSegmentLengthSec", stats::mean(&voiced_lengths).into());
    builder.set("StddevVoicedSegmentLengthSec", stats::stddev(&voiced_lengths).into());
    builder.set("MeanUnvoicedSegmentLength", stats::mean(&unvoiced_lengths).into());
    builder.set("StddevUnvoicedSegmentLength", stats::stddev(&unvoiced_lengths).into());

    let level = stats::equivalent_sound_level(&matrix.series(Descriptor::RmsEnergy).dense());
    builder.set("equivalentSoundLevel_dBp", FeatureValue::Measured(level));
}
