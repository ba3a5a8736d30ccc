//! The 88-entry eGeMAPSv02 feature vector
//!
//! Names and order are fixed and part of the public contract: downstream
//! consumers index vectors positionally and compare across recordings.

use once_cell::sync::Lazy;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ExtractionError;

/// Number of functionals in the feature set
pub const FEATURE_COUNT: usize = 88;

/// Canonical feature names in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "F0semitoneFrom27.5Hz_sma3nz_amean",
    "F0semitoneFrom27.5Hz_sma3nz_stddevNorm",
    "F0semitoneFrom27.5Hz_sma3nz_percentile20.0",
    "F0semitoneFrom27.5Hz_sma3nz_percentile50.0",
    "F0semitoneFrom27.5Hz_sma3nz_percentile80.0",
    "F0semitoneFrom27.5Hz_sma3nz_pctlrange0-2",
    "F0semitoneFrom27.5Hz_sma3nz_meanRisingSlope",
    "F0semitoneFrom27.5Hz_sma3nz_stddevRisingSlope",
    "F0semitoneFrom27.5Hz_sma3nz_meanFallingSlope",
    "F0semitoneFrom27.5Hz_sma3nz_stddevFallingSlope",
    "loudness_sma3_amean",
    "loudness_sma3_stddevNorm",
    "loudness_sma3_percentile20.0",
    "loudness_sma3_percentile50.0",
    "loudness_sma3_percentile80.0",
    "loudness_sma3_pctlrange0-2",
    "loudness_sma3_meanRisingSlope",
    "loudness_sma3_stddevRisingSlope",
    "loudness_sma3_meanFallingSlope",
    "loudness_sma3_stddevFallingSlope",
    "spectralFlux_sma3_amean",
    "spectralFlux_sma3_stddevNorm",
    "mfcc1_sma3_amean",
    "mfcc1_sma3_stddevNorm",
    "mfcc2_sma3_amean",
    "mfcc2_sma3_stddevNorm",
    "mfcc3_sma3_amean",
    "mfcc3_sma3_stddevNorm",
    "mfcc4_sma3_amean",
    "mfcc4_sma3_stddevNorm",
    "jitterLocal_sma3nz_amean",
    "jitterLocal_sma3nz_stddevNorm",
    "shimmerLocaldB_sma3nz_amean",
    "shimmerLocaldB_sma3nz_stddevNorm",
    "HNRdBACF_sma3nz_amean",
    "HNRdBACF_sma3nz_stddevNorm",
    "logRelF0-H1-H2_sma3nz_amean",
    "logRelF0-H1-H2_sma3nz_stddevNorm",
    "logRelF0-H1-A3_sma3nz_amean",
    "logRelF0-H1-A3_sma3nz_stddevNorm",
    "F1frequency_sma3nz_amean",
    "F1frequency_sma3nz_stddevNorm",
    "F1bandwidth_sma3nz_amean",
    "F1bandwidth_sma3nz_stddevNorm",
    "F1amplitudeLogRelF0_sma3nz_amean",
    "F1amplitudeLogRelF0_sma3nz_stddevNorm",
    "F2frequency_sma3nz_amean",
    "F2frequency_sma3nz_stddevNorm",
    "F2bandwidth_sma3nz_amean",
    "F2bandwidth_sma3nz_stddevNorm",
    "F2amplitudeLogRelF0_sma3nz_amean",
    "F2amplitudeLogRelF0_sma3nz_stddevNorm",
    "F3frequency_sma3nz_amean",
    "F3frequency_sma3nz_stddevNorm",
    "F3bandwidth_sma3nz_amean",
    "F3bandwidth_sma3nz_stddevNorm",
    "F3amplitudeLogRelF0_sma3nz_amean",
    "F3amplitudeLogRelF0_sma3nz_stddevNorm",
    "alphaRatioV_sma3nz_amean",
    "alphaRatioV_sma3nz_stddevNorm",
    "hammarbergIndexV_sma3nz_amean",
    "hammarbergIndexV_sma3nz_stddevNorm",
    "slopeV0-500_sma3nz_amean",
    "slopeV0-500_sma3nz_stddevNorm",
    "slopeV500-1500_sma3nz_amean",
    "slopeV500-1500_sma3nz_stddevNorm",
    "spectralFluxV_sma3nz_amean",
    "spectralFluxV_sma3nz_stddevNorm",
    "mfcc1V_sma3nz_amean",
    "mfcc1V_sma3nz_stddevNorm",
    "mfcc2V_sma3nz_amean",
    "mfcc2V_sma3nz_stddevNorm",
    "mfcc3V_sma3nz_amean",
    "mfcc3V_sma3nz_stddevNorm",
    "mfcc4V_sma3nz_amean",
    "mfcc4V_sma3nz_stddevNorm",
    "alphaRatioUV_sma3nz_amean",
    "hammarbergIndexUV_sma3nz_amean",
    "slopeUV0-500_sma3nz_amean",
    "slopeUV500-1500_sma3nz_amean",
    "spectralFluxUV_sma3nz_amean",
    "loudnessPeaksPerSec",
    "VoicedSegmentsPerSec",
    "MeanVoicedSegmentLengthSec",
    "StddevVoicedSegmentLengthSec",
    "MeanUnvoicedSegmentLength",
    "StddevUnvoicedSegmentLength",
    "equivalentSoundLevel_dBp",
];

static NAME_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i))
        .collect()
});

/// Position of `name` in the vector
pub fn feature_index(name: &str) -> Option<usize> {
    NAME_INDEX.get(name).copied()
}

/// Check the name table: right length, no duplicates, no empty names
pub fn validate_feature_names() -> Result<(), String> {
    if NAME_INDEX.len() != FEATURE_COUNT {
        return Err(format!(
            "feature name table has {} unique names, expected {}",
            NAME_INDEX.len(),
            FEATURE_COUNT
        ));
    }
    if let Some(name) = FEATURE_NAMES.iter().find(|n| n.trim().is_empty()) {
        return Err(format!("feature name table contains an empty name {:?}", name));
    }
    Ok(())
}

/// One functional value
///
/// `Undefined` marks a functional whose scope was empty (e.g. voiced-only
/// statistics of a signal without voiced frames). It serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Measured(f64),
    Undefined,
}

impl FeatureValue {
    pub fn is_defined(&self) -> bool {
        matches!(self, FeatureValue::Measured(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            FeatureValue::Measured(v) => Some(*v),
            FeatureValue::Undefined => None,
        }
    }

    /// The measured value, or `sentinel` when undefined
    pub fn or_sentinel(&self, sentinel: f64) -> f64 {
        self.value().unwrap_or(sentinel)
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => FeatureValue::Measured(v),
            None => FeatureValue::Undefined,
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Measured(v) => serializer.serialize_f64(*v),
            FeatureValue::Undefined => serializer.serialize_none(),
        }
    }
}

/// Complete, ordered feature vector
///
/// Only `FeatureVectorBuilder::build` creates one, so every slot is filled.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<FeatureValue>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names() -> &'static [&'static str; FEATURE_COUNT] {
        &FEATURE_NAMES
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// Value by canonical name
    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        feature_index(name).map(|i| self.values[i])
    }

    /// (name, value) pairs in vector order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FeatureValue)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Plain numeric export with `sentinel` in place of undefined values
    pub fn to_flat(&self, sentinel: f64) -> Vec<f64> {
        self.values.iter().map(|v| v.or_sentinel(sentinel)).collect()
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_defined()).count()
    }
}

/// Serialized as an ordered JSON object keyed by feature name
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Collects functionals by name and checks completeness
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    slots: Vec<Option<FeatureValue>>,
    unknown: Vec<String>,
}

impl Default for FeatureVectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureVectorBuilder {
    pub fn new() -> Self {
        Self {
            slots: vec![None; FEATURE_COUNT],
            unknown: Vec::new(),
        }
    }

    /// Record a functional; unknown names are reported by `build`
    pub fn set(&mut self, name: &str, value: FeatureValue) -> &mut Self {
        match feature_index(name) {
            Some(i) => self.slots[i] = Some(value),
            None => self.unknown.push(name.to_string()),
        }
        self
    }

    /// Finish the vector
    ///
    /// # Errors
    /// - `IncompleteFeatureVector` listing every unset slot and every unknown
    ///   name that was set
    /// - `NonFiniteFeature` for the first slot measured as NaN or infinity
    pub fn build(self) -> Result<FeatureVector, ExtractionError> {
        let mut missing: Vec<String> = self
            .slots
            .iter()
            .zip(FEATURE_NAMES)
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, name)| name.to_string())
            .collect();
        missing.extend(self.unknown);
        if !missing.is_empty() {
            return Err(ExtractionError::IncompleteFeatureVector { missing });
        }

        let non_finite = self
            .slots
            .iter()
            .zip(FEATURE_NAMES)
            .find(|(slot, _)| matches!(slot, Some(FeatureValue::Measured(v)) if !v.is_finite()));
        if let Some((_, name)) = non_finite {
            return Err(ExtractionError::NonFiniteFeature {
                name: name.to_string(),
            });
        }

        Ok(FeatureVector {
            values: self.slots.into_iter().flatten().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_builder() -> FeatureVectorBuilder {
        let mut builder = FeatureVectorBuilder::new();
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            builder.set(name, FeatureValue::Measured(i as f64));
        }
        builder
    }

    #[test]
    fn test_name_table_is_valid() {
        assert_eq!(FEATURE_NAMES.len(), 88);
        assert!(validate_feature_names().is_ok());
        assert_eq!(feature_index("F0semitoneFrom27.5Hz_sma3nz_amean"), Some(0));
        assert_eq!(feature_index("equivalentSoundLevel_dBp"), Some(87));
        assert_eq!(feature_index("nope"), None);
    }

    #[test]
    fn test_builder_produces_ordered_vector() {
        let vector = full_builder().build().unwrap();
        assert_eq!(vector.len(), 88);
        assert_eq!(vector.get("loudness_sma3_amean"), Some(FeatureValue::Measured(10.0)));
        let flat = vector.to_flat(-1.0);
        assert_eq!(flat[87], 87.0);
    }

    #[test]
    fn test_builder_reports_missing_slots() {
        let mut builder = FeatureVectorBuilder::new();
        builder.set("loudness_sma3_amean", FeatureValue::Measured(1.0));
        match builder.build() {
            Err(ExtractionError::IncompleteFeatureVector { missing }) => {
                assert_eq!(missing.len(), 87);
                assert!(!missing.iter().any(|m| m == "loudness_sma3_amean"));
            }
            other => panic!("Expected IncompleteFeatureVector, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_reports_unknown_names() {
        let mut builder = full_builder();
        builder.set("not_a_feature", FeatureValue::Undefined);
        match builder.build() {
            Err(ExtractionError::IncompleteFeatureVector { missing }) => {
                assert_eq!(missing, vec!["not_a_feature".to_string()]);
            }
            other => panic!("Expected IncompleteFeatureVector, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_non_finite_values() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut builder = full_builder();
            builder.set("HNRdBACF_sma3nz_amean", FeatureValue::Measured(bad));
            assert_eq!(
                builder.build(),
                Err(ExtractionError::NonFiniteFeature {
                    name: "HNRdBACF_sma3nz_amean".to_string()
                })
            );
        }
    }

    #[test]
    fn test_undefined_serializes_as_null() {
        let mut builder = full_builder();
        builder.set("jitterLocal_sma3nz_amean", FeatureValue::Undefined);
        let vector = builder.build().unwrap();
        assert_eq!(vector.defined_count(), 87);
        assert!(vector.to_flat(f64::NAN)[30].is_nan());

        let json = serde_json::to_value(&vector).unwrap();
        assert!(json["jitterLocal_sma3nz_amean"].is_null());
        assert_eq!(json["loudness_sma3_amean"], 10.0);
    }
}
