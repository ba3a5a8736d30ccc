//! Read-only data prepared by `Engine::initialize`.
//!
//! Validates the configuration and the feature name table, and precomputes
//! the filterbank tables for the common sample rates. Signals at other rates
//! get their tables built on demand during extraction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::analysis::lld::SpectralTables;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::feature_set::validate_feature_names;

/// Sample rates whose tables are built up front
pub const STANDARD_SAMPLE_RATES: [u32; 6] = [8_000, 16_000, 22_050, 32_000, 44_100, 48_000];

/// Immutable assets shared by every analysis call
#[derive(Debug)]
pub struct EngineAssets {
    tables: HashMap<u32, Arc<SpectralTables>>,
}

impl EngineAssets {
    /// Validate `config` and build all tables
    ///
    /// # Errors
    /// `InitializationFailure` naming the first table or setting that failed
    pub fn load(config: &EngineConfig) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|reason| EngineError::InitializationFailure {
                reason: format!("invalid configuration: {}", reason),
            })?;

        validate_feature_names().map_err(|reason| EngineError::InitializationFailure { reason })?;

        let mut tables = HashMap::new();
        for rate in STANDARD_SAMPLE_RATES
            .iter()
            .copied()
            .filter(|rate| (config.limits.min_sample_rate..=config.limits.max_sample_rate).contains(rate))
        {
            let table = SpectralTables::for_config(config, rate);
            table
                .validate()
                .map_err(|reason| EngineError::InitializationFailure { reason })?;
            tables.insert(rate, Arc::new(table));
        }

        log::info!(
            "[Engine] Assets ready: {} filterbank table set(s) for rates {:?}",
            tables.len(),
            {
                let mut rates: Vec<_> = tables.keys().copied().collect();
                rates.sort_unstable();
                rates
            }
        );

        Ok(Self { tables })
    }

    /// Tables for `sample_rate`, building them if the rate is not precomputed
    pub fn tables_for(&self, config: &EngineConfig, sample_rate: u32) -> Arc<SpectralTables> {
        match self.tables.get(&sample_rate) {
            Some(tables) => Arc::clone(tables),
            None => Arc::new(SpectralTables::for_config(config, sample_rate)),
        }
    }

    pub fn precomputed_rates(&self) -> Vec<u32> {
        let mut rates: Vec<u32> = self.tables.keys().copied().collect();
        rates.sort_unstable();
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads_all_standard_rates() {
        let assets = EngineAssets::load(&EngineConfig::default()).unwrap();
        assert_eq!(assets.precomputed_rates(), STANDARD_SAMPLE_RATES.to_vec());
    }

    #[test]
    fn test_invalid_config_fails_to_load() {
        let mut config = EngineConfig::default();
        config.pitch.f0_min_hz = 2_000.0;
        match EngineAssets::load(&config) {
            Err(EngineError::InitializationFailure { reason }) => {
                assert!(reason.contains("invalid configuration"))
            }
            other => panic!("Expected InitializationFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_unlisted_rate_is_built_on_demand() {
        let config = EngineConfig::default();
        let assets = EngineAssets::load(&config).unwrap();
        let tables = assets.tables_for(&config, 11_025);
        assert_eq!(tables.sample_rate(), 11_025);
        assert!(tables.validate().is_ok());
    }
}
