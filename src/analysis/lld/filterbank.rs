//! Triangular filterbanks on perceptual frequency scales.
//!
//! Filters are spaced uniformly on the chosen scale and weighted by each
//! bin's exact position on that scale, so narrow low-frequency filters never
//! collapse to zero width at small FFT sizes.

/// Perceptual frequency scale used to space filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyScale {
    /// HTK mel scale
    Mel,
    /// Bark scale (Traunmüller/Hermansky form, 6·asinh(f/600))
    Bark,
}

impl FrequencyScale {
    pub fn from_hz(&self, hz: f64) -> f64 {
        match self {
            FrequencyScale::Mel => 2595.0 * (1.0 + hz / 700.0).log10(),
            FrequencyScale::Bark => 6.0 * (hz / 600.0).asinh(),
        }
    }

    pub fn to_hz(&self, value: f64) -> f64 {
        match self {
            FrequencyScale::Mel => 700.0 * (10f64.powf(value / 2595.0) - 1.0),
            FrequencyScale::Bark => 600.0 * (value / 6.0).sinh(),
        }
    }
}

/// Bank of triangular filters over the positive bins of one FFT size
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    /// `[num_filters][fft_size / 2 + 1]`
    filters: Vec<Vec<f64>>,
    centers_hz: Vec<f64>,
}

impl FilterBank {
    /// Build `num_filters` filters between `low_hz` and `high_hz`
    pub fn new(
        scale: FrequencyScale,
        num_filters: usize,
        fft_size: usize,
        sample_rate: u32,
        low_hz: f64,
        high_hz: f64,
    ) -> Self {
        let bins = fft_size / 2 + 1;
        let bin_width = f64::from(sample_rate) / fft_size as f64;
        let low = scale.from_hz(low_hz);
        let high = scale.from_hz(high_hz);
        let step = (high - low) / (num_filters + 1) as f64;
        let points: Vec<f64> = (0..num_filters + 2).map(|i| low + i as f64 * step).collect();

        let bin_positions: Vec<f64> = (0..bins).map(|k| scale.from_hz(k as f64 * bin_width)).collect();

        let filters = (0..num_filters)
            .map(|m| {
                let (left, center, right) = (points[m], points[m + 1], points[m + 2]);
                bin_positions
                    .iter()
                    .map(|&position| {
                        if position <= left || position >= right {
                            0.0
                        } else if position <= center {
                            (position - left) / (center - left)
                        } else {
                            (right - position) / (right - center)
                        }
                    })
                    .collect()
            })
            .collect();

        let centers_hz = (0..num_filters).map(|m| scale.to_hz(points[m + 1])).collect();

        Self { filters, centers_hz }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of spectrum bins each filter expects
    pub fn bins(&self) -> usize {
        self.filters.first().map(Vec::len).unwrap_or(0)
    }

    /// Centre frequency of every filter in Hz
    pub fn centers_hz(&self) -> &[f64] {
        &self.centers_hz
    }

    /// Weighted band energies of a power spectrum
    pub fn apply(&self, power: &[f64]) -> Vec<f64> {
        self.filters
            .iter()
            .map(|filter| filter.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }

    /// True when every filter covers at least one bin and all weights are finite
    pub fn is_well_formed(&self) -> bool {
        !self.filters.is_empty()
            && self.filters.iter().all(|filter| {
                filter.iter().all(|w| w.is_finite() && *w >= 0.0) && filter.iter().any(|&w| w > 0.0)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_roundtrip() {
        for scale in [FrequencyScale::Mel, FrequencyScale::Bark] {
            for hz in [0.0, 100.0, 440.0, 1000.0, 4000.0, 8000.0] {
                let back = scale.to_hz(scale.from_hz(hz));
                assert!((hz - back).abs() < 1e-6, "{:?} roundtrip failed for {} Hz", scale, hz);
            }
        }
    }

    #[test]
    fn test_mel_bank_shape() {
        let bank = FilterBank::new(FrequencyScale::Mel, 26, 512, 16_000, 20.0, 8_000.0);
        assert_eq!(bank.len(), 26);
        assert_eq!(bank.bins(), 257);
        assert!(bank.is_well_formed());
        assert!(bank.centers_hz().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_small_fft_keeps_every_band_populated() {
        let bank = FilterBank::new(FrequencyScale::Bark, 26, 256, 8_000, 20.0, 4_000.0);
        assert!(bank.is_well_formed());
    }

    #[test]
    fn test_apply_on_flat_spectrum() {
        let bank = FilterBank::new(FrequencyScale::Mel, 10, 512, 16_000, 20.0, 8_000.0);
        let energies = bank.apply(&vec![1.0; 257]);
        assert_eq!(energies.len(), 10);
        // Higher mel filters span more bins
        assert!(energies[9] > energies[0]);
    }
}
