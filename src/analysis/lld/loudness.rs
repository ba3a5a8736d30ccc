// Loudness module - perceptual loudness and signal level
//
// Loudness follows the auditory-spectrum approach: power is integrated in
// Bark-spaced critical bands, each band is weighted by an equal-loudness
// curve, compressed with the cube-root-like power law (exponent 0.33) and
// summed over bands.
//
// References:
// - Hermansky, H. (1990). Perceptual linear predictive (PLP) analysis of speech.

use super::filterbank::{FilterBank, FrequencyScale};

/// Intensity-to-loudness power law exponent
pub const LOUDNESS_EXPONENT: f64 = 0.33;

/// Number of critical bands
pub const BARK_BANDS: usize = 26;

/// Lowest band edge in Hz
const LOW_EDGE_HZ: f64 = 20.0;

/// Highest band edge in Hz (further capped by Nyquist)
const HIGH_EDGE_HZ: f64 = 8000.0;

/// Equal-loudness weight for a frequency in Hz (Hermansky 1990)
pub fn equal_loudness_weight(frequency_hz: f64) -> f64 {
    let w2 = (2.0 * std::f64::consts::PI * frequency_hz).powi(2);
    let numerator = (w2 + 56.8e6) * w2 * w2;
    let denominator = (w2 + 6.3e6).powi(2) * (w2 + 0.38e9);
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Bark filterbank paired with per-band equal-loudness weights
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessModel {
    bank: FilterBank,
    weights: Vec<f64>,
}

impl LoudnessModel {
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        let high = HIGH_EDGE_HZ.min(f64::from(sample_rate) / 2.0);
        let bank = FilterBank::new(FrequencyScale::Bark, BARK_BANDS, fft_size, sample_rate, LOW_EDGE_HZ, high);
        let weights = bank.centers_hz().iter().map(|&f| equal_loudness_weight(f)).collect();
        Self { bank, weights }
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn is_well_formed(&self) -> bool {
        self.bank.is_well_formed() && self.weights.iter().all(|w| w.is_finite() && *w > 0.0)
    }

    /// Loudness of one frame from its (window-normalized) power spectrum
    pub fn loudness(&self, power: &[f64]) -> f64 {
        self.bank
            .apply(power)
            .iter()
            .zip(&self.weights)
            .map(|(energy, weight)| (energy * weight).max(0.0).powf(LOUDNESS_EXPONENT))
            .sum()
    }
}

/// Root mean square of raw samples
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fft::FftProcessor;
    use crate::analysis::windower::WindowShape;

    fn power_of_sine(amplitude: f64, frequency: f64) -> Vec<f64> {
        let window = WindowShape::Hamming.coefficients(400);
        let energy: f64 = window.iter().map(|w| w * w).sum();
        let frame: Vec<f64> = (0..400)
            .map(|i| amplitude * (2.0 * std::f64::consts::PI * frequency * i as f64 / 16_000.0).sin() * window[i])
            .collect();
        FftProcessor::for_window(400)
            .power_spectrum(&frame)
            .into_iter()
            .map(|p| p / energy)
            .collect()
    }

    #[test]
    fn test_equal_loudness_peaks_in_speech_range() {
        assert!(equal_loudness_weight(100.0) < equal_loudness_weight(1000.0));
        assert!(equal_loudness_weight(1000.0) < equal_loudness_weight(3000.0));
        assert_eq!(equal_loudness_weight(0.0), 0.0);
    }

    #[test]
    fn test_louder_sine_is_louder() {
        let model = LoudnessModel::new(512, 16_000);
        assert!(model.is_well_formed());
        let quiet = model.loudness(&power_of_sine(0.1, 440.0));
        let loud = model.loudness(&power_of_sine(0.8, 440.0));
        assert!(loud > quiet);
        // Power law: 8x amplitude is 64x power, 64^0.33 ≈ 3.95x loudness
        assert!((loud / quiet - 64f64.powf(LOUDNESS_EXPONENT)).abs() < 0.01);
    }

    #[test]
    fn test_silence_has_zero_loudness() {
        let model = LoudnessModel::new(512, 16_000);
        assert_eq!(model.loudness(&vec![0.0; 257]), 0.0);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-12);
    }
}
