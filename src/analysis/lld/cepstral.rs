// Cepstral module - mel-frequency cepstral coefficients
//
// Power spectrum -> 26 mel band energies -> natural log -> DCT-II ->
// sinusoidal liftering. Only the low coefficients 1-4 are kept; they
// describe the coarse spectral envelope.

use super::filterbank::{FilterBank, FrequencyScale};

pub const MEL_BANDS: usize = 26;
pub const LIFTER: f64 = 22.0;
/// Number of coefficients kept after c0
pub const NUM_COEFFICIENTS: usize = 4;

const LOW_EDGE_HZ: f64 = 20.0;
const HIGH_EDGE_HZ: f64 = 8000.0;
const ENERGY_FLOOR: f64 = 1e-10;

/// Mel filterbank with a precomputed DCT basis
#[derive(Debug, Clone, PartialEq)]
pub struct MfccModel {
    bank: FilterBank,
    /// `[NUM_COEFFICIENTS][MEL_BANDS]`, liftering folded in
    basis: Vec<Vec<f64>>,
}

impl MfccModel {
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        let high = HIGH_EDGE_HZ.min(f64::from(sample_rate) / 2.0);
        let bank = FilterBank::new(FrequencyScale::Mel, MEL_BANDS, fft_size, sample_rate, LOW_EDGE_HZ, high);

        let m = MEL_BANDS as f64;
        let norm = (2.0 / m).sqrt();
        let basis = (1..=NUM_COEFFICIENTS)
            .map(|n| {
                let lift = 1.0 + LIFTER / 2.0 * (std::f64::consts::PI * n as f64 / LIFTER).sin();
                (0..MEL_BANDS)
                    .map(|j| {
                        norm * lift * (std::f64::consts::PI * n as f64 * (j as f64 + 0.5) / m).cos()
                    })
                    .collect()
            })
            .collect();

        Self { bank, basis }
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn is_well_formed(&self) -> bool {
        self.bank.is_well_formed()
    }

    /// Coefficients 1..=4 of one frame's power spectrum
    pub fn coefficients(&self, power: &[f64]) -> [f64; NUM_COEFFICIENTS] {
        let log_energies: Vec<f64> = self
            .bank
            .apply(power)
            .into_iter()
            .map(|e| e.max(ENERGY_FLOOR).ln())
            .collect();

        let mut out = [0.0; NUM_COEFFICIENTS];
        for (slot, row) in out.iter_mut().zip(&self.basis) {
            *slot = row.iter().zip(&log_energies).map(|(b, e)| b * e).sum();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_log_spectrum_has_near_zero_cepstrum() {
        let model = MfccModel::new(512, 16_000);
        let coefficients = model.coefficients(&vec![0.0; 257]);
        for c in coefficients {
            assert!(c.abs() < 1e-9, "coefficient {}", c);
        }
    }

    #[test]
    fn test_tilted_spectrum_gives_positive_c1() {
        let model = MfccModel::new(512, 16_000);
        // Energy falling with frequency
        let power: Vec<f64> = (0..257).map(|k| 1.0 / (1.0 + k as f64)).collect();
        let coefficients = model.coefficients(&power);
        assert!(coefficients[0] > 0.0, "c1 {}", coefficients[0]);
    }

    #[test]
    fn test_coefficients_are_deterministic() {
        let model = MfccModel::new(1024, 44_100);
        let power: Vec<f64> = (0..513).map(|k| ((k % 17) as f64 + 1.0) * 1e-3).collect();
        assert_eq!(model.coefficients(&power), model.coefficients(&power));
    }
}
