// Spectral module - band energy balance, slopes, flux and harmonic levels
//
// All functions operate on one frame's power spectrum (|X[k]|² for the
// positive bins) together with the bin width in Hz. Ratios are expressed in
// dB; empty bands are floored instead of producing infinities so every
// descriptor stays finite on silence.

/// Power floor used before taking logarithms
pub const POWER_FLOOR: f64 = 1e-12;

/// Alpha ratio bands in Hz
const ALPHA_LOW: (f64, f64) = (50.0, 1000.0);
const ALPHA_HIGH: (f64, f64) = (1000.0, 5000.0);

/// Hammarberg index bands in Hz
const HAMMARBERG_LOW: (f64, f64) = (0.0, 2000.0);
const HAMMARBERG_HIGH: (f64, f64) = (2000.0, 5000.0);

fn power_db(power: f64) -> f64 {
    10.0 * power.max(POWER_FLOOR).log10()
}

/// Inclusive bin range covering [low_hz, high_hz], clipped to the spectrum
fn band_bins(spectrum_len: usize, bin_width: f64, low_hz: f64, high_hz: f64) -> Option<(usize, usize)> {
    if spectrum_len == 0 || bin_width <= 0.0 {
        return None;
    }
    let first = (low_hz / bin_width).ceil().max(0.0) as usize;
    let last = ((high_hz / bin_width).floor() as usize).min(spectrum_len - 1);
    (first <= last).then_some((first, last))
}

fn band_energy(power: &[f64], bin_width: f64, band: (f64, f64)) -> f64 {
    band_bins(power.len(), bin_width, band.0, band.1)
        .map(|(first, last)| power[first..=last].iter().sum())
        .unwrap_or(0.0)
}

fn band_peak(power: &[f64], bin_width: f64, band: (f64, f64)) -> f64 {
    band_bins(power.len(), bin_width, band.0, band.1)
        .map(|(first, last)| power[first..=last].iter().copied().fold(0.0, f64::max))
        .unwrap_or(0.0)
}

/// Ratio of energy above 1 kHz (to 5 kHz) to energy in 50 Hz-1 kHz, in dB
///
/// Negative values mean the low band dominates.
pub fn alpha_ratio(power: &[f64], bin_width: f64) -> f64 {
    power_db(band_energy(power, bin_width, ALPHA_HIGH)) - power_db(band_energy(power, bin_width, ALPHA_LOW))
}

/// Strongest peak in 0-2 kHz relative to the strongest peak in 2-5 kHz, in dB
pub fn hammarberg_index(power: &[f64], bin_width: f64) -> f64 {
    power_db(band_peak(power, bin_width, HAMMARBERG_LOW)) - power_db(band_peak(power, bin_width, HAMMARBERG_HIGH))
}

/// Least-squares slope of the dB spectrum over [low_hz, high_hz], in dB/Hz
///
/// Returns 0.0 when the band holds fewer than two bins.
pub fn spectral_slope(power: &[f64], bin_width: f64, low_hz: f64, high_hz: f64) -> f64 {
    let Some((first, last)) = band_bins(power.len(), bin_width, low_hz, high_hz) else {
        return 0.0;
    };
    if last <= first {
        return 0.0;
    }

    let n = (last - first + 1) as f64;
    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
    for (k, &p) in power.iter().enumerate().take(last + 1).skip(first) {
        let x = k as f64 * bin_width;
        let y = power_db(p);
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < 1e-12 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Magnitude spectrum scaled to unit sum
///
/// A silent frame yields all zeros.
pub fn normalized_magnitudes(power: &[f64]) -> Vec<f64> {
    let magnitudes: Vec<f64> = power.iter().map(|p| p.max(0.0).sqrt()).collect();
    let total: f64 = magnitudes.iter().sum();
    if total <= 0.0 {
        return vec![0.0; magnitudes.len()];
    }
    magnitudes.iter().map(|m| m / total).collect()
}

/// Squared difference between consecutive normalized magnitude spectra
///
/// The first frame has no predecessor and a flux of 0.0.
pub fn spectral_flux(current: &[f64], previous: Option<&[f64]>) -> f64 {
    match previous {
        Some(previous) => current
            .iter()
            .zip(previous)
            .map(|(c, p)| (c - p) * (c - p))
            .sum(),
        None => 0.0,
    }
}

/// Level in dB of the strongest bin within ±`search_hz` of `target_hz`
///
/// Returns `None` if the search range lies outside the spectrum.
pub fn harmonic_level_db(power: &[f64], bin_width: f64, target_hz: f64, search_hz: f64) -> Option<f64> {
    if target_hz <= 0.0 {
        return None;
    }
    let (first, last) = band_bins(power.len(), bin_width, (target_hz - search_hz).max(0.0), target_hz + search_hz)?;
    let peak = power[first..=last].iter().copied().fold(0.0, f64::max);
    Some(power_db(peak))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat spectrum with one boosted region
    fn spectrum_with_peak(len: usize, bin_width: f64, peak_hz: f64, level: f64) -> Vec<f64> {
        (0..len)
            .map(|k| {
                if ((k as f64 * bin_width) - peak_hz).abs() < bin_width {
                    level
                } else {
                    1e-6
                }
            })
            .collect()
    }

    #[test]
    fn test_alpha_ratio_sign_follows_energy_balance() {
        let bin_width = 15.625;
        let low_heavy = spectrum_with_peak(257, bin_width, 300.0, 1.0);
        let high_heavy = spectrum_with_peak(257, bin_width, 3000.0, 1.0);
        assert!(alpha_ratio(&low_heavy, bin_width) < -20.0);
        assert!(alpha_ratio(&high_heavy, bin_width) > 20.0);
    }

    #[test]
    fn test_hammarberg_index() {
        let bin_width = 15.625;
        let mut power = vec![1e-6; 257];
        power[64] = 1.0; // 1 kHz
        power[192] = 0.01; // 3 kHz
        let index = hammarberg_index(&power, bin_width);
        assert!((index - 20.0).abs() < 1e-9, "index {}", index);
    }

    #[test]
    fn test_slope_of_tilted_spectrum() {
        let bin_width = 10.0;
        // -6 dB per 100 Hz
        let power: Vec<f64> = (0..200)
            .map(|k| 10f64.powf(-0.06 * k as f64 * bin_width / 10.0))
            .collect();
        let slope = spectral_slope(&power, bin_width, 0.0, 500.0);
        assert!((slope + 0.06).abs() < 1e-9, "slope {}", slope);
    }

    #[test]
    fn test_silence_descriptors_are_finite() {
        let power = vec![0.0; 257];
        let bin_width = 31.25;
        assert_eq!(alpha_ratio(&power, bin_width), 0.0);
        assert_eq!(hammarberg_index(&power, bin_width), 0.0);
        assert!(spectral_slope(&power, bin_width, 0.0, 500.0).abs() < 1e-9);
        assert!(normalized_magnitudes(&power).iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_flux_of_identical_frames_is_zero() {
        let frame = normalized_magnitudes(&[1.0, 4.0, 9.0]);
        assert_eq!(spectral_flux(&frame, None), 0.0);
        assert_eq!(spectral_flux(&frame, Some(&frame)), 0.0);

        let other = normalized_magnitudes(&[9.0, 4.0, 1.0]);
        assert!(spectral_flux(&frame, Some(&other)) > 0.0);
    }

    #[test]
    fn test_harmonic_level_finds_peak() {
        let bin_width = 5.0;
        let power = spectrum_with_peak(1000, bin_width, 440.0, 100.0);
        let level = harmonic_level_db(&power, bin_width, 445.0, 20.0).unwrap();
        assert!((level - 20.0).abs() < 1e-9);
        assert!(harmonic_level_db(&power, bin_width, 10_000.0, 20.0).is_none());
    }
}
