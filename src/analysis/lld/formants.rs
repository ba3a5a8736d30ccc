// Formants module - LPC resonance estimation
//
// The signal is resampled to the formant analysis rate and pre-emphasized
// once per extraction. Each voiced frame is Hamming-windowed, fitted with a
// Burg all-pole model, and the model polynomial is factored through the
// eigenvalues of its companion matrix. Complex roots in the upper half
// plane map to resonances: frequency from the root angle, bandwidth from
// the root radius.

use nalgebra::{DMatrix, Schur};
use rustfft::num_complex::Complex;

use crate::analysis::windower::WindowShape;
use crate::config::FormantConfig;
use crate::error::ExtractionError;
use crate::signal::resample::resample;

type Complex64 = Complex<f64>;

/// Newton refinement steps applied to every eigenvalue root
const POLISH_ITERATIONS: usize = 10;

/// One resonance of the vocal tract model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formant {
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
}

/// Per-extraction formant analyzer
pub struct FormantAnalyzer {
    config: FormantConfig,
    rate: u32,
    signal: Vec<f64>,
    window: Vec<f64>,
    source_rate: u32,
}

impl FormantAnalyzer {
    /// Resample and pre-emphasize `samples` for formant analysis
    ///
    /// Signals already at or below the analysis rate are used at their own
    /// rate.
    ///
    /// # Arguments
    /// * `samples` - Mono signal
    /// * `sample_rate` - Rate of `samples` in Hz
    /// * `frame_ms` - Analysis window length in milliseconds
    /// * `config` - Formant settings
    pub fn new(samples: &[f64], sample_rate: u32, frame_ms: f64, config: &FormantConfig) -> Self {
        let rate = sample_rate.min(config.resample_rate_hz);
        let mut signal = resample(samples, sample_rate, rate);
        pre_emphasize(&mut signal, config.pre_emphasis);

        let window_len = ((frame_ms * f64::from(rate) / 1000.0).round() as usize).max(config.lpc_order + 2);
        let window = WindowShape::Hamming.coefficients(window_len);

        log::debug!(
            "[Formants] Analysis at {} Hz, {} sample window, LPC order {}",
            rate,
            window_len,
            config.lpc_order
        );

        Self {
            config: config.clone(),
            rate,
            signal,
            window,
            source_rate: sample_rate,
        }
    }

    pub fn analysis_rate(&self) -> u32 {
        self.rate
    }

    /// Estimate up to `num_formants` resonances around a source-rate sample position
    ///
    /// # Errors
    /// `LpcNonConvergence` when the root solver cannot factor the model
    pub fn analyze(&self, source_center: usize, frame_index: usize) -> Result<Vec<Formant>, ExtractionError> {
        let center = (source_center as f64 * f64::from(self.rate) / f64::from(self.source_rate)).round() as usize;
        let frame = crate::analysis::windower::centered_slice(&self.signal, center, self.window.len());
        let windowed = crate::analysis::windower::apply_window(&frame, &self.window);

        let coefficients = burg_lpc(&windowed, self.config.lpc_order);
        let roots = lpc_roots(&coefficients, self.config.max_solver_iterations)
            .ok_or(ExtractionError::LpcNonConvergence { frame: frame_index })?;

        let nyquist = f64::from(self.rate) / 2.0;
        let mut formants = roots_to_formants(
            &roots,
            f64::from(self.rate),
            self.config.min_formant_hz,
            nyquist - self.config.min_formant_hz,
        );
        formants.truncate(self.config.num_formants);
        Ok(formants)
    }
}

/// First-order high-frequency boost: y[n] = x[n] - k·x[n-1]
pub fn pre_emphasize(samples: &mut [f64], coefficient: f64) {
    for i in (1..samples.len()).rev() {
        samples[i] -= coefficient * samples[i - 1];
    }
}

/// Burg all-pole model coefficients [1, a1, ..., ap]
pub fn burg_lpc(samples: &[f64], order: usize) -> Vec<f64> {
    let n = samples.len();
    let mut a = vec![0.0; order + 1];
    a[0] = 1.0;
    if n <= order {
        return a;
    }

    let mut forward = samples.to_vec();
    let mut backward = samples.to_vec();

    for k in 1..=order {
        let mut num = 0.0;
        let mut den = 0.0;
        for i in k..n {
            num += forward[i] * backward[i - 1];
            den += forward[i] * forward[i] + backward[i - 1] * backward[i - 1];
        }
        if den < 1e-30 {
            break;
        }
        let reflection = -2.0 * num / den;

        // Walk backwards so backward[i - 1] is still the previous stage's value
        for i in (k..n).rev() {
            let f = forward[i];
            let b = backward[i - 1];
            forward[i] = f + reflection * b;
            backward[i] = b + reflection * f;
        }

        let previous = a.clone();
        for i in 1..k {
            a[i] = previous[i] + reflection * previous[k - i];
        }
        a[k] = reflection;
    }

    a
}

/// Roots of z^p + a1·z^(p-1) + ... + ap
///
/// Returns `None` if the eigenvalue iteration does not converge within
/// `max_iterations` sweeps. Silent frames (all-zero model) have no roots.
pub fn lpc_roots(a: &[f64], max_iterations: usize) -> Option<Vec<Complex64>> {
    let order = a.len().saturating_sub(1);
    if order == 0 {
        return Some(Vec::new());
    }
    let magnitude: f64 = a.iter().skip(1).map(|c| c.abs()).sum();
    if magnitude < 1e-10 {
        return Some(Vec::new());
    }

    let mut companion = DMatrix::<f64>::zeros(order, order);
    for i in 0..order {
        companion[(0, i)] = -a[i + 1];
    }
    for i in 1..order {
        companion[(i, i - 1)] = 1.0;
    }

    let schur = Schur::try_new(companion, f64::EPSILON, max_iterations.max(1))?;
    let roots = schur
        .complex_eigenvalues()
        .iter()
        .map(|e| polish_root(a, Complex64::new(e.re, e.im)))
        .collect();
    Some(roots)
}

fn polish_root(a: &[f64], mut z: Complex64) -> Complex64 {
    for _ in 0..POLISH_ITERATIONS {
        let mut value = Complex64::new(1.0, 0.0);
        let mut derivative = Complex64::new(0.0, 0.0);
        for &c in a.iter().skip(1) {
            derivative = value + z * derivative;
            value = value * z + c;
        }
        if derivative.norm() < 1e-30 {
            break;
        }
        let step = value / derivative;
        if !step.re.is_finite() || !step.im.is_finite() {
            break;
        }
        z -= step;
        if step.norm() < 1e-10 * z.norm() {
            break;
        }
    }
    z
}

/// Map polynomial roots to resonances inside [min_hz, max_hz], sorted by frequency
pub fn roots_to_formants(roots: &[Complex64], sample_rate: f64, min_hz: f64, max_hz: f64) -> Vec<Formant> {
    let mut formants: Vec<Formant> = roots
        .iter()
        .filter(|root| root.im > 0.0)
        .filter_map(|root| {
            let radius = root.norm();
            if radius <= 0.0 {
                return None;
            }
            let frequency_hz = root.arg() * sample_rate / (2.0 * std::f64::consts::PI);
            let bandwidth_hz = -radius.ln() * sample_rate / std::f64::consts::PI;
            let usable = frequency_hz >= min_hz
                && frequency_hz <= max_hz
                && bandwidth_hz > 0.0
                && bandwidth_hz.is_finite();
            usable.then_some(Formant {
                frequency_hz,
                bandwidth_hz,
            })
        })
        .collect();

    formants.sort_by(|a, b| a.frequency_hz.total_cmp(&b.frequency_hz));
    formants
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Impulse train through two resonators at known frequencies
    fn resonant_signal(rate: f64, resonances: &[(f64, f64)], len: usize) -> Vec<f64> {
        let mut signal: Vec<f64> = (0..len).map(|i| if i % 100 == 0 { 1.0 } else { 0.0 }).collect();
        for &(freq, bw) in resonances {
            let r = (-PI * bw / rate).exp();
            let theta = 2.0 * PI * freq / rate;
            let (a1, a2) = (2.0 * r * theta.cos(), -r * r);
            let mut out = vec![0.0; len];
            for i in 0..len {
                let y1 = if i >= 1 { out[i - 1] } else { 0.0 };
                let y2 = if i >= 2 { out[i - 2] } else { 0.0 };
                out[i] = signal[i] + a1 * y1 + a2 * y2;
            }
            signal = out;
        }
        signal
    }

    #[test]
    fn test_burg_recovers_resonances() {
        let rate = 11_000.0;
        let signal = resonant_signal(rate, &[(700.0, 80.0), (1800.0, 120.0)], 2_000);
        let window = WindowShape::Hamming.coefficients(1_000);
        let frame: Vec<f64> = signal[500..1_500].iter().zip(&window).map(|(s, w)| s * w).collect();

        let a = burg_lpc(&frame, 4);
        let roots = lpc_roots(&a, 1_000).unwrap();
        let formants = roots_to_formants(&roots, rate, 50.0, rate / 2.0 - 50.0);

        assert_eq!(formants.len(), 2, "formants: {:?}", formants);
        assert!((formants[0].frequency_hz - 700.0).abs() < 50.0, "F1 {}", formants[0].frequency_hz);
        assert!((formants[1].frequency_hz - 1800.0).abs() < 80.0, "F2 {}", formants[1].frequency_hz);
    }

    #[test]
    fn test_silent_model_has_no_roots() {
        let a = burg_lpc(&vec![0.0; 300], 11);
        assert_eq!(a[0], 1.0);
        assert!(a[1..].iter().all(|&c| c == 0.0));
        assert_eq!(lpc_roots(&a, 1_000), Some(Vec::new()));
    }

    #[test]
    fn test_roots_outside_range_are_dropped() {
        let rate = 10_000.0;
        let at = |freq: f64, radius: f64| {
            Complex64::from_polar(radius, 2.0 * PI * freq / rate)
        };
        let roots = vec![at(20.0, 0.95), at(1000.0, 0.97), at(4980.0, 0.9), at(1000.0, 0.97).conj()];
        let formants = roots_to_formants(&roots, rate, 50.0, 4950.0);
        assert_eq!(formants.len(), 1);
        assert!((formants[0].frequency_hz - 1000.0).abs() < 1e-6);
        let expected_bw = -(0.97f64).ln() * rate / PI;
        assert!((formants[0].bandwidth_hz - expected_bw).abs() < 1e-6);
    }

    #[test]
    fn test_pre_emphasis() {
        let mut samples = vec![1.0, 1.0, 1.0];
        pre_emphasize(&mut samples, 0.7);
        assert_eq!(samples[0], 1.0);
        assert!((samples[1] - 0.3).abs() < 1e-12);
        assert!((samples[2] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_analyzer_runs_at_capped_rate() {
        let samples: Vec<f64> = (0..16_000)
            .map(|i| (2.0 * PI * 300.0 * i as f64 / 16_000.0).sin())
            .collect();
        let analyzer = FormantAnalyzer::new(&samples, 16_000, 25.0, &FormantConfig::default());
        assert_eq!(analyzer.analysis_rate(), 11_000);

        let formants = analyzer.analyze(8_000, 50).unwrap();
        assert!(formants.len() <= 3);
        assert!(formants.windows(2).all(|w| w[0].frequency_hz <= w[1].frequency_hz));
    }
}
