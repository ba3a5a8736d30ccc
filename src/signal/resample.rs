//! FFT-domain resampling
//!
//! Used to bring the signal down to the formant analysis rate. The whole
//! signal is transformed once, truncated (or zero-padded) in the frequency
//! domain, and transformed back, which is equivalent to ideal band-limited
//! interpolation for a periodic extension of the signal.

use rustfft::{num_complex::Complex, FftPlanner};

/// Resample `samples` from `from_rate` to `to_rate`
///
/// Returns the input unchanged when the rates match.
pub fn resample(samples: &[f64], from_rate: u32, to_rate: u32) -> Vec<f64> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let n = samples.len();
    let new_len = ((n as f64) * f64::from(to_rate) / f64::from(from_rate)).round() as usize;
    if new_len == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let mut spectrum: Vec<Complex<f64>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    forward.process(&mut spectrum);

    let mut resized = vec![Complex::new(0.0, 0.0); new_len];
    let half_old = n / 2;
    let half_new = new_len / 2;
    let keep = half_old.min(half_new);

    // Positive frequencies including DC
    resized[..=keep.min(new_len - 1)].copy_from_slice(&spectrum[..=keep.min(new_len - 1)]);
    // Negative frequencies
    for i in 1..keep {
        resized[new_len - i] = spectrum[n - i];
    }
    // Split the shared Nyquist bin when downsampling to an even length
    if new_len < n && new_len % 2 == 0 && keep == half_new {
        resized[half_new] = spectrum[half_new] * 0.5 + spectrum[n - half_new] * 0.5;
    }

    let inverse = planner.plan_fft_inverse(new_len);
    inverse.process(&mut resized);

    let scale = 1.0 / n as f64;
    resized.iter().map(|c| c.re * scale).collect()
}
