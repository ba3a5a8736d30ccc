// FFT module - Fast Fourier Transform computation
//
// Spectra and autocorrelations for the LLD stage. Plans are created once per
// processor and shared immutably, so a processor can serve every frame of an
// extraction pass without locking.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor that computes spectra and autocorrelations of frames
pub struct FftProcessor {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    fft_size: usize,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - Transform length; shorter frames are zero-padded
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(fft_size),
            inverse: planner.plan_fft_inverse(fft_size),
            fft_size,
        }
    }

    /// Processor sized for the power spectrum of `window_len`-sample frames
    pub fn for_window(window_len: usize) -> Self {
        Self::new(window_len.next_power_of_two())
    }

    /// Processor sized for a non-circular autocorrelation of `window_len`-sample frames
    pub fn for_autocorrelation(window_len: usize) -> Self {
        Self::new((2 * window_len).next_power_of_two())
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Frequency spacing of spectrum bins in Hz
    pub fn bin_width(&self, sample_rate: u32) -> f64 {
        f64::from(sample_rate) / self.fft_size as f64
    }

    fn transform(&self, frame: &[f64]) -> Vec<Complex<f64>> {
        let mut buffer: Vec<Complex<f64>> = frame
            .iter()
            .take(self.fft_size)
            .map(|&s| Complex::new(s, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));
        self.forward.process(&mut buffer);
        buffer
    }

    /// Power spectrum |X[k]|² for positive frequencies (size = fft_size / 2 + 1)
    ///
    /// The frame is expected to be windowed already.
    pub fn power_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        let spectrum = self.transform(frame);
        spectrum[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm_sqr())
            .collect()
    }

    /// Magnitude spectrum |X[k]| for positive frequencies
    pub fn magnitude_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        self.power_spectrum(frame).into_iter().map(f64::sqrt).collect()
    }

    /// Autocorrelation r[τ] for τ in 0..frame.len()
    ///
    /// Computed as the inverse transform of the power spectrum. The
    /// processor must be at least twice the frame length (see
    /// `for_autocorrelation`) for the result to be non-circular.
    pub fn autocorrelation(&self, frame: &[f64]) -> Vec<f64> {
        let mut spectrum = self.transform(frame);
        for bin in spectrum.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut spectrum);

        let scale = 1.0 / self.fft_size as f64;
        spectrum
            .iter()
            .take(frame.len().min(self.fft_size))
            .map(|c| c.re * scale)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_spectrum_peak_at_sine_bin() {
        let processor = FftProcessor::new(512);
        // 16 cycles over 512 samples lands exactly on bin 16
        let frame: Vec<f64> = (0..512)
            .map(|i| (2.0 * std::f64::consts::PI * 16.0 * i as f64 / 512.0).sin())
            .collect();
        let spectrum = processor.power_spectrum(&frame);
        assert_eq!(spectrum.len(), 257);

        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
    }

    #[test]
    fn test_autocorrelation_matches_direct_sum() {
        let frame: Vec<f64> = (0..100).map(|i| ((i * 7) % 13) as f64 - 6.0).collect();
        let processor = FftProcessor::for_autocorrelation(frame.len());
        let fast = processor.autocorrelation(&frame);

        for lag in [0usize, 1, 5, 37, 99] {
            let direct: f64 = (0..frame.len() - lag).map(|i| frame[i] * frame[i + lag]).sum();
            assert!(
                (fast[lag] - direct).abs() < 1e-6,
                "lag {}: {} vs {}",
                lag,
                fast[lag],
                direct
            );
        }
    }

    #[test]
    fn test_silence_has_zero_spectrum() {
        let processor = FftProcessor::for_window(400);
        assert_eq!(processor.fft_size(), 512);
        let spectrum = processor.power_spectrum(&vec![0.0; 400]);
        assert!(spectrum.iter().all(|&p| p == 0.0));
    }
}
