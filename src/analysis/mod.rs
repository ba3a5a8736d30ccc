// Analysis module - DSP pipeline from mono signal to functionals
//
// Architecture:
// - windower: frame grid and window shapes shared by every descriptor
// - fft: reusable FFT plans for power spectra and autocorrelation
// - lld: per-frame low-level descriptors (pitch, perturbation, formants,
//   spectral balance, loudness, MFCC) collected into an LldMatrix
// - functionals: smoothing and statistics over the LldMatrix producing
//   the 88-entry feature vector

pub mod fft;
pub mod functionals;
pub mod lld;
pub mod windower;

pub use functionals::FunctionalAggregator;
pub use lld::{Descriptor, LldExtractor, LldMatrix};
