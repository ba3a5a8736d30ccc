//! Signal ingestion
//!
//! Decoded PCM arrives from an external decoder as interleaved samples plus
//! a sample rate and channel count. `SignalBuffer::build` validates it
//! against the engine's input envelope and collapses it to a normalized mono
//! signal that every later stage reads from.

pub mod resample;
pub mod wav;

use serde::{Deserialize, Serialize};

use crate::config::InputLimits;
use crate::error::EngineError;

/// Interleaved PCM samples as delivered by the decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PcmSamples {
    /// Floating-point samples, nominally in [-1.0, 1.0]
    Float32(Vec<f32>),
    /// 16-bit fixed-point samples
    Int16(Vec<i16>),
}

impl PcmSamples {
    pub fn len(&self) -> usize {
        match self {
            PcmSamples::Float32(samples) => samples.len(),
            PcmSamples::Int16(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sample_at(&self, index: usize) -> f64 {
        match self {
            PcmSamples::Float32(samples) => f64::from(samples[index]),
            PcmSamples::Int16(samples) => f64::from(samples[index]) / 32_768.0,
        }
    }
}

/// Decoded audio handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedAudio {
    pub samples: PcmSamples,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn from_f32(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: PcmSamples::Float32(samples),
            sample_rate,
            channels,
        }
    }

    pub fn from_i16(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: PcmSamples::Int16(samples),
            sample_rate,
            channels,
        }
    }

    /// Number of multi-channel sample frames
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }
}

/// Normalized mono signal at a supported sample rate
///
/// Immutable once built; owned by a single extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
    source_channels: u16,
}

impl SignalBuffer {
    /// Validate decoded audio and collapse it to mono
    ///
    /// # Errors
    /// - `InvalidAudio` for an unsupported sample rate, channel count,
    ///   a sample count that is not a whole number of frames, or
    ///   non-finite samples
    /// - `InsufficientAudio` when the signal is shorter than
    ///   `limits.min_duration_ms`
    pub fn build(audio: &DecodedAudio, limits: &InputLimits) -> Result<Self, EngineError> {
        let channels = audio.channels;
        if channels == 0 || channels > limits.max_channels {
            return Err(EngineError::InvalidAudio {
                reason: format!(
                    "unsupported channel count {} (supported 1-{})",
                    channels, limits.max_channels
                ),
            });
        }

        if audio.sample_rate < limits.min_sample_rate || audio.sample_rate > limits.max_sample_rate
        {
            return Err(EngineError::InvalidAudio {
                reason: format!(
                    "unsupported sample rate {} Hz (supported {}-{} Hz)",
                    audio.sample_rate, limits.min_sample_rate, limits.max_sample_rate
                ),
            });
        }

        let channel_count = usize::from(channels);
        if audio.samples.len() % channel_count != 0 {
            return Err(EngineError::InvalidAudio {
                reason: format!(
                    "{} samples is not a whole number of {}-channel frames",
                    audio.samples.len(),
                    channels
                ),
            });
        }

        if let PcmSamples::Float32(samples) = &audio.samples {
            if let Some(position) = samples.iter().position(|s| !s.is_finite()) {
                return Err(EngineError::InvalidAudio {
                    reason: format!("non-finite sample at index {}", position),
                });
            }
        }

        let frame_count = audio.frame_count();
        let actual_ms = duration_ms(frame_count, audio.sample_rate);
        if actual_ms < limits.min_duration_ms {
            return Err(EngineError::InsufficientAudio {
                required_ms: limits.min_duration_ms,
                actual_ms,
            });
        }

        let samples = downmix(&audio.samples, channel_count, frame_count);

        log::debug!(
            "[Signal] Built mono buffer: {} samples @ {} Hz from {} channel(s)",
            samples.len(),
            audio.sample_rate,
            channels
        );

        Ok(Self {
            samples,
            sample_rate: audio.sample_rate,
            source_channels: channels,
        })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Convert a duration in milliseconds to a whole number of samples
    pub fn ms_to_samples(&self, ms: f64) -> usize {
        (ms * f64::from(self.sample_rate) / 1000.0).round() as usize
    }
}

fn duration_ms(frames: usize, sample_rate: u32) -> u32 {
    let ms = frames as u64 * 1000 / u64::from(sample_rate.max(1));
    ms.min(u64::from(u32::MAX)) as u32
}

/// Average interleaved channels into one
fn downmix(samples: &PcmSamples, channels: usize, frames: usize) -> Vec<f64> {
    if channels == 1 {
        return (0..frames).map(|i| samples.sample_at(i)).collect();
    }

    let scale = 1.0 / channels as f64;
    (0..frames)
        .map(|frame| {
            let base = frame * channels;
            let sum: f64 = (0..channels).map(|c| samples.sample_at(base + c)).sum();
            sum * scale
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> InputLimits {
        InputLimits::default()
    }

    fn sine(sample_rate: u32, frequency: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_build_mono_signal() {
        let audio = DecodedAudio::from_f32(sine(16_000, 220.0, 16_000), 16_000, 1);
        let buffer = SignalBuffer::build(&audio, &limits()).unwrap();
        assert_eq!(buffer.len(), 16_000);
        assert_eq!(buffer.sample_rate(), 16_000);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_unsupported_sample_rate() {
        let audio = DecodedAudio::from_f32(vec![0.0; 96_000], 96_000, 1);
        match SignalBuffer::build(&audio, &limits()) {
            Err(EngineError::InvalidAudio { reason }) => assert!(reason.contains("96000")),
            other => panic!("Expected InvalidAudio, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_channels() {
        let audio = DecodedAudio::from_f32(vec![0.0; 16_000], 16_000, 0);
        assert!(matches!(
            SignalBuffer::build(&audio, &limits()),
            Err(EngineError::InvalidAudio { .. })
        ));
    }

    #[test]
    fn test_rejects_ragged_interleaving() {
        let audio = DecodedAudio::from_f32(vec![0.0; 32_001], 16_000, 2);
        assert!(matches!(
            SignalBuffer::build(&audio, &limits()),
            Err(EngineError::InvalidAudio { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_samples() {
        let mut samples = vec![0.0f32; 16_000];
        samples[42] = f32::NAN;
        let audio = DecodedAudio::from_f32(samples, 16_000, 1);
        match SignalBuffer::build(&audio, &limits()) {
            Err(EngineError::InvalidAudio { reason }) => assert!(reason.contains("42")),
            other => panic!("Expected InvalidAudio, got {:?}", other),
        }
    }

    #[test]
    fn test_short_signal_is_insufficient() {
        let audio = DecodedAudio::from_f32(vec![0.0; 1_600], 16_000, 1);
        assert_eq!(
            SignalBuffer::build(&audio, &limits()),
            Err(EngineError::InsufficientAudio {
                required_ms: 1000,
                actual_ms: 100
            })
        );
    }

    #[test]
    fn test_identical_channels_downmix_to_mono() {
        let mono = sine(16_000, 220.0, 16_000);
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();

        let mono_buffer =
            SignalBuffer::build(&DecodedAudio::from_f32(mono, 16_000, 1), &limits()).unwrap();
        let stereo_buffer =
            SignalBuffer::build(&DecodedAudio::from_f32(stereo, 16_000, 2), &limits()).unwrap();

        assert_eq!(stereo_buffer.source_channels(), 2);
        assert_eq!(mono_buffer.len(), stereo_buffer.len());
        for (a, b) in mono_buffer.samples().iter().zip(stereo_buffer.samples()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_int16_samples_are_normalized() {
        let audio = DecodedAudio::from_i16(vec![16_384; 16_000], 16_000, 1);
        let buffer = SignalBuffer::build(&audio, &limits()).unwrap();
        assert!((buffer.samples()[0] - 0.5).abs() < 1e-12);
    }
}
