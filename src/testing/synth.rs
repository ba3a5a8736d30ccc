//! Deterministic synthetic signals for diagnostics and tests.
//!
//! Every pattern renders the same samples for the same spec, including
//! white noise, which draws from a seeded `StdRng`.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::signal::DecodedAudio;

/// Number of harmonics in `HarmonicVoice`
pub const VOICE_HARMONICS: usize = 10;

/// Supported deterministic waveform patterns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    Sine,
    /// Harmonic series with 1/k amplitudes, a crude glottal source
    HarmonicVoice,
    WhiteNoise,
    /// One full-scale sample per period
    ImpulseTrain,
    Silence,
}

/// Declarative description of a synthetic signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticSpec {
    pub pattern: SyntheticPattern,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
    /// Channels the mono signal is duplicated into
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_frequency_hz() -> f32 {
    220.0
}

fn default_amplitude() -> f32 {
    0.5
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_duration_ms() -> u32 {
    1_500
}

fn default_channels() -> u16 {
    1
}

fn default_seed() -> u64 {
    0x5A5A_FFF0
}

impl SyntheticSpec {
    pub fn new(pattern: SyntheticPattern) -> Self {
        Self {
            pattern,
            frequency_hz: default_frequency_hz(),
            amplitude: default_amplitude(),
            sample_rate: default_sample_rate(),
            duration_ms: default_duration_ms(),
            channels: default_channels(),
            seed: default_seed(),
        }
    }

    pub fn sine(frequency_hz: f32) -> Self {
        Self::new(SyntheticPattern::Sine).with_frequency(frequency_hz)
    }

    pub fn voice(frequency_hz: f32) -> Self {
        Self::new(SyntheticPattern::HarmonicVoice).with_frequency(frequency_hz)
    }

    pub fn noise() -> Self {
        Self::new(SyntheticPattern::WhiteNoise)
    }

    pub fn silence() -> Self {
        Self::new(SyntheticPattern::Silence)
    }

    pub fn with_frequency(mut self, frequency_hz: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn frame_count(&self) -> usize {
        ((self.duration_ms as f64 / 1_000.0) * self.sample_rate as f64).round() as usize
    }

    /// Render the mono signal
    pub fn render(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let rate = self.sample_rate.max(1) as f32;

        match self.pattern {
            SyntheticPattern::Sine => (0..frames)
                .map(|i| self.amplitude * (2.0 * PI * self.frequency_hz * i as f32 / rate).sin())
                .collect(),
            SyntheticPattern::HarmonicVoice => {
                let nyquist = rate / 2.0;
                let norm: f32 = (1..=VOICE_HARMONICS).map(|k| 1.0 / k as f32).sum();
                (0..frames)
                    .map(|i| {
                        let t = i as f32 / rate;
                        let value: f32 = (1..=VOICE_HARMONICS)
                            .filter(|&k| self.frequency_hz * (k as f32) < nyquist)
                            .map(|k| (2.0 * PI * self.frequency_hz * k as f32 * t).sin() / k as f32)
                            .sum();
                        self.amplitude * value / norm
                    })
                    .collect()
            }
            SyntheticPattern::WhiteNoise => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                if self.amplitude <= 0.0 {
                    return vec![0.0; frames];
                }
                (0..frames)
                    .map(|_| rng.gen_range(-self.amplitude..self.amplitude))
                    .collect()
            }
            SyntheticPattern::ImpulseTrain => {
                let interval = (rate / self.frequency_hz.max(1.0)).round().max(1.0) as usize;
                (0..frames)
                    .map(|i| if i % interval == 0 { self.amplitude } else { 0.0 })
                    .collect()
            }
            SyntheticPattern::Silence => vec![0.0; frames],
        }
    }

    /// Render as interleaved float audio with `channels` identical channels
    pub fn to_audio(&self) -> DecodedAudio {
        let mono = self.render();
        let channels = usize::from(self.channels.max(1));
        let samples = mono
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels))
            .collect();
        DecodedAudio::from_f32(samples, self.sample_rate, self.channels.max(1))
    }

    /// Render as interleaved 16-bit audio
    pub fn to_audio_i16(&self) -> DecodedAudio {
        let float = self.to_audio();
        let samples = match &float.samples {
            crate::signal::PcmSamples::Float32(samples) => samples.iter().map(|&s| to_i16(s)).collect(),
            crate::signal::PcmSamples::Int16(samples) => samples.clone(),
        };
        DecodedAudio::from_i16(samples, float.sample_rate, float.channels)
    }
}

/// Quantize a float sample to 16 bits with saturation
pub fn to_i16(sample: f32) -> i16 {
    (sample * 32_768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
