// LLD module - frame-level low-level descriptors
//
// Coordinates the per-descriptor extractors over one signal:
//
// 1. Pitch pass: every frame's 60 ms context (centred on the 25 ms frame)
//    yields pitch candidates; the tracker then fixes one F0 decision per
//    frame, which decides voicing.
// 2. Descriptor pass: the frames are walked again with voicing known.
//    Spectral and loudness descriptors are computed for every frame;
//    pitch-dependent descriptors (jitter, shimmer, HNR, harmonic levels,
//    formants) only for voiced frames and stay undefined elsewhere.
//
// Every series in the resulting matrix has exactly one entry per frame.

pub mod cepstral;
pub mod filterbank;
pub mod formants;
pub mod loudness;
pub mod perturbation;
pub mod pitch;
pub mod spectral;

use serde::Serialize;

use crate::analysis::fft::FftProcessor;
use crate::analysis::windower::{apply_window, centered_slice, FrameWindower, WindowShape};
use crate::config::EngineConfig;
use crate::error::ExtractionError;
use crate::signal::SignalBuffer;

use cepstral::MfccModel;
use formants::FormantAnalyzer;
use loudness::LoudnessModel;
use pitch::{hz_to_semitones, PitchTracker};
use std::sync::Arc;

/// Harmonic search half-width as a fraction of F0
const HARMONIC_SEARCH: f64 = 0.1;

/// Correlation clamp for the HNR conversion
const HNR_CORRELATION_LIMIT: f64 = 1e-6;

/// Frame-level descriptors produced by the LLD stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Descriptor {
    F0Semitone,
    VoicingProbability,
    Loudness,
    RmsEnergy,
    SpectralFlux,
    Mfcc1,
    Mfcc2,
    Mfcc3,
    Mfcc4,
    JitterLocal,
    ShimmerLocalDb,
    HnrDbAcf,
    LogRelF0H1H2,
    LogRelF0H1A3,
    F1Frequency,
    F1Bandwidth,
    F1Amplitude,
    F2Frequency,
    F2Bandwidth,
    F2Amplitude,
    F3Frequency,
    F3Bandwidth,
    F3Amplitude,
    AlphaRatio,
    HammarbergIndex,
    Slope0To500,
    Slope500To1500,
}

impl Descriptor {
    pub const ALL: [Descriptor; 27] = [
        Descriptor::F0Semitone,
        Descriptor::VoicingProbability,
        Descriptor::Loudness,
        Descriptor::RmsEnergy,
        Descriptor::SpectralFlux,
        Descriptor::Mfcc1,
        Descriptor::Mfcc2,
        Descriptor::Mfcc3,
        Descriptor::Mfcc4,
        Descriptor::JitterLocal,
        Descriptor::ShimmerLocalDb,
        Descriptor::HnrDbAcf,
        Descriptor::LogRelF0H1H2,
        Descriptor::LogRelF0H1A3,
        Descriptor::F1Frequency,
        Descriptor::F1Bandwidth,
        Descriptor::F1Amplitude,
        Descriptor::F2Frequency,
        Descriptor::F2Bandwidth,
        Descriptor::F2Amplitude,
        Descriptor::F3Frequency,
        Descriptor::F3Bandwidth,
        Descriptor::F3Amplitude,
        Descriptor::AlphaRatio,
        Descriptor::HammarbergIndex,
        Descriptor::Slope0To500,
        Descriptor::Slope500To1500,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Descriptor name as used in feature names
    pub fn name(self) -> &'static str {
        match self {
            Descriptor::F0Semitone => "F0semitoneFrom27.5Hz",
            Descriptor::VoicingProbability => "voicingProbability",
            Descriptor::Loudness => "loudness",
            Descriptor::RmsEnergy => "pcm_RMSenergy",
            Descriptor::SpectralFlux => "spectralFlux",
            Descriptor::Mfcc1 => "mfcc1",
            Descriptor::Mfcc2 => "mfcc2",
            Descriptor::Mfcc3 => "mfcc3",
            Descriptor::Mfcc4 => "mfcc4",
            Descriptor::JitterLocal => "jitterLocal",
            Descriptor::ShimmerLocalDb => "shimmerLocaldB",
            Descriptor::HnrDbAcf => "HNRdBACF",
            Descriptor::LogRelF0H1H2 => "logRelF0-H1-H2",
            Descriptor::LogRelF0H1A3 => "logRelF0-H1-A3",
            Descriptor::F1Frequency => "F1frequency",
            Descriptor::F1Bandwidth => "F1bandwidth",
            Descriptor::F1Amplitude => "F1amplitudeLogRelF0",
            Descriptor::F2Frequency => "F2frequency",
            Descriptor::F2Bandwidth => "F2bandwidth",
            Descriptor::F2Amplitude => "F2amplitudeLogRelF0",
            Descriptor::F3Frequency => "F3frequency",
            Descriptor::F3Bandwidth => "F3bandwidth",
            Descriptor::F3Amplitude => "F3amplitudeLogRelF0",
            Descriptor::AlphaRatio => "alphaRatio",
            Descriptor::HammarbergIndex => "hammarbergIndex",
            Descriptor::Slope0To500 => "slope0-500",
            Descriptor::Slope500To1500 => "slope500-1500",
        }
    }

    fn formant(i: usize) -> (Descriptor, Descriptor, Descriptor) {
        match i {
            0 => (Descriptor::F1Frequency, Descriptor::F1Bandwidth, Descriptor::F1Amplitude),
            1 => (Descriptor::F2Frequency, Descriptor::F2Bandwidth, Descriptor::F2Amplitude),
            _ => (Descriptor::F3Frequency, Descriptor::F3Bandwidth, Descriptor::F3Amplitude),
        }
    }
}

/// One descriptor's per-frame values; `None` marks frames where it is undefined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LldSeries {
    pub descriptor: Descriptor,
    pub values: Vec<Option<f64>>,
}

impl LldSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of every frame, treating undefined frames as 0.0
    pub fn dense(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.unwrap_or(0.0)).collect()
    }
}

/// Aligned descriptor series of one signal
#[derive(Debug, Clone, PartialEq)]
pub struct LldMatrix {
    hop_secs: f64,
    duration_secs: f64,
    frame_times: Vec<f64>,
    voiced: Vec<bool>,
    series: Vec<LldSeries>,
}

impl LldMatrix {
    /// Assemble a matrix and check alignment and finiteness
    ///
    /// # Errors
    /// - `SeriesMisaligned` if any series length differs from the frame count
    /// - `NonFiniteDescriptor` if any defined value is NaN or infinite
    pub fn new(
        hop_secs: f64,
        duration_secs: f64,
        frame_times: Vec<f64>,
        voiced: Vec<bool>,
        series: Vec<LldSeries>,
    ) -> Result<Self, ExtractionError> {
        let frames = frame_times.len();
        if voiced.len() != frames {
            return Err(ExtractionError::SeriesMisaligned {
                descriptor: "voicing",
                expected: frames,
                actual: voiced.len(),
            });
        }
        for s in &series {
            if s.len() != frames {
                return Err(ExtractionError::SeriesMisaligned {
                    descriptor: s.descriptor.name(),
                    expected: frames,
                    actual: s.len(),
                });
            }
            if let Some(frame) = s.values.iter().position(|v| v.is_some_and(|x| !x.is_finite())) {
                return Err(ExtractionError::NonFiniteDescriptor {
                    descriptor: s.descriptor.name(),
                    frame,
                });
            }
        }
        if series.len() != Descriptor::ALL.len()
            || series.iter().zip(Descriptor::ALL).any(|(s, d)| s.descriptor != d)
        {
            return Err(ExtractionError::SeriesMisaligned {
                descriptor: "descriptor table",
                expected: Descriptor::ALL.len(),
                actual: series.len(),
            });
        }

        Ok(Self {
            hop_secs,
            duration_secs,
            frame_times,
            voiced,
            series,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn hop_secs(&self) -> f64 {
        self.hop_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Frame centre times in seconds
    pub fn frame_times(&self) -> &[f64] {
        &self.frame_times
    }

    pub fn voiced(&self) -> &[bool] {
        &self.voiced
    }

    pub fn voiced_frame_count(&self) -> usize {
        self.voiced.iter().filter(|&&v| v).count()
    }

    pub fn series(&self, descriptor: Descriptor) -> &LldSeries {
        &self.series[descriptor.index()]
    }

    /// Per-frame F0 in Hz, `None` on unvoiced frames
    pub fn f0_hz(&self) -> Vec<Option<f64>> {
        self.series(Descriptor::F0Semitone)
            .values
            .iter()
            .map(|v| v.map(pitch::semitones_to_hz))
            .collect()
    }
}

/// Precomputed filterbanks for one sample rate and spectrum size
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralTables {
    sample_rate: u32,
    fft_size: usize,
    loudness: LoudnessModel,
    mfcc: MfccModel,
}

impl SpectralTables {
    /// Build tables for `frame_len`-sample frames at `sample_rate`
    pub fn build(sample_rate: u32, frame_len: usize) -> Self {
        let fft_size = frame_len.max(2).next_power_of_two();
        Self {
            sample_rate,
            fft_size,
            loudness: LoudnessModel::new(fft_size, sample_rate),
            mfcc: MfccModel::new(fft_size, sample_rate),
        }
    }

    /// Tables sized for the configured analysis frame at `sample_rate`
    pub fn for_config(config: &EngineConfig, sample_rate: u32) -> Self {
        let windower = analysis_windower(config, sample_rate);
        Self::build(sample_rate, windower.window_len())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn loudness(&self) -> &LoudnessModel {
        &self.loudness
    }

    pub fn mfcc(&self) -> &MfccModel {
        &self.mfcc
    }

    /// Check every filter is populated and finite
    pub fn validate(&self) -> Result<(), String> {
        if !self.loudness.is_well_formed() {
            return Err(format!("Bark filterbank malformed at {} Hz", self.sample_rate));
        }
        if !self.mfcc.is_well_formed() {
            return Err(format!("mel filterbank malformed at {} Hz", self.sample_rate));
        }
        Ok(())
    }
}

fn analysis_windower(config: &EngineConfig, sample_rate: u32) -> FrameWindower {
    FrameWindower::from_ms(
        sample_rate,
        config.framing.frame_size_ms,
        config.framing.hop_size_ms,
        config.framing.edge_policy,
    )
}

/// Extracts the full LLD matrix from a signal buffer
pub struct LldExtractor {
    config: EngineConfig,
    tables: Arc<SpectralTables>,
}

impl LldExtractor {
    /// Create an extractor using precomputed `tables`
    ///
    /// Tables that do not match the configured frame size at their rate are
    /// rebuilt on extraction.
    pub fn new(config: &EngineConfig, tables: Arc<SpectralTables>) -> Self {
        Self {
            config: config.clone(),
            tables,
        }
    }

    /// Run both passes over `buffer`
    ///
    /// # Errors
    /// - `NoFrames` if the signal is shorter than one analysis frame
    /// - `LpcNonConvergence` if formant estimation fails on a voiced frame
    /// - `SeriesMisaligned` / `NonFiniteDescriptor` from the final matrix check
    pub fn extract(&self, buffer: &SignalBuffer) -> Result<LldMatrix, ExtractionError> {
        let rate = buffer.sample_rate();
        let samples = buffer.samples();
        let windower = analysis_windower(&self.config, rate);
        let frame_count = windower.frame_count(buffer.len());
        if frame_count == 0 {
            return Err(ExtractionError::NoFrames);
        }

        let span = tracing::debug_span!("lld_extract", frames = frame_count, sample_rate = rate);
        let _guard = span.enter();

        let tables = self.tables_for(rate, windower.window_len());
        let hop_secs = windower.hop_len() as f64 / f64::from(rate);

        // Pass 1: pitch
        let pitch_len = buffer.ms_to_samples(self.config.framing.pitch_frame_size_ms).max(3);
        let gaussian = WindowShape::Gaussian {
            sigma: self.config.framing.gaussian_sigma,
        }
        .coefficients(pitch_len);
        let tracker = PitchTracker::new(&self.config.pitch, rate, gaussian);
        let global_peak = samples.iter().map(|s| s.abs()).fold(0.0, f64::max);

        let candidates: Vec<_> = windower
            .frames(buffer)
            .map(|frame| {
                let context = centered_slice(samples, frame.center(), pitch_len);
                tracker.candidates(&context, global_peak)
            })
            .collect();
        let decisions = tracker.track(&candidates, hop_secs);

        log::debug!(
            "[LLD] Pitch pass: {} frames, {} voiced",
            frame_count,
            decisions.iter().filter(|d| d.is_voiced()).count()
        );

        // Pass 2: descriptors
        let hamming = WindowShape::Hamming.coefficients(windower.window_len());
        let window_energy: f64 = hamming.iter().map(|w| w * w).sum::<f64>().max(f64::EPSILON);
        let spectrum_fft = FftProcessor::new(tables.fft_size());
        let bin_width = spectrum_fft.bin_width(rate);
        let harmonic_fft = FftProcessor::for_autocorrelation(pitch_len);
        let harmonic_bin_width = harmonic_fft.bin_width(rate);
        let formant_analyzer = FormantAnalyzer::new(
            samples,
            rate,
            self.config.framing.frame_size_ms,
            &self.config.formants,
        );

        let mut columns: Vec<Vec<Option<f64>>> =
            Descriptor::ALL.iter().map(|_| Vec::with_capacity(frame_count)).collect();
        let mut frame_times = Vec::with_capacity(frame_count);
        let mut voiced_flags = Vec::with_capacity(frame_count);
        let mut previous_magnitudes: Option<Vec<f64>> = None;

        for mut frame in windower.frames(buffer) {
            let decision = decisions[frame.index];
            frame.voiced = Some(decision.is_voiced());
            frame_times.push(frame.time_secs(rate));
            voiced_flags.push(frame.voiced == Some(true));

            let mut row: Vec<Option<f64>> = vec![None; Descriptor::ALL.len()];
            let mut set = |d: Descriptor, v: f64| row[d.index()] = Some(v);

            let power: Vec<f64> = spectrum_fft
                .power_spectrum(&apply_window(&frame.samples, &hamming))
                .into_iter()
                .map(|p| p / window_energy)
                .collect();

            set(Descriptor::VoicingProbability, decision.voicing_probability);
            set(Descriptor::Loudness, tables.loudness().loudness(&power));
            set(Descriptor::RmsEnergy, loudness::rms(&frame.samples));

            let magnitudes = spectral::normalized_magnitudes(&power);
            set(
                Descriptor::SpectralFlux,
                spectral::spectral_flux(&magnitudes, previous_magnitudes.as_deref()),
            );
            previous_magnitudes = Some(magnitudes);

            let mfcc = tables.mfcc().coefficients(&power);
            for (d, value) in [Descriptor::Mfcc1, Descriptor::Mfcc2, Descriptor::Mfcc3, Descriptor::Mfcc4]
                .into_iter()
                .zip(mfcc)
            {
                set(d, value);
            }

            set(Descriptor::AlphaRatio, spectral::alpha_ratio(&power, bin_width));
            set(Descriptor::HammarbergIndex, spectral::hammarberg_index(&power, bin_width));
            set(Descriptor::Slope0To500, spectral::spectral_slope(&power, bin_width, 0.0, 500.0));
            set(
                Descriptor::Slope500To1500,
                spectral::spectral_slope(&power, bin_width, 500.0, 1500.0),
            );

            if let Some(f0) = decision.frequency_hz {
                let center = frame.center();
                set(Descriptor::F0Semitone, hz_to_semitones(f0));

                let r = decision
                    .correlation
                    .clamp(HNR_CORRELATION_LIMIT, 1.0 - HNR_CORRELATION_LIMIT);
                set(Descriptor::HnrDbAcf, 10.0 * (r / (1.0 - r)).log10());

                let half = pitch_len / 2;
                let region = &samples[center.saturating_sub(half)..(center + half).min(samples.len())];
                if let Some(p) = perturbation::measure(region, f0, rate) {
                    set(Descriptor::JitterLocal, p.jitter_local);
                    set(Descriptor::ShimmerLocalDb, p.shimmer_local_db);
                }

                let context = centered_slice(samples, center, pitch_len);
                let harmonic_power = harmonic_fft.power_spectrum(&tracker.windowed(&context));
                let search = (HARMONIC_SEARCH * f0).max(harmonic_bin_width);
                let level = |hz: f64, width: f64| {
                    spectral::harmonic_level_db(&harmonic_power, harmonic_bin_width, hz, width)
                };

                let h1 = level(f0, search);
                if let (Some(h1), Some(h2)) = (h1, level(2.0 * f0, search)) {
                    set(Descriptor::LogRelF0H1H2, h1 - h2);
                }

                let formants = formant_analyzer.analyze(center, frame.index)?;
                for (i, formant) in formants.iter().enumerate().take(3) {
                    let (freq_d, bw_d, amp_d) = Descriptor::formant(i);
                    set(freq_d, formant.frequency_hz);
                    set(bw_d, formant.bandwidth_hz);
                    if let (Some(h1), Some(amplitude)) = (h1, level(formant.frequency_hz, f0 / 2.0)) {
                        set(amp_d, amplitude - h1);
                        if i == 2 {
                            set(Descriptor::LogRelF0H1A3, h1 - amplitude);
                        }
                    }
                }
            }

            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        let series = Descriptor::ALL
            .iter()
            .zip(columns)
            .map(|(&descriptor, values)| LldSeries { descriptor, values })
            .collect();

        LldMatrix::new(hop_secs, buffer.duration_secs(), frame_times, voiced_flags, series)
    }

    fn tables_for(&self, sample_rate: u32, frame_len: usize) -> Arc<SpectralTables> {
        let fft_size = frame_len.max(2).next_power_of_two();
        if self.tables.sample_rate() == sample_rate && self.tables.fft_size() == fft_size {
            Arc::clone(&self.tables)
        } else {
            log::debug!(
                "[LLD] Building spectral tables for {} Hz / {} point FFT",
                sample_rate,
                fft_size
            );
            Arc::new(SpectralTables::build(sample_rate, frame_len))
        }
    }
}
