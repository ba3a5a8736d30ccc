// Pitch module - autocorrelation pitch candidates and path smoothing
//
// Per frame, the Gaussian-windowed pitch frame is autocorrelated and divided
// by the autocorrelation of the window itself, giving a normalized
// periodicity r(τ) in [-1, 1]. Local maxima of r inside the F0 search range
// become voiced candidates; an extra unvoiced candidate competes with them.
// A Viterbi pass over all frames then picks one candidate per frame,
// penalizing octave jumps and voiced/unvoiced switches so the contour does
// not flip between harmonics.
//
// The local intensity that feeds the unvoiced candidate is measured on the
// frame core only (where the window weight is at least half its maximum).
// A voice onset sitting in the tapered tail of an otherwise quiet frame
// then stays unvoiced instead of lending its periodicity to the noise.
//
// References:
// - Boersma, P. (1993). Accurate short-term analysis of the fundamental
//   frequency and the harmonics-to-noise ratio of a sampled sound.

use std::ops::Range;

use crate::analysis::fft::FftProcessor;
use crate::config::PitchConfig;

/// Smallest window autocorrelation value we are willing to divide by
const MIN_WINDOW_CORRELATION: f64 = 1e-3;

/// Window weight, relative to its maximum, that bounds the frame core
const CORE_WEIGHT: f64 = 0.5;

/// One voiced pitch hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    pub frequency_hz: f64,
    /// Normalized autocorrelation at the interpolated peak, clamped to [0, 1]
    pub correlation: f64,
    /// Correlation with the octave preference applied (used for path scoring)
    pub score: f64,
}

/// Candidates for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCandidates {
    /// Sorted by descending score
    pub voiced: Vec<PitchCandidate>,
    pub unvoiced_score: f64,
}

impl FrameCandidates {
    /// Highest raw correlation among voiced candidates
    pub fn voicing_probability(&self) -> f64 {
        self.voiced
            .iter()
            .map(|c| c.correlation)
            .fold(0.0, f64::max)
    }
}

/// Decision for one frame after path smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchDecision {
    /// `None` for unvoiced frames
    pub frequency_hz: Option<f64>,
    /// Normalized autocorrelation of the chosen candidate (0 when unvoiced)
    pub correlation: f64,
    /// Best voiced correlation in the frame, regardless of the decision
    pub voicing_probability: f64,
}

impl PitchDecision {
    pub fn is_voiced(&self) -> bool {
        self.frequency_hz.is_some()
    }
}

/// Autocorrelation pitch tracker for one sample rate and window length
pub struct PitchTracker {
    config: PitchConfig,
    sample_rate: u32,
    window: Vec<f64>,
    window_correlation: Vec<f64>,
    fft: FftProcessor,
    core: Range<usize>,
    min_lag: usize,
    max_lag: usize,
}

impl PitchTracker {
    /// Create a tracker for frames of `window.len()` samples
    ///
    /// # Arguments
    /// * `config` - Search range and path costs
    /// * `sample_rate` - Sample rate of the frames in Hz
    /// * `window` - Tapering window (Gaussian in the reference recipe)
    pub fn new(config: &PitchConfig, sample_rate: u32, window: Vec<f64>) -> Self {
        let fft = FftProcessor::for_autocorrelation(window.len());

        let raw = fft.autocorrelation(&window);
        let r0 = raw.first().copied().unwrap_or(0.0);
        let window_correlation = if r0 > 0.0 {
            raw.iter().map(|r| r / r0).collect()
        } else {
            vec![0.0; raw.len()]
        };

        let peak_weight = window.iter().copied().fold(0.0, f64::max);
        let in_core = |w: &f64| *w >= CORE_WEIGHT * peak_weight;
        let core = match window.iter().position(in_core) {
            Some(start) => start..window.len() - window.iter().rev().position(in_core).unwrap_or(0),
            None => 0..window.len(),
        };

        let rate = f64::from(sample_rate);
        let min_lag = ((rate / config.f0_max_hz).floor() as usize).max(2);
        let max_lag = ((rate / config.f0_min_hz).ceil() as usize).min(window.len().saturating_sub(2));

        Self {
            config: config.clone(),
            sample_rate,
            window,
            window_correlation,
            fft,
            core,
            min_lag,
            max_lag,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Spectrum-ready copy of the frame with the mean removed and the window applied
    pub fn windowed(&self, frame: &[f64]) -> Vec<f64> {
        let mean = if frame.is_empty() {
            0.0
        } else {
            frame.iter().sum::<f64>() / frame.len() as f64
        };
        frame
            .iter()
            .zip(&self.window)
            .map(|(s, w)| (s - mean) * w)
            .collect()
    }

    /// Compute pitch candidates for one frame
    ///
    /// # Arguments
    /// * `frame` - Raw pitch frame of `window_len()` samples
    /// * `global_peak` - Largest absolute sample of the whole signal
    pub fn candidates(&self, frame: &[f64], global_peak: f64) -> FrameCandidates {
        let unvoiced_score = self.unvoiced_score(self.core_peak(frame), global_peak);

        let windowed = self.windowed(frame);
        let r = self.fft.autocorrelation(&windowed);
        let r0 = r.first().copied().unwrap_or(0.0);
        if r0 <= 1e-20 || self.max_lag <= self.min_lag + 1 {
            return FrameCandidates {
                voiced: Vec::new(),
                unvoiced_score,
            };
        }

        let normalized: Vec<f64> = (0..=self.max_lag + 1)
            .map(|lag| {
                let w = self.window_correlation.get(lag).copied().unwrap_or(0.0);
                if w > MIN_WINDOW_CORRELATION {
                    r[lag] / r0 / w
                } else {
                    0.0
                }
            })
            .collect();

        let peak_floor = 0.5 * self.config.voicing_threshold;
        let rate = f64::from(self.sample_rate);
        let mut voiced = Vec::new();

        for lag in self.min_lag.max(1)..=self.max_lag {
            let (prev, here, next) = (normalized[lag - 1], normalized[lag], normalized[lag + 1]);
            if here <= peak_floor || here < prev || here < next {
                continue;
            }

            let (offset, peak) = parabolic_peak(prev, here, next);
            let period = lag as f64 + offset;
            if period <= 0.0 {
                continue;
            }
            let frequency_hz = rate / period;
            if frequency_hz < self.config.f0_min_hz || frequency_hz > self.config.f0_max_hz {
                continue;
            }

            let correlation = peak.clamp(0.0, 1.0);
            let score =
                correlation - self.config.octave_cost * (self.config.f0_min_hz / frequency_hz).log2();
            voiced.push(PitchCandidate {
                frequency_hz,
                correlation,
                score,
            });
        }

        // Stable sort keeps lag order among equal scores
        voiced.sort_by(|a, b| b.score.total_cmp(&a.score));
        voiced.truncate(self.config.max_candidates);

        FrameCandidates {
            voiced,
            unvoiced_score,
        }
    }

    /// Largest deviation from the local mean inside the frame core
    fn core_peak(&self, frame: &[f64]) -> f64 {
        let end = self.core.end.min(frame.len());
        let core = &frame[self.core.start.min(end)..end];
        if core.is_empty() {
            return 0.0;
        }
        let mean = core.iter().sum::<f64>() / core.len() as f64;
        core.iter().map(|s| (s - mean).abs()).fold(0.0, f64::max)
    }

    fn unvoiced_score(&self, local_peak: f64, global_peak: f64) -> f64 {
        let relative = if global_peak > 0.0 {
            local_peak / global_peak
        } else {
            0.0
        };
        let silence = self.config.silence_threshold / (1.0 + self.config.voicing_threshold);
        self.config.voicing_threshold + (2.0 - relative / silence).max(0.0)
    }

    /// Choose one candidate per frame along the cheapest path
    ///
    /// Ties are resolved towards the earlier state index, i.e. the
    /// higher-scoring candidate, then the unvoiced hypothesis last.
    ///
    /// # Arguments
    /// * `frames` - Candidates of every frame in order
    /// * `hop_secs` - Time between frames; costs are scaled to a 10 ms step
    pub fn track(&self, frames: &[FrameCandidates], hop_secs: f64) -> Vec<PitchDecision> {
        if frames.is_empty() {
            return Vec::new();
        }

        let time_correction = if hop_secs > 0.0 { 0.01 / hop_secs } else { 1.0 };
        let jump_cost = self.config.octave_jump_cost * time_correction;
        let switch_cost = self.config.voiced_unvoiced_cost * time_correction;

        // State k < voiced.len() is a voiced candidate, the last state is unvoiced
        let state_freq = |frame: &FrameCandidates, state: usize| -> Option<f64> {
            frame.voiced.get(state).map(|c| c.frequency_hz)
        };
        let state_score = |frame: &FrameCandidates, state: usize| -> f64 {
            frame
                .voiced
                .get(state)
                .map(|c| c.score)
                .unwrap_or(frame.unvoiced_score)
        };
        let transition = |from: Option<f64>, to: Option<f64>| -> f64 {
            match (from, to) {
                (None, None) => 0.0,
                (Some(_), None) | (None, Some(_)) => switch_cost,
                (Some(a), Some(b)) => jump_cost * (a / b).log2().abs(),
            }
        };

        let mut totals: Vec<f64> = (0..=frames[0].voiced.len())
            .map(|s| state_score(&frames[0], s))
            .collect();
        let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(frames.len());
        backpointers.push(vec![0; totals.len()]);

        for i in 1..frames.len() {
            let (prev_frame, frame) = (&frames[i - 1], &frames[i]);
            let states = frame.voiced.len() + 1;
            let mut next_totals = Vec::with_capacity(states);
            let mut pointers = Vec::with_capacity(states);

            for s in 0..states {
                let to = state_freq(frame, s);
                let mut best = f64::NEG_INFINITY;
                let mut best_from = 0;
                for (p, &total) in totals.iter().enumerate() {
                    let value = total - transition(state_freq(prev_frame, p), to);
                    if value > best {
                        best = value;
                        best_from = p;
                    }
                }
                next_totals.push(best + state_score(frame, s));
                pointers.push(best_from);
            }

            totals = next_totals;
            backpointers.push(pointers);
        }

        let mut state = 0;
        let mut best = f64::NEG_INFINITY;
        for (s, &total) in totals.iter().enumerate() {
            if total > best {
                best = total;
                state = s;
            }
        }

        let mut path = vec![0usize; frames.len()];
        for i in (0..frames.len()).rev() {
            path[i] = state;
            state = backpointers[i][state];
        }

        frames
            .iter()
            .zip(path)
            .map(|(frame, s)| match frame.voiced.get(s) {
                Some(candidate) => PitchDecision {
                    frequency_hz: Some(candidate.frequency_hz),
                    correlation: candidate.correlation,
                    voicing_probability: frame.voicing_probability(),
                },
                None => PitchDecision {
                    frequency_hz: None,
                    correlation: 0.0,
                    voicing_probability: frame.voicing_probability(),
                },
            })
            .collect()
    }
}

/// Vertex of the parabola through three equally spaced points
///
/// Returns (offset from the middle point, interpolated value).
pub fn parabolic_peak(prev: f64, here: f64, next: f64) -> (f64, f64) {
    let denominator = prev - 2.0 * here + next;
    if denominator.abs() < 1e-20 {
        return (0.0, here);
    }
    let offset = (0.5 * (prev - next) / denominator).clamp(-0.5, 0.5);
    (offset, here - 0.25 * (prev - next) * offset)
}

/// Convert Hz to semitones relative to 27.5 Hz
pub fn hz_to_semitones(frequency_hz: f64) -> f64 {
    12.0 * (frequency_hz / 27.5).log2()
}

/// Convert semitones relative to 27.5 Hz back to Hz
pub fn semitones_to_hz(semitones: f64) -> f64 {
    27.5 * 2f64.powf(semitones / 12.0)
}
