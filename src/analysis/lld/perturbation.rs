// Perturbation module - cycle-to-cycle jitter and shimmer
//
// Glottal cycle markers are placed on the positive waveform peaks of a
// voiced pitch frame: the first marker is the largest peak of the first
// period, every next marker is the largest peak 0.8-1.2 periods after the
// previous one. Peak positions and heights are refined by parabolic
// interpolation so sub-sample period differences are measurable.

use super::pitch::parabolic_peak;

/// Search window around the expected next cycle, as fractions of a period
const SEARCH_MIN: f64 = 0.8;
const SEARCH_MAX: f64 = 1.2;

/// Minimum number of periods needed to measure perturbation
const MIN_PERIODS: usize = 2;

/// One glottal cycle marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleMarker {
    /// Fractional sample position of the peak
    pub position: f64,
    /// Interpolated peak height
    pub amplitude: f64,
}

/// Jitter and shimmer of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perturbation {
    /// Mean absolute difference of consecutive periods relative to the mean period
    pub jitter_local: f64,
    /// Mean absolute dB ratio of consecutive peak amplitudes
    pub shimmer_local_db: f64,
}

/// Locate cycle peaks in `samples` for a fundamental of `f0_hz`
pub fn cycle_markers(samples: &[f64], f0_hz: f64, sample_rate: u32) -> Vec<CycleMarker> {
    if f0_hz <= 0.0 || samples.len() < 3 {
        return Vec::new();
    }
    let period = f64::from(sample_rate) / f0_hz;
    if period < 2.0 || (samples.len() as f64) < period * 2.0 {
        return Vec::new();
    }

    let mut markers = Vec::new();
    let first_end = (period.ceil() as usize).min(samples.len() - 1);
    let mut peak = match argmax(samples, 1, first_end) {
        Some(index) => index,
        None => return markers,
    };

    loop {
        if samples[peak] <= 0.0 {
            break;
        }
        markers.push(refine(samples, peak));

        let from = (peak as f64 + SEARCH_MIN * period).round() as usize;
        let to = (peak as f64 + SEARCH_MAX * period).round() as usize;
        if to + 1 >= samples.len() {
            break;
        }
        match argmax(samples, from.max(1), to) {
            Some(next) if next > peak => peak = next,
            _ => break,
        }
    }

    markers
}

/// Compute jitter and shimmer for a voiced frame
///
/// # Arguments
/// * `samples` - Unpadded signal around the frame centre
/// * `f0_hz` - Fundamental chosen by the pitch tracker
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// `None` when fewer than two full periods can be marked
pub fn measure(samples: &[f64], f0_hz: f64, sample_rate: u32) -> Option<Perturbation> {
    let markers = cycle_markers(samples, f0_hz, sample_rate);
    if markers.len() < MIN_PERIODS + 1 {
        return None;
    }

    let periods: Vec<f64> = markers
        .windows(2)
        .map(|pair| pair[1].position - pair[0].position)
        .collect();
    let mean_period = periods.iter().sum::<f64>() / periods.len() as f64;
    if mean_period <= 0.0 {
        return None;
    }

    let period_diff = periods
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .sum::<f64>()
        / (periods.len() - 1) as f64;

    let ratios: Vec<f64> = markers
        .windows(2)
        .filter(|pair| pair[0].amplitude > 0.0 && pair[1].amplitude > 0.0)
        .map(|pair| (20.0 * (pair[1].amplitude / pair[0].amplitude).log10()).abs())
        .collect();
    if ratios.is_empty() {
        return None;
    }

    Some(Perturbation {
        jitter_local: period_diff / mean_period,
        shimmer_local_db: ratios.iter().sum::<f64>() / ratios.len() as f64,
    })
}

fn argmax(samples: &[f64], from: usize, to: usize) -> Option<usize> {
    let to = to.min(samples.len().saturating_sub(2));
    if from > to {
        return None;
    }
    let mut best = from;
    for i in from..=to {
        if samples[i] > samples[best] {
            best = i;
        }
    }
    Some(best)
}

fn refine(samples: &[f64], index: usize) -> CycleMarker {
    if index == 0 || index + 1 >= samples.len() {
        return CycleMarker {
            position: index as f64,
            amplitude: samples[index],
        };
    }
    let (offset, amplitude) = parabolic_peak(samples[index - 1], samples[index], samples[index + 1]);
    CycleMarker {
        position: index as f64 + offset,
        amplitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 16_000;

    fn sine(frequency: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * frequency * i as f64 / SAMPLE_RATE as f64).sin())
            .collect()
    }

    #[test]
    fn test_markers_follow_period() {
        let samples = sine(200.0, 960);
        let markers = cycle_markers(&samples, 200.0, SAMPLE_RATE);
        assert!(markers.len() >= 10, "got {} markers", markers.len());
        for pair in markers.windows(2) {
            let period = pair[1].position - pair[0].position;
            assert!((period - 80.0).abs() < 0.1, "period {}", period);
        }
    }

    #[test]
    fn test_pure_tone_has_negligible_perturbation() {
        let samples = sine(220.0, 960);
        let p = measure(&samples, 220.0, SAMPLE_RATE).unwrap();
        assert!(p.jitter_local < 0.005, "jitter {}", p.jitter_local);
        assert!(p.shimmer_local_db < 0.05, "shimmer {}", p.shimmer_local_db);
    }

    #[test]
    fn test_alternating_amplitude_shows_shimmer() {
        // Every other cycle at half amplitude: |20 log10(0.5)| ≈ 6.02 dB
        let period = 80usize;
        let samples: Vec<f64> = (0..960)
            .map(|i| {
                let gain = if (i / period) % 2 == 0 { 1.0 } else { 0.5 };
                gain * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()
            })
            .collect();
        let p = measure(&samples, 200.0, SAMPLE_RATE).unwrap();
        assert!((p.shimmer_local_db - 6.02).abs() < 0.2, "shimmer {}", p.shimmer_local_db);
    }

    #[test]
    fn test_too_short_frame_is_unmeasurable() {
        let samples = sine(100.0, 200);
        assert!(measure(&samples, 100.0, SAMPLE_RATE).is_none());
    }

    #[test]
    fn test_silence_is_unmeasurable() {
        assert!(measure(&vec![0.0; 960], 200.0, SAMPLE_RATE).is_none());
    }
}
