// Stats module - statistics over LLD contours
//
// Building blocks for the functionals: 3-frame moving-average smoothing,
// moments, percentiles, monotonic slope runs and segment bookkeeping.
// Functions return `None` when their scope is empty; the aggregator maps
// that to an undefined feature value.

/// Threshold below which a mean or deviation counts as zero
pub const NEAR_ZERO: f64 = 1e-12;

/// Power floor for the equivalent sound level
const LEVEL_FLOOR: f64 = 1e-12;

/// 3-frame symmetric moving average over a dense contour
///
/// The first and last frames average over the two frames available.
pub fn smooth_sma3(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let from = i.saturating_sub(1);
            let to = (i + 1).min(n - 1);
            let window = &values[from..=to];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// 3-frame moving average that skips undefined frames
///
/// Undefined frames stay undefined; a defined frame averages over the
/// defined frames among itself and its two neighbours.
pub fn smooth_sma3_nz(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let n = values.len();
    (0..n)
        .map(|i| {
            values[i]?;
            let from = i.saturating_sub(1);
            let to = (i + 1).min(n - 1);
            let defined: Vec<f64> = values[from..=to].iter().flatten().copied().collect();
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        })
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn stddev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Coefficient of variation, std / |mean|
///
/// A zero mean with zero spread is a constant contour (0.0); a zero mean
/// with non-zero spread has no meaningful ratio (`None`).
pub fn stddev_norm(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let s = stddev(values)?;
    if m.abs() < NEAR_ZERO {
        return if s < NEAR_ZERO { Some(0.0) } else { None };
    }
    Some(s / m.abs())
}

/// Percentile `p` (0-100) by linear interpolation between order statistics
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Least-squares slope of `values` against `times`
pub fn regression_slope(times: &[f64], values: &[f64]) -> Option<f64> {
    let n = times.len().min(values.len());
    if n < 2 {
        return None;
    }
    let mean_t = times[..n].iter().sum::<f64>() / n as f64;
    let mean_v = values[..n].iter().sum::<f64>() / n as f64;
    let (mut covariance, mut variance) = (0.0, 0.0);
    for i in 0..n {
        let dt = times[i] - mean_t;
        covariance += dt * (values[i] - mean_v);
        variance += dt * dt;
    }
    if variance < NEAR_ZERO * NEAR_ZERO {
        return None;
    }
    Some(covariance / variance)
}

/// A contiguous stretch of a contour
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Split an optional contour into its contiguous defined stretches
pub fn defined_segments(times: &[f64], values: &[Option<f64>]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = Segment {
        times: Vec::new(),
        values: Vec::new(),
    };
    for (&t, v) in times.iter().zip(values) {
        match v {
            Some(v) => {
                current.times.push(t);
                current.values.push(*v);
            }
            None if !current.values.is_empty() => {
                segments.push(std::mem::replace(
                    &mut current,
                    Segment {
                        times: Vec::new(),
                        values: Vec::new(),
                    },
                ));
            }
            None => {}
        }
    }
    if !current.values.is_empty() {
        segments.push(current);
    }
    segments
}

/// Slopes of the monotonic runs of a set of segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlopeRuns {
    /// Positive slopes of rising runs (units per second)
    pub rising: Vec<f64>,
    /// Magnitudes of falling-run slopes (units per second)
    pub falling: Vec<f64>,
}

/// Find rising and falling runs between local extrema
///
/// A run spans from one turning point to the next, both included; equal
/// consecutive values extend the current run. Each run's slope is the
/// least-squares fit over its points.
pub fn slope_runs(segments: &[Segment]) -> SlopeRuns {
    let mut runs = SlopeRuns::default();

    for segment in segments {
        let values = &segment.values;
        let n = values.len();
        if n < 2 {
            continue;
        }

        let mut start = 0;
        let mut direction = 0i8;
        for i in 1..n {
            let step = values[i] - values[i - 1];
            let d = if step > 0.0 {
                1
            } else if step < 0.0 {
                -1
            } else {
                0
            };
            if d == 0 {
                continue;
            }
            if direction == 0 {
                direction = d;
            } else if d != direction {
                record_run(&mut runs, segment, start, i - 1, direction);
                start = i - 1;
                direction = d;
            }
        }
        if direction != 0 {
            record_run(&mut runs, segment, start, n - 1, direction);
        }
    }

    runs
}

fn record_run(runs: &mut SlopeRuns, segment: &Segment, start: usize, end: usize, direction: i8) {
    let Some(slope) = regression_slope(&segment.times[start..=end], &segment.values[start..=end]) else {
        return;
    };
    if direction > 0 && slope > 0.0 {
        runs.rising.push(slope);
    } else if direction < 0 && slope < 0.0 {
        runs.falling.push(-slope);
    }
}

/// Lengths (in frames) of consecutive runs of equal flags
pub fn flag_runs(flags: &[bool]) -> Vec<(bool, usize)> {
    let mut runs: Vec<(bool, usize)> = Vec::new();
    for &flag in flags {
        match runs.last_mut() {
            Some((value, length)) if *value == flag => *length += 1,
            _ => runs.push((flag, 1)),
        }
    }
    runs
}

/// Number of local maxima; a plateau counts once
pub fn count_peaks(values: &[f64]) -> usize {
    if values.len() < 3 {
        return 0;
    }
    let mut peaks = 0;
    let mut i = 1;
    while i + 1 < values.len() {
        if values[i] > values[i - 1] {
            // Walk across a plateau
            let mut j = i;
            while j + 1 < values.len() && values[j + 1] == values[i] {
                j += 1;
            }
            if j + 1 < values.len() && values[j + 1] < values[i] {
                peaks += 1;
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    peaks
}

/// 10·log10 of the mean squared frame RMS, floored
pub fn equivalent_sound_level(rms: &[f64]) -> f64 {
    let power = mean(&rms.iter().map(|r| r * r).collect::<Vec<_>>()).unwrap_or(0.0);
    10.0 * power.max(LEVEL_FLOOR).log10()
}
