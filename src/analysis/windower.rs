// Windower - fixed-size overlapping analysis frames
//
// Frames are produced lazily from a SignalBuffer. The sequence is finite and
// restartable: calling `frames()` again yields the same frames from the
// beginning, which the LLD stage relies on for its second pass once voicing
// decisions are known.
//
// Wider context windows (the 60 ms pitch frame) are taken centred on the
// primary frame via `centered_slice`, zero-padded at the signal edges, so
// every descriptor stays aligned to the same frame index.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::f64::consts::PI;

use crate::signal::SignalBuffer;

/// Handling of the trailing frame that does not fit a full window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Drop the final frame if it is shorter than the window
    Drop,
    /// Zero-pad the final frame to the window length
    ZeroPad,
}

/// Tapering function applied to a frame before spectral analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowShape {
    Hamming,
    /// Gaussian with sigma relative to half the window length
    Gaussian { sigma: f64 },
}

impl WindowShape {
    /// Generate window coefficients of length `n`
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        if n <= 1 {
            return vec![1.0; n];
        }
        let last = (n - 1) as f64;
        match *self {
            WindowShape::Hamming => (0..n)
                .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / last).cos())
                .collect(),
            WindowShape::Gaussian { sigma } => {
                let half = last / 2.0;
                (0..n)
                    .map(|i| {
                        let x = (i as f64 - half) / (sigma * half);
                        (-0.5 * x * x).exp()
                    })
                    .collect()
            }
        }
    }
}

/// One analysis frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<'a> {
    /// Position in the frame sequence
    pub index: usize,
    /// Offset of the first sample in the signal
    pub start: usize,
    /// Exactly `window_len` samples (zero-padded under `EdgePolicy::ZeroPad`)
    pub samples: Cow<'a, [f64]>,
    /// Set by the LLD stage once the pitch path is decided
    pub voiced: Option<bool>,
}

impl Frame<'_> {
    /// Sample index of the frame centre
    pub fn center(&self) -> usize {
        self.start + self.samples.len() / 2
    }

    /// Frame centre in seconds
    pub fn time_secs(&self, sample_rate: u32) -> f64 {
        self.center() as f64 / f64::from(sample_rate)
    }
}

/// Slices a signal into overlapping frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameWindower {
    window_len: usize,
    hop_len: usize,
    edge_policy: EdgePolicy,
}

impl FrameWindower {
    /// Create a windower with sizes in samples
    ///
    /// Zero sizes are clamped to one sample.
    pub fn new(window_len: usize, hop_len: usize, edge_policy: EdgePolicy) -> Self {
        Self {
            window_len: window_len.max(1),
            hop_len: hop_len.max(1),
            edge_policy,
        }
    }

    /// Create a windower with sizes in milliseconds at `sample_rate`
    pub fn from_ms(sample_rate: u32, window_ms: f64, hop_ms: f64, edge_policy: EdgePolicy) -> Self {
        let to_samples = |ms: f64| (ms * f64::from(sample_rate) / 1000.0).round() as usize;
        Self::new(to_samples(window_ms), to_samples(hop_ms), edge_policy)
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn hop_len(&self) -> usize {
        self.hop_len
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        match self.edge_policy {
            EdgePolicy::Drop => {
                if len < self.window_len {
                    0
                } else {
                    (len - self.window_len) / self.hop_len + 1
                }
            }
            EdgePolicy::ZeroPad => {
                if len == 0 {
                    0
                } else if len <= self.window_len {
                    1
                } else {
                    (len - self.window_len).div_ceil(self.hop_len) + 1
                }
            }
        }
    }

    /// Lazily iterate the frames of `buffer`
    pub fn frames<'a>(&self, buffer: &'a SignalBuffer) -> Frames<'a> {
        Frames {
            samples: buffer.samples(),
            windower: *self,
            next_index: 0,
            total: self.frame_count(buffer.len()),
        }
    }
}

/// Lazy frame sequence over one signal
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    samples: &'a [f64],
    windower: FrameWindower,
    next_index: usize,
    total: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;

        let start = index * self.windower.hop_len;
        let end = start + self.windower.window_len;
        let samples = if end <= self.samples.len() {
            Cow::Borrowed(&self.samples[start..end])
        } else {
            let mut padded = vec![0.0; self.windower.window_len];
            let available = self.samples.len().saturating_sub(start);
            padded[..available].copy_from_slice(&self.samples[start..start + available]);
            Cow::Owned(padded)
        };

        Some(Frame {
            index,
            start,
            samples,
            voiced: None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Take `len` samples centred on `center`, zero-padding outside the signal
pub fn centered_slice(samples: &[f64], center: usize, len: usize) -> Cow<'_, [f64]> {
    let half = len / 2;
    let start = center as isize - half as isize;
    let end = start + len as isize;

    if start >= 0 && end as usize <= samples.len() {
        return Cow::Borrowed(&samples[start as usize..end as usize]);
    }

    let mut out = vec![0.0; len];
    let src_start = start.max(0) as usize;
    let src_end = (end.max(0) as usize).min(samples.len());
    if src_start < src_end {
        let dst_start = (src_start as isize - start) as usize;
        out[dst_start..dst_start + (src_end - src_start)]
            .copy_from_slice(&samples[src_start..src_end]);
    }
    Cow::Owned(out)
}

/// Multiply `samples` by `window` element-wise
pub fn apply_window(samples: &[f64], window: &[f64]) -> Vec<f64> {
    samples.iter().zip(window).map(|(s, w)| s * w).collect()
}
