use crate::{AlignError, Result, Signal};

/// Borrowed, fixed-length slice of a [`Signal`].
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// Position of the window in the sequence produced by [`segment`].
    pub index: usize,
    /// Offset of the first sample within the parent signal.
    pub start: usize,
    pub samples: &'a [f32],
}

impl Window<'_> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Start offset in seconds for a signal sampled at `sample_rate`.
    pub fn start_seconds(&self, sample_rate: u32) -> f64 {
        self.start as f64 / sample_rate as f64
    }
}

/// Sample counts derived from a window configuration at a given rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    pub window_length: usize,
    pub step: usize,
}

impl WindowLayout {
    /// Converts `window_seconds`/`overlap_fraction` into sample counts.
    ///
    /// Both counts are floored. A layout whose window or step rounds down to
    /// zero samples is rejected, since it would never advance.
    pub fn new(window_seconds: f64, overlap_fraction: f64, sample_rate: u32) -> Result<Self> {
        validate_window_params(window_seconds, overlap_fraction)?;

        let window_length = (window_seconds * sample_rate as f64).floor() as usize;
        if window_length == 0 {
            return Err(AlignError::config(format!(
                "window of {window_seconds}s is shorter than one sample at {sample_rate} Hz"
            )));
        }

        let step = (window_length as f64 * (1.0 - overlap_fraction)).floor() as usize;
        if step == 0 {
            return Err(AlignError::config(format!(
                "window of {window_length} samples with overlap {overlap_fraction} has a step of zero samples"
            )));
        }

        Ok(Self {
            window_length,
            step,
        })
    }

    /// Number of full windows that fit into `len` samples.
    pub fn count(&self, len: usize) -> usize {
        if len < self.window_length {
            0
        } else {
            (len - self.window_length) / self.step + 1
        }
    }
}

pub(crate) fn validate_window_params(window_seconds: f64, overlap_fraction: f64) -> Result<()> {
    if !window_seconds.is_finite() || window_seconds <= 0.0 {
        return Err(AlignError::config(format!(
            "window length must be a positive number of seconds, got {window_seconds}"
        )));
    }
    if !(0.0..1.0).contains(&overlap_fraction) {
        return Err(AlignError::config(format!(
            "overlap fraction must lie in [0, 1), got {overlap_fraction}"
        )));
    }
    Ok(())
}

/// Splits `signal` into overlapping windows starting at `0, step, 2*step, ..`.
///
/// Only windows that fit entirely inside the signal are produced; a trailing
/// remainder shorter than the window length is dropped rather than padded.
pub fn segment(signal: &Signal, window_seconds: f64, overlap_fraction: f64) -> Result<Vec<Window<'_>>> {
    let layout = WindowLayout::new(window_seconds, overlap_fraction, signal.sample_rate())?;
    let samples = signal.samples();

    Ok((0..layout.count(samples.len()))
        .map(|index| {
            let start = index * layout.step;
            Window {
                index,
                start,
                samples: &samples[start..start + layout.window_length],
            }
        })
        .collect())
}
