//! Normalized cross-correlation between a reference and a query signal.
//!
//! Both inputs are z-score normalised before correlating, so the resulting
//! scores ignore gain and DC offset. The "full" curve covers every partial
//! overlap: for a reference of length `n` and a query of length `m` it has
//! `n + m - 1` entries and index `k` corresponds to a lag of `k - (m - 1)`
//! samples. A positive lag means the query lines up later in the reference.
//!
//! Three interchangeable algorithms compute the same curve:
//!
//! * [`CorrelationAlgorithm::Direct`]: sliding dot product in the time domain.
//! * [`CorrelationAlgorithm::ReversedConvolution`]: linear convolution of the
//!   reference with the time-reversed query.
//! * [`CorrelationAlgorithm::Spectral`]: the same convolution evaluated
//!   through a real FFT, which pays off for long inputs.
//!
//! Normalisation and length scaling live in [`Correlator::correlate`] and are
//! shared by all three, so the algorithms only differ in how they evaluate the
//! raw sum.

use std::{fmt, str::FromStr, sync::Arc};

use realfft::{num_complex::Complex64, ComplexToReal, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{AlignError, Result};

/// Added to the standard deviation so constant (silent) input does not
/// divide by zero.
pub const NORMALIZATION_EPSILON: f64 = 1e-8;

/// Selects how the raw correlation sum is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrelationAlgorithm {
    Direct,
    #[serde(rename = "time-reversed-convolution")]
    ReversedConvolution,
    Spectral,
}

impl CorrelationAlgorithm {
    pub const ALL: [CorrelationAlgorithm; 3] = [
        CorrelationAlgorithm::Direct,
        CorrelationAlgorithm::ReversedConvolution,
        CorrelationAlgorithm::Spectral,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CorrelationAlgorithm::Direct => "direct",
            CorrelationAlgorithm::ReversedConvolution => "time-reversed-convolution",
            CorrelationAlgorithm::Spectral => "spectral",
        }
    }
}

impl fmt::Display for CorrelationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorrelationAlgorithm {
    type Err = AlignError;

    /// Accepts the canonical names as well as `correlate`, `convolve` and
    /// `fftconvolve`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "correlate" => Ok(CorrelationAlgorithm::Direct),
            "time-reversed-convolution" | "convolve" => {
                Ok(CorrelationAlgorithm::ReversedConvolution)
            }
            "spectral" | "fftconvolve" => Ok(CorrelationAlgorithm::Spectral),
            other => Err(AlignError::config(format!(
                "unknown correlation algorithm `{other}`, expected one of: direct, time-reversed-convolution, spectral"
            ))),
        }
    }
}

/// Correlation scores for every integer lag between a reference and a query.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationCurve {
    values: Vec<f64>,
    query_len: usize,
}

impl CorrelationCurve {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Length of the query the curve was computed for.
    pub fn query_len(&self) -> usize {
        self.query_len
    }

    /// Lag in samples represented by `index`.
    pub fn lag_at(&self, index: usize) -> isize {
        index as isize - (self.query_len as isize - 1)
    }

    /// Inclusive range of lags covered by the curve.
    pub fn lag_range(&self) -> (isize, isize) {
        (self.lag_at(0), self.lag_at(self.values.len().saturating_sub(1)))
    }

    /// Score at a lag in samples, `None` outside the covered range.
    pub fn at_lag(&self, lag: isize) -> Option<f64> {
        let index = lag + self.query_len as isize - 1;
        usize::try_from(index)
            .ok()
            .and_then(|index| self.values.get(index).copied())
    }
}

/// Computes normalized cross-correlation curves.
///
/// The correlator owns an FFT planner so the spectral path can reuse plans
/// across calls with the same padded length. It is cheap to create; keep one
/// per thread.
pub struct Correlator {
    planner: RealFftPlanner<f64>,
    fft: Option<FftResources>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    /// Correlates `query` against `reference`.
    ///
    /// The result has `reference.len() + query.len() - 1` scores, each
    /// divided by `reference.len()`. Fails with
    /// [`AlignError::InvalidInput`] when either input is empty.
    pub fn correlate(
        &mut self,
        reference: &[f32],
        query: &[f32],
        algorithm: CorrelationAlgorithm,
    ) -> Result<CorrelationCurve> {
        if reference.is_empty() {
            return Err(AlignError::invalid_input("reference signal is empty"));
        }
        if query.is_empty() {
            return Err(AlignError::invalid_input("query signal is empty"));
        }

        let reference = z_normalize(reference);
        let query = z_normalize(query);

        let mut values = match algorithm {
            CorrelationAlgorithm::Direct => sliding_dot(&reference, &query),
            CorrelationAlgorithm::ReversedConvolution => {
                convolve(&reference, &reversed(&query))
            }
            CorrelationAlgorithm::Spectral => self.fft_convolve(&reference, &reversed(&query))?,
        };

        let scale = reference.len() as f64;
        for value in &mut values {
            *value /= scale;
        }

        Ok(CorrelationCurve {
            values,
            query_len: query.len(),
        })
    }

    fn fft_convolve(&mut self, a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
        let output_len = a.len() + b.len() - 1;
        let size = output_len.next_power_of_two().max(2);
        let fft = self.prepare_fft(size);

        fft.input.iter_mut().for_each(|v| *v = 0.0);
        fft.input[..a.len()].copy_from_slice(a);
        fft.forward
            .process_with_scratch(&mut fft.input, &mut fft.spectrum_a, &mut fft.forward_scratch)?;

        fft.input.iter_mut().for_each(|v| *v = 0.0);
        fft.input[..b.len()].copy_from_slice(b);
        fft.forward
            .process_with_scratch(&mut fft.input, &mut fft.spectrum_b, &mut fft.forward_scratch)?;

        for (x, y) in fft.spectrum_a.iter_mut().zip(fft.spectrum_b.iter()) {
            *x *= *y;
        }
        // The inverse transform requires purely real DC and Nyquist bins.
        if let Some(first) = fft.spectrum_a.first_mut() {
            first.im = 0.0;
        }
        if size % 2 == 0 {
            if let Some(last) = fft.spectrum_a.last_mut() {
                last.im = 0.0;
            }
        }

        fft.inverse.process_with_scratch(
            &mut fft.spectrum_a,
            &mut fft.input,
            &mut fft.inverse_scratch,
        )?;

        // realfft leaves the inverse unnormalised.
        let norm = size as f64;
        Ok(fft.input[..output_len].iter().map(|v| v / norm).collect())
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        let rebuild = self
            .fft
            .as_ref()
            .map(|fft| fft.size != size)
            .unwrap_or(true);
        if rebuild {
            self.fft = None;
        }

        let planner = &mut self.planner;
        self.fft
            .get_or_insert_with(|| FftResources::new(planner, size))
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

struct FftResources {
    size: usize,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    input: Vec<f64>,
    spectrum_a: Vec<Complex64>,
    spectrum_b: Vec<Complex64>,
    forward_scratch: Vec<Complex64>,
    inverse_scratch: Vec<Complex64>,
}

impl FftResources {
    fn new(planner: &mut RealFftPlanner<f64>, size: usize) -> Self {
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        Self {
            size,
            input: forward.make_input_vec(),
            spectrum_a: forward.make_output_vec(),
            spectrum_b: forward.make_output_vec(),
            forward_scratch: forward.make_scratch_vec(),
            inverse_scratch: inverse.make_scratch_vec(),
            forward,
            inverse,
        }
    }
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

/// Subtracts the mean and divides by `std + NORMALIZATION_EPSILON`.
fn z_normalize(samples: &[f32]) -> Vec<f64> {
    let (mean, std_dev) = crate::signal::mean_and_std(samples.iter().map(|s| f64::from(*s)));
    let denom = std_dev + NORMALIZATION_EPSILON;
    samples
        .iter()
        .map(|s| (f64::from(*s) - mean) / denom)
        .collect()
}

fn reversed(samples: &[f64]) -> Vec<f64> {
    samples.iter().rev().copied().collect()
}

/// `out[k] = sum_j reference[j + lag] * query[j]` with `lag = k - (m - 1)`.
fn sliding_dot(reference: &[f64], query: &[f64]) -> Vec<f64> {
    let n = reference.len() as isize;
    let m = query.len() as isize;

    (0..n + m - 1)
        .map(|k| {
            let lag = k - (m - 1);
            let first = (-lag).max(0);
            let last = m.min(n - lag);
            (first..last)
                .map(|j| reference[(j + lag) as usize] * query[j as usize])
                .sum::<f64>()
        })
        .collect()
}

/// Full linear convolution, `out[k] = sum_l a[l] * b[k - l]`.
fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (k, slot) in out.iter_mut().enumerate() {
        let lo = k.saturating_sub(b.len() - 1);
        let hi = k.min(a.len() - 1);
        *slot = (lo..=hi).map(|l| a[l] * b[k - l]).sum::<f64>();
    }
    out
}
