use serde::{Deserialize, Serialize};

use crate::{AlignError, Result};

/// Mono sample sequence together with the rate it was sampled at.
///
/// The rate is fixed at construction. Decoding and resampling happen
/// elsewhere; the core only ever sees finished signals.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    /// Wraps decoded samples. Fails when the sample rate is zero.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AlignError::invalid_input(
                "signal sample rate must be positive",
            ));
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Summary statistics over the whole signal. The standard deviation is
    /// the population one, matching what the correlator normalises with.
    pub fn stats(&self) -> SignalStats {
        let (mean, std_dev) = mean_and_std(self.samples.iter().map(|s| f64::from(*s)));
        let peak = self
            .samples
            .iter()
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()));

        SignalStats {
            sample_rate: self.sample_rate,
            samples: self.samples.len(),
            duration_seconds: self.duration_seconds(),
            mean,
            std_dev,
            peak,
        }
    }
}

/// Descriptive numbers for a [`Signal`], reported alongside scan results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub sample_rate: u32,
    pub samples: usize,
    pub duration_seconds: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub peak: f32,
}

/// Mean and population standard deviation in a single pass over `values`.
/// Returns zeros for an empty iterator.
pub(crate) fn mean_and_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0;
    for value in values.clone() {
        sum += value;
        count += 1;
    }
    if count == 0 {
        return (0.0, 0.0);
    }

    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_sample_rate() {
        let err = Signal::new(vec![0.0; 4], 0).unwrap_err();
        assert!(matches!(err, AlignError::InvalidInput(_)));
    }

    #[test]
    fn reports_duration_and_stats() {
        let signal = Signal::new(vec![1.0, -1.0, 1.0, -1.0], 2).unwrap();
        let stats = signal.stats();

        assert_eq!(stats.samples, 4);
        assert!((stats.duration_seconds - 2.0).abs() < 1e-12);
        assert!(stats.mean.abs() < 1e-12);
        assert!((stats.std_dev - 1.0).abs() < 1e-12);
        assert_eq!(stats.peak, 1.0);
    }

    #[test]
    fn stats_of_empty_signal_are_zero() {
        let signal = Signal::new(Vec::new(), 8_000).unwrap();
        let stats = signal.stats();

        assert!(signal.is_empty());
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.peak, 0.0);
    }
}
