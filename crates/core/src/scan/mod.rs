use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    lag, window, AlignError, CorrelationAlgorithm, Correlator, Result, ScanConfig, Signal,
};

/// Best alignment found for one window under one algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub window_index: usize,
    pub algorithm: CorrelationAlgorithm,
    /// Start of the window within the target, in seconds.
    pub window_start_seconds: f64,
    pub peak_value: f64,
    pub peak_lag_seconds: f64,
}

/// Per-algorithm window results, in the order the algorithms were requested.
/// Each algorithm's results are sorted by window index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanTable {
    entries: Vec<AlgorithmResults>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResults {
    pub algorithm: CorrelationAlgorithm,
    pub windows: Vec<WindowResult>,
}

impl ScanTable {
    /// Builds a table from already ordered entries.
    pub fn from_entries(entries: Vec<AlgorithmResults>) -> Self {
        Self { entries }
    }

    pub fn get(&self, algorithm: CorrelationAlgorithm) -> Option<&[WindowResult]> {
        self.entries
            .iter()
            .find(|entry| entry.algorithm == algorithm)
            .map(|entry| entry.windows.as_slice())
    }

    pub fn algorithms(&self) -> impl Iterator<Item = CorrelationAlgorithm> + '_ {
        self.entries.iter().map(|entry| entry.algorithm)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlgorithmResults> {
        self.entries.iter()
    }

    /// True when no algorithm has any window result.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|entry| entry.windows.is_empty())
    }

    /// Number of windows scanned, taken from the first algorithm.
    pub fn window_count(&self) -> usize {
        self.entries
            .first()
            .map(|entry| entry.windows.len())
            .unwrap_or(0)
    }
}

/// Slides windows of a target recording over a reference and scores every
/// window with every configured algorithm.
#[derive(Debug, Clone)]
pub struct MatchScanner {
    config: ScanConfig,
}

impl MatchScanner {
    /// Validates `config` up front so a scan never starts with bad settings.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan(&self, reference: &Signal, target: &Signal) -> Result<ScanTable> {
        self.scan_with_cancel(reference, target, &AtomicBool::new(false))
    }

    /// Same as [`MatchScanner::scan`], but stops with
    /// [`AlignError::Cancelled`] once `cancel` is set. The flag is polled
    /// before each window/algorithm job.
    pub fn scan_with_cancel(
        &self,
        reference: &Signal,
        target: &Signal,
        cancel: &AtomicBool,
    ) -> Result<ScanTable> {
        if reference.sample_rate() != target.sample_rate() {
            return Err(AlignError::SampleRateMismatch {
                reference: reference.sample_rate(),
                target: target.sample_rate(),
            });
        }
        if reference.is_empty() {
            return Err(AlignError::invalid_input("reference signal is empty"));
        }

        let sample_rate = reference.sample_rate();
        let windows = window::segment(
            target,
            self.config.window_seconds,
            self.config.overlap_fraction,
        )?;
        let algorithms = &self.config.algorithms;

        debug!(
            windows = windows.len(),
            algorithms = algorithms.len(),
            sample_rate,
            "scanning target against reference"
        );

        // Algorithm-major job order, so each algorithm's results end up
        // contiguous and sorted by window index after the indexed collect.
        let jobs: Vec<(CorrelationAlgorithm, &window::Window<'_>)> = algorithms
            .iter()
            .flat_map(|algorithm| windows.iter().map(move |window| (*algorithm, window)))
            .collect();

        let results = jobs
            .par_iter()
            .map_init(Correlator::new, |correlator, (algorithm, window)| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(AlignError::Cancelled);
                }

                let curve = correlator.correlate(reference.samples(), window.samples, *algorithm)?;
                let peak = lag::extract(&curve, window.len(), sample_rate)?;
                Ok(WindowResult {
                    window_index: window.index,
                    algorithm: *algorithm,
                    window_start_seconds: window.start_seconds(sample_rate),
                    peak_value: peak.value,
                    peak_lag_seconds: peak.lag_seconds,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut results = results.into_iter();
        let entries = algorithms
            .iter()
            .map(|algorithm| {
                let windows: Vec<WindowResult> = results.by_ref().take(windows.len()).collect();
                info!(algorithm = %algorithm, windows = windows.len(), "correlation done");
                AlgorithmResults {
                    algorithm: *algorithm,
                    windows,
                }
            })
            .collect();

        Ok(ScanTable { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as f32 / 65_536.0 - 0.5
            })
            .collect()
    }

    fn config(window_seconds: f64, overlap_fraction: f64) -> ScanConfig {
        ScanConfig {
            window_seconds,
            overlap_fraction,
            ..Default::default()
        }
    }

    #[test]
    fn mismatched_rates_fail_before_scanning() {
        let scanner = MatchScanner::new(ScanConfig::default()).unwrap();
        let reference = Signal::new(noise(16_000, 1), 16_000).unwrap();
        let target = Signal::new(noise(22_050, 2), 22_050).unwrap();

        let err = scanner.scan(&reference, &target).unwrap_err();
        assert!(matches!(
            err,
            AlignError::SampleRateMismatch {
                reference: 16_000,
                target: 22_050
            }
        ));
    }

    #[test]
    fn invalid_config_is_rejected_on_construction() {
        assert!(matches!(
            MatchScanner::new(config(-1.0, 0.5)).unwrap_err(),
            AlignError::Config(_)
        ));
    }

    #[test]
    fn locates_target_windows_inside_reference() {
        let sample_rate = 100;
        let reference_samples = noise(1_000, 3);
        // Target is the reference from 2.0s to 6.0s.
        let target = Signal::new(reference_samples[200..600].to_vec(), sample_rate).unwrap();
        let reference = Signal::new(reference_samples, sample_rate).unwrap();

        let scanner = MatchScanner::new(config(1.0, 0.5)).unwrap();
        let table = scanner.scan(&reference, &target).unwrap();

        assert_eq!(
            table.algorithms().collect::<Vec<_>>(),
            CorrelationAlgorithm::ALL.to_vec()
        );
        assert_eq!(table.window_count(), 7);

        for entry in table.iter() {
            assert_eq!(entry.windows.len(), 7);
            for (expected_index, result) in entry.windows.iter().enumerate() {
                assert_eq!(result.window_index, expected_index);
                assert_eq!(result.algorithm, entry.algorithm);
                let expected_lag = 2.0 + result.window_start_seconds;
                assert!(
                    (result.peak_lag_seconds - expected_lag).abs() < 1e-9,
                    "{}: window {} lag {}",
                    entry.algorithm,
                    expected_index,
                    result.peak_lag_seconds
                );
                // Scores are scaled by the reference length, 10x the window here.
                assert!(result.peak_value > 0.05);
            }
        }
    }

    #[test]
    fn algorithms_produce_matching_tables() {
        let reference = Signal::new(noise(600, 4), 50).unwrap();
        let target = Signal::new(noise(300, 5), 50).unwrap();

        let scanner = MatchScanner::new(config(2.0, 0.25)).unwrap();
        let table = scanner.scan(&reference, &target).unwrap();

        let direct = table.get(CorrelationAlgorithm::Direct).unwrap();
        for algorithm in [
            CorrelationAlgorithm::ReversedConvolution,
            CorrelationAlgorithm::Spectral,
        ] {
            let other = table.get(algorithm).unwrap();
            for (a, b) in direct.iter().zip(other) {
                assert!((a.peak_value - b.peak_value).abs() < 1e-6);
                assert_eq!(a.peak_lag_seconds, b.peak_lag_seconds);
            }
        }
    }

    #[test]
    fn short_target_yields_empty_table() {
        let reference = Signal::new(noise(500, 6), 100).unwrap();
        let target = Signal::new(noise(50, 7), 100).unwrap();

        let table = MatchScanner::new(ScanConfig::default())
            .unwrap()
            .scan(&reference, &target)
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.window_count(), 0);
    }

    #[test]
    fn empty_reference_is_invalid_input() {
        let reference = Signal::new(Vec::new(), 100).unwrap();
        let target = Signal::new(noise(500, 8), 100).unwrap();

        let err = MatchScanner::new(ScanConfig::default())
            .unwrap()
            .scan(&reference, &target)
            .unwrap_err();
        assert!(matches!(err, AlignError::InvalidInput(_)));
    }

    #[test]
    fn honours_cancellation_flag() {
        let reference = Signal::new(noise(500, 9), 100).unwrap();
        let target = Signal::new(noise(500, 10), 100).unwrap();
        let cancel = AtomicBool::new(true);

        let err = MatchScanner::new(config(1.0, 0.5))
            .unwrap()
            .scan_with_cancel(&reference, &target, &cancel)
            .unwrap_err();
        assert!(matches!(err, AlignError::Cancelled));
    }
}
