use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{select, BestMatch, MatchScanner, Result, ScanConfig, ScanTable, Signal, SignalStats};

/// Everything a caller needs to present the outcome of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub reference: SignalStats,
    pub target: SignalStats,
    pub config: ScanConfig,
    pub table: ScanTable,
    pub best: BestMatch,
    /// Whether `best.peak_value` exceeds `config.similarity_threshold`.
    pub similar: bool,
}

impl MatchReport {
    /// Runs a full scan and selects the best match.
    pub fn generate(scanner: &MatchScanner, reference: &Signal, target: &Signal) -> Result<Self> {
        let table = scanner.scan(reference, target)?;
        Self::from_table(scanner.config().clone(), reference, target, table)
    }

    /// Wraps an existing table. Fails with [`crate::AlignError::EmptyTable`]
    /// when the table holds no results.
    pub fn from_table(
        config: ScanConfig,
        reference: &Signal,
        target: &Signal,
        table: ScanTable,
    ) -> Result<Self> {
        let best = select(&table)?;
        let similar = best.is_similar(config.similarity_threshold);

        Ok(Self {
            reference: reference.stats(),
            target: target.stats(),
            config,
            table,
            best,
            similar,
        })
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.best, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlignError, CorrelationAlgorithm};

    fn chirp(len: usize) -> Vec<f32> {
        (0..len).map(|i| ((i * i) as f32 * 0.0007).sin()).collect()
    }

    #[test]
    fn self_match_report_is_similar_at_zero_lag() {
        let signal = Signal::new(chirp(400), 100).unwrap();
        let scanner = MatchScanner::new(ScanConfig {
            window_seconds: 4.0,
            overlap_fraction: 0.0,
            algorithms: vec![CorrelationAlgorithm::Spectral, CorrelationAlgorithm::Direct],
            ..Default::default()
        })
        .unwrap();

        let report = MatchReport::generate(&scanner, &signal, &signal).unwrap();

        assert_eq!(report.table.window_count(), 1);
        assert_eq!(report.best.window_index, 0);
        assert_eq!(report.best.lag_seconds, 0.0);
        assert!((report.best.peak_value - 1.0).abs() < 1e-6);
        assert!(report.similar);
        assert_eq!(report.reference.samples, 400);
    }

    #[test]
    fn report_round_trips_through_json() {
        let signal = Signal::new(chirp(300), 100).unwrap();
        let scanner = MatchScanner::new(ScanConfig {
            window_seconds: 1.0,
            ..Default::default()
        })
        .unwrap();

        let report = MatchReport::generate(&scanner, &signal, &signal).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["best"]["window_index"], serde_json::json!(report.best.window_index));
        assert_eq!(
            json["table"]["entries"][0]["algorithm"],
            serde_json::json!("direct")
        );
        assert!(report.to_string().starts_with("Best match using '"));
    }

    #[test]
    fn empty_scan_cannot_be_reported() {
        let reference = Signal::new(chirp(300), 100).unwrap();
        let target = Signal::new(chirp(50), 100).unwrap();
        let scanner = MatchScanner::new(ScanConfig::default()).unwrap();

        let err = MatchReport::generate(&scanner, &reference, &target).unwrap_err();
        assert!(matches!(err, AlignError::EmptyTable));
    }
}
