use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AlignError, CorrelationAlgorithm, Result, ScanTable};

/// Single strongest alignment across every algorithm and window of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub algorithm: CorrelationAlgorithm,
    pub peak_value: f64,
    pub lag_seconds: f64,
    pub window_index: usize,
}

impl BestMatch {
    /// Whether the peak score is strictly above `threshold`.
    pub fn is_similar(&self, threshold: f64) -> bool {
        self.peak_value > threshold
    }
}

impl fmt::Display for BestMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Best match using '{}': corr={:.3} at lag={:.2}s",
            self.algorithm, self.peak_value, self.lag_seconds
        )
    }
}

/// Picks the global maximum `peak_value` from `table`.
///
/// Algorithms are visited in table order and windows by ascending index; a
/// later result only replaces the current best when strictly greater. Ties
/// therefore go to the algorithm listed first and, within it, to the lowest
/// window index.
pub fn select(table: &ScanTable) -> Result<BestMatch> {
    let mut best: Option<BestMatch> = None;

    for entry in table.iter() {
        for result in &entry.windows {
            let better = best
                .as_ref()
                .map(|current| result.peak_value > current.peak_value)
                .unwrap_or(!result.peak_value.is_nan());
            if better {
                best = Some(BestMatch {
                    algorithm: entry.algorithm,
                    peak_value: result.peak_value,
                    lag_seconds: result.peak_lag_seconds,
                    window_index: result.window_index,
                });
            }
        }
    }

    best.ok_or(AlignError::EmptyTable)
}
