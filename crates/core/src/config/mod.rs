use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{window::validate_window_params, AlignError, CorrelationAlgorithm, Result};

/// Parameters for a windowed scan of a target recording against a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Window length in seconds.
    pub window_seconds: f64,
    /// Fraction of each window shared with the next one, in `[0, 1)`.
    pub overlap_fraction: f64,
    /// Algorithms to run. The order doubles as the tie-break priority when
    /// selecting the best match.
    pub algorithms: Vec<CorrelationAlgorithm>,
    /// Best-match score above which the two recordings are reported as similar.
    pub similarity_threshold: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_seconds: 3.0,
            overlap_fraction: 0.5,
            algorithms: CorrelationAlgorithm::ALL.to_vec(),
            similarity_threshold: 0.8,
        }
    }
}

impl ScanConfig {
    /// Parses a JSON document; missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks everything that can be checked without knowing the sample rate.
    /// The step size is verified once the signal's rate is known.
    pub fn validate(&self) -> Result<()> {
        validate_window_params(self.window_seconds, self.overlap_fraction)?;

        if self.algorithms.is_empty() {
            return Err(AlignError::config("at least one algorithm is required"));
        }

        let mut seen = HashSet::new();
        for algorithm in &self.algorithms {
            if !seen.insert(*algorithm) {
                return Err(AlignError::config(format!(
                    "algorithm `{algorithm}` is listed more than once"
                )));
            }
        }

        if !self.similarity_threshold.is_finite() {
            return Err(AlignError::config("similarity threshold must be finite"));
        }

        Ok(())
    }
}
