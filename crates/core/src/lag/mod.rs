use serde::{Deserialize, Serialize};

use crate::{AlignError, CorrelationCurve, Result};

/// Highest score of a correlation curve and the lag it occurs at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub value: f64,
    pub lag_samples: isize,
    pub lag_seconds: f64,
}

/// Locates the maximum of `curve` and converts its index into a lag.
///
/// `lag_seconds = (argmax - query_length + 1) / sample_rate`. When several
/// indices share the maximum, the smallest index wins. NaN scores never win.
pub fn extract(curve: &CorrelationCurve, query_length: usize, sample_rate: u32) -> Result<Peak> {
    if sample_rate == 0 {
        return Err(AlignError::invalid_input("sample rate must be positive"));
    }

    let (index, value) = curve
        .values()
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, value)| !value.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (index, value)| match best {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((index, value)),
        })
        .ok_or_else(|| AlignError::invalid_input("correlation curve has no comparable scores"))?;

    let lag_samples = index as isize - query_length as isize + 1;
    Ok(Peak {
        value,
        lag_samples,
        lag_seconds: lag_samples as f64 / sample_rate as f64,
    })
}

/// Convenience wrapper that uses the query length recorded in the curve.
pub fn extract_peak(curve: &CorrelationCurve, sample_rate: u32) -> Result<Peak> {
    extract(curve, curve.query_len(), sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CorrelationAlgorithm, Correlator};

    fn curve_for(reference: &[f32], query: &[f32]) -> CorrelationCurve {
        Correlator::new()
            .correlate(reference, query, CorrelationAlgorithm::Direct)
            .unwrap()
    }

    #[test]
    fn finds_offset_of_embedded_query() {
        let mut state = 12_345u32;
        let reference: Vec<f32> = (0..200)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as f32 / 65_536.0 - 0.5
            })
            .collect();
        let query = reference[60..100].to_vec();
        let curve = curve_for(&reference, &query);

        let peak = extract(&curve, query.len(), 100).unwrap();
        assert_eq!(peak.lag_samples, 60);
        assert!((peak.lag_seconds - 0.6).abs() < 1e-12);
    }

    #[test]
    fn self_match_is_at_zero_seconds() {
        let signal: Vec<f32> = (0..64).map(|i| (i as f32 * 0.4).sin()).collect();
        let curve = curve_for(&signal, &signal);

        let peak = extract_peak(&curve, 16_000).unwrap();
        assert_eq!(peak.lag_samples, 0);
        assert_eq!(peak.lag_seconds, 0.0);
        assert!((peak.value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ties_resolve_to_first_index() {
        // A constant reference normalises to zero, so every lag scores zero.
        let curve = curve_for(&[1.0; 5], &[1.0, 2.0, 3.0]);
        let peak = extract(&curve, 3, 10).unwrap();

        assert_eq!(peak.lag_samples, -2);
        assert!((peak.lag_seconds + 0.2).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let curve = curve_for(&[1.0, 2.0], &[1.0]);
        assert!(matches!(
            extract(&curve, 1, 0).unwrap_err(),
            AlignError::InvalidInput(_)
        ));
    }
}
