//! Core library for locating a reference clip inside a longer recording.
//!
//! The target recording is cut into overlapping windows, every window is
//! scored against the full reference with normalized cross-correlation, and
//! the strongest (algorithm, window) pair is reported as the best match.
//! Decoding audio files is left to the caller: the crate only consumes
//! [`Signal`] values.

pub mod config;
pub mod correlation;
pub mod error;
pub mod lag;
pub mod report;
pub mod scan;
pub mod select;
pub mod signal;
pub mod window;

pub use config::ScanConfig;
pub use correlation::{CorrelationAlgorithm, CorrelationCurve, Correlator};
pub use error::{AlignError, Result};
pub use lag::Peak;
pub use report::MatchReport;
pub use scan::{AlgorithmResults, MatchScanner, ScanTable, WindowResult};
pub use select::{select, BestMatch};
pub use signal::{Signal, SignalStats};
pub use window::{segment, Window, WindowLayout};
