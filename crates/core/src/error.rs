/// Result alias that carries the custom [`AlignError`] type.
pub type Result<T> = std::result::Result<T, AlignError>;

/// Common error type for the alignment pipeline.
///
/// Every variant is surfaced to the caller as-is. None of them describe a
/// transient condition, so nothing in the crate retries.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Rejected configuration: bad window length, a step of zero samples,
    /// an unknown algorithm name and similar.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Input data the pipeline cannot work with, e.g. an empty signal.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Reference and target were decoded at different sampling rates.
    #[error("sample rate mismatch: reference is {reference} Hz, target is {target} Hz")]
    SampleRateMismatch { reference: u32, target: u32 },
    /// Best-match selection was attempted on a table without any results.
    #[error("scan table contains no window results")]
    EmptyTable,
    /// The scan was stopped through its cancellation flag.
    #[error("scan cancelled")]
    Cancelled,
    /// Failure reported by the FFT backend.
    #[error(transparent)]
    Fft(#[from] realfft::FftError),
    /// Failure while turning an audio file into a [`crate::Signal`].
    #[error("failed to decode audio: {0}")]
    Decode(String),
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl AlignError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<&str> for AlignError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AlignError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<serde_json::Error> for AlignError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}
