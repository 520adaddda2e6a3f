use std::path::Path;

use audio_align_core::{AlignError, Result, Signal};
use hound::{SampleFormat, WavReader};

/// Decodes a WAV file into a mono [`Signal`].
///
/// Integer samples are scaled into `[-1, 1]` by their bit depth. Interleaved
/// channels are averaged into a single channel.
pub fn load_wav(path: &Path) -> Result<Signal> {
    let mut reader = WavReader::open(path).map_err(decode_error)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_error)?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_error)?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        samples = samples.len(),
        "decoded wav"
    );

    Signal::new(samples, spec.sample_rate)
}

fn decode_error(err: hound::Error) -> AlignError {
    AlignError::Decode(err.to_string())
}
