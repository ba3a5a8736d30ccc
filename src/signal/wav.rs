//! WAV file I/O for the command-line tools and tests.
//!
//! The engine itself only consumes decoded PCM; this is the one place that
//! touches a container format. Samples keep their interleaving and channel
//! count so `SignalBuffer::build` sees exactly what the file holds.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::signal::{DecodedAudio, PcmSamples};

/// Decode a PCM or IEEE-float WAV file
///
/// 16-bit files stay `Int16`; float, 24-bit and 32-bit integer files are
/// scaled to `Float32` in [-1, 1].
pub fn read_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(anyhow!("{} has zero channels", path.display()));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => PcmSamples::Float32(
            reader
                .samples::<f32>()
                .map(|sample| sample.map_err(|err| anyhow!(err)))
                .collect::<Result<Vec<f32>>>()
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => PcmSamples::Int16(
                reader
                    .samples::<i16>()
                    .map(|sample| sample.map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<i16>>>()
                    .with_context(|| format!("reading {}", path.display()))?,
            ),
            bits @ (24 | 32) => {
                let max = ((1i64 << (bits - 1)) - 1) as f32;
                PcmSamples::Float32(
                    reader
                        .samples::<i32>()
                        .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                        .collect::<Result<Vec<f32>>>()
                        .with_context(|| format!("reading {}", path.display()))?,
                )
            }
            other => {
                return Err(anyhow!(
                    "Unsupported bits per sample {} in {}",
                    other,
                    path.display()
                ))
            }
        },
    };

    log::debug!(
        "[Wav] Read {} samples @ {} Hz, {} channel(s) from {}",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        path.display()
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Write decoded audio as a WAV file in its own sample format
pub fn write_wav(path: &Path, audio: &DecodedAudio) -> Result<()> {
    let (bits_per_sample, sample_format) = match &audio.samples {
        PcmSamples::Float32(_) => (32, hound::SampleFormat::Float),
        PcmSamples::Int16(_) => (16, hound::SampleFormat::Int),
    };
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample,
        sample_format,
    };

    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    match &audio.samples {
        PcmSamples::Float32(samples) => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
        PcmSamples::Int16(samples) => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("egemaps_wav_{}_{}.wav", std::process::id(), name))
    }

    #[test]
    fn test_int16_file_keeps_samples() {
        let path = temp_path("int16");
        let audio = DecodedAudio::from_i16(vec![0, 1000, -1000, i16::MAX, i16::MIN, 7], 16_000, 2);
        write_wav(&path, &audio).unwrap();

        let read = read_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(read, audio);
    }

    #[test]
    fn test_float_file_keeps_rate_and_channels() {
        let path = temp_path("float");
        let audio = DecodedAudio::from_f32(vec![0.25, -0.5, 0.75], 22_050, 1);
        write_wav(&path, &audio).unwrap();

        let read = read_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(read.sample_rate, 22_050);
        assert_eq!(read.channels, 1);
        assert_eq!(read.samples, audio.samples);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = read_wav(Path::new("/nonexistent/egemaps.wav")).unwrap_err();
        assert!(format!("{:?}", err).contains("/nonexistent/egemaps.wav"));
    }
}
