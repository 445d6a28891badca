//! Audio extraction for analysis and speech recognition.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sample rate of extracted analysis audio (Hz).
pub const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

/// Extract mono 16 kHz raw f32le PCM from `input` into `output`.
///
/// The same file feeds the audio analyzer and any speech-recognition
/// collaborator, so it is extracted once per video.
pub async fn extract_audio(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
) -> MediaResult<PathBuf> {
    debug!(
        input = %input.display(),
        output = %output.display(),
        "Extracting analysis audio"
    );

    let cmd = FfmpegCommand::new(input, output)
        .no_video()
        .output_args(["-ac", "1", "-ar"])
        .output_arg(ANALYSIS_SAMPLE_RATE.to_string())
        .format("f32le");

    runner.run(&cmd).await?;

    // Verify output file exists and has content
    let metadata = tokio::fs::metadata(output)
        .await
        .map_err(|_| MediaError::EmptyOutput(output.to_path_buf()))?;
    if metadata.len() == 0 {
        return Err(MediaError::EmptyOutput(output.to_path_buf()));
    }

    debug!(output_size = metadata.len(), "Audio extraction complete");
    Ok(output.to_path_buf())
}

/// Load raw f32le PCM samples written by [`extract_audio`].
pub async fn load_pcm_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(decode_f32le(&bytes))
}

/// Convert bytes to f32 samples (4 bytes per sample, little-endian).
fn decode_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_decode_f32le_ignores_trailing_bytes() {
        let mut bytes = Vec::new();
        for v in [0.5f32, -1.0, 0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(0xff);
        assert_eq!(decode_f32le(&bytes), vec![0.5, -1.0, 0.25]);
    }

    #[tokio::test]
    async fn test_load_pcm_samples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audio.pcm");
        let bytes: Vec<u8> = [0.1f32, 0.2].iter().flat_map(|v| v.to_le_bytes()).collect();
        tokio::fs::write(&path, bytes).await.unwrap();

        let samples = load_pcm_samples(&path).await.unwrap();
        assert_eq!(samples, vec![0.1, 0.2]);
    }
}
