//! Video transcoding collaborator
//!
//! The publishing platform requires mp4/h264 video. Anything else goes
//! through an external ffmpeg step with fixed parameters before upload.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{MediaError, Result};

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `input` into the required container/codec, returning the
    /// path of the new file. The input file is left in place.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Transcode` if the external step fails or the
    /// expected output file does not appear.
    async fn transcode(&self, input: &Path) -> Result<PathBuf>;
}

/// Derive the output path next to the input: `clip.webm` → `clip_converted.mp4`.
fn converted_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    input.with_file_name(format!("{}_converted.mp4", stem))
}

/// Transcoder shelling out to ffmpeg.
///
/// Parameters are fixed: h264 video with the fast preset, aac audio,
/// mp4 container.
pub struct FfmpegTranscoder;

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path) -> Result<PathBuf> {
        let output = converted_path(input);
        debug!(input = %input.display(), output = %output.display(), "starting ffmpeg");

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c:v", "libx264", "-preset", "fast", "-c:a", "aac"])
            .arg(&output)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| MediaError::Transcode(format!("failed to run ffmpeg: {}", e)))?;

        if !status.success() {
            return Err(MediaError::Transcode(format!(
                "ffmpeg exited with {} for {}",
                status,
                input.display()
            ))
            .into());
        }

        if !output.exists() {
            return Err(MediaError::Transcode(format!(
                "ffmpeg produced no output for {}",
                input.display()
            ))
            .into());
        }

        info!(output = %output.display(), "transcode complete");
        Ok(output)
    }
}

/// Mock transcoder for testing and dry runs: copies the input to the
/// converted path, or fails on demand.
pub struct MockTranscoder {
    fail: bool,
}

impl MockTranscoder {
    pub fn success() -> Self {
        Self { fail: false }
    }

    pub fn failure() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(&self, input: &Path) -> Result<PathBuf> {
        if self.fail {
            return Err(
                MediaError::Transcode(format!("mock transcode failed for {}", input.display()))
                    .into(),
            );
        }

        let output = converted_path(input);
        tokio::fs::copy(input, &output)
            .await
            .map_err(|e| MediaError::Transcode(format!("mock copy failed: {}", e)))?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_path_replaces_extension() {
        assert_eq!(
            converted_path(Path::new("/tmp/media_1_ab.webm")),
            PathBuf::from("/tmp/media_1_ab_converted.mp4")
        );
    }

    #[test]
    fn test_converted_path_without_extension() {
        assert_eq!(
            converted_path(Path::new("/tmp/media_1_ab")),
            PathBuf::from("/tmp/media_1_ab_converted.mp4")
        );
    }

    #[tokio::test]
    async fn test_mock_transcoder_copies_to_converted_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.webm");
        tokio::fs::write(&input, b"not really video").await.unwrap();

        let out = MockTranscoder::success().transcode(&input).await.unwrap();
        assert_eq!(out, dir.path().join("clip_converted.mp4"));
        assert!(out.exists());
        // Input is left in place
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_mock_transcoder_failure() {
        let result = MockTranscoder::failure()
            .transcode(Path::new("/tmp/clip.webm"))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Transcode failed"));
    }
}
