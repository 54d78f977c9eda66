//! Error types for Postwright

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PostwrightError>;

#[derive(Error, Debug)]
pub enum PostwrightError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Post creation failed: {0}")]
    PostCreation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PostwrightError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PostwrightError::InvalidInput(_) => 3,
            PostwrightError::Config(_) => 2,
            PostwrightError::Generation(_)
            | PostwrightError::Media(_)
            | PostwrightError::PostCreation(_)
            | PostwrightError::InvalidState(_)
            | PostwrightError::NotFound(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures along the media pipeline.
///
/// The variants carry the cleanup contract from the publish path: a transcode
/// failure retains the staged asset for manual retry, while upload and
/// post-creation failures release it.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = PostwrightError::InvalidInput("Empty schedule string".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = PostwrightError::Config(ConfigError::MissingField("media.dir".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_runtime_errors() {
        assert_eq!(
            PostwrightError::Generation("timeout".to_string()).exit_code(),
            1
        );
        assert_eq!(
            PostwrightError::Media(MediaError::Upload("rejected".to_string())).exit_code(),
            1
        );
        assert_eq!(
            PostwrightError::PostCreation("duplicate".to_string()).exit_code(),
            1
        );
        assert_eq!(
            PostwrightError::NotFound("entry".to_string()).exit_code(),
            1
        );
    }

    #[test]
    fn test_error_message_formatting() {
        let error = PostwrightError::Generation("model unavailable".to_string());
        assert_eq!(format!("{}", error), "Generation failed: model unavailable");

        let error = PostwrightError::Media(MediaError::Transcode("ffmpeg exited 1".to_string()));
        assert_eq!(
            format!("{}", error),
            "Media error: Transcode failed: ffmpeg exited 1"
        );

        let error = PostwrightError::InvalidState("no draft to edit".to_string());
        assert_eq!(format!("{}", error), "Invalid state: no draft to edit");
    }

    #[test]
    fn test_error_conversion_from_media_error() {
        let media_error = MediaError::Download("connection reset".to_string());
        let error: PostwrightError = media_error.into();

        match error {
            PostwrightError::Media(MediaError::Download(msg)) => {
                assert_eq!(msg, "connection reset");
            }
            _ => panic!("Expected PostwrightError::Media"),
        }
    }

    #[test]
    fn test_io_error_maps_to_media_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let media_error: MediaError = io_error.into();
        assert!(format!("{}", media_error).contains("IO error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_err() -> Result<()> {
            Err(PostwrightError::NotFound("scheduled entry".to_string()))
        }

        assert!(returns_err().is_err());
    }
}
