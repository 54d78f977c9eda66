//! Mock platform implementation for testing
//!
//! Configurable mock that can simulate upload and post-creation successes,
//! failures, and latency, while recording every call for verification. Used
//! by integration tests and by the console frontend's dry-run mode.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{MediaError, PostwrightError, Result};
use crate::platforms::Platform;
use crate::types::{MediaHandle, MediaKind};

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name
    pub name: String,

    /// Whether media uploads should succeed
    pub upload_succeeds: bool,

    /// Whether post creation should succeed
    pub post_succeeds: bool,

    /// Error to return on upload failure
    pub upload_error: Option<String>,

    /// Error to return on post-creation failure
    pub post_error: Option<String>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Character limit for validation
    pub character_limit: Option<usize>,

    /// Uploads that have been made (for verification)
    pub uploads: Arc<Mutex<Vec<(PathBuf, MediaKind)>>>,

    /// Posts that have been made (for verification)
    pub posts: Arc<Mutex<Vec<(String, Vec<MediaHandle>)>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            upload_succeeds: true,
            post_succeeds: true,
            upload_error: None,
            post_error: None,
            delay: Duration::from_millis(0),
            character_limit: Some(280),
            uploads: Arc::new(Mutex::new(Vec::new())),
            posts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A platform where every call succeeds.
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// A platform whose media uploads fail.
    pub fn upload_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            upload_succeeds: false,
            upload_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// A platform whose post creation fails.
    pub fn post_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_succeeds: false,
            post_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// A platform with simulated latency on every call.
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    pub fn upload_count(&self) -> usize {
        self.config.uploads.lock().unwrap().len()
    }

    pub fn post_count(&self) -> usize {
        self.config.posts.lock().unwrap().len()
    }

    /// All uploads made, in order.
    pub fn uploads(&self) -> Vec<(PathBuf, MediaKind)> {
        self.config.uploads.lock().unwrap().clone()
    }

    /// All posts made, in order.
    pub fn posts(&self) -> Vec<(String, Vec<MediaHandle>)> {
        self.config.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn upload_media(&self, path: &Path, kind: MediaKind) -> Result<MediaHandle> {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if !self.config.upload_succeeds {
            let msg = self
                .config
                .upload_error
                .clone()
                .unwrap_or_else(|| "Mock upload failed".to_string());
            return Err(MediaError::Upload(msg).into());
        }

        self.config
            .uploads
            .lock()
            .unwrap()
            .push((path.to_path_buf(), kind));

        Ok(MediaHandle(format!(
            "{}:media-{}",
            self.config.name,
            uuid::Uuid::new_v4()
        )))
    }

    async fn create_post(&self, text: &str, media: &[MediaHandle]) -> Result<String> {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if !self.config.post_succeeds {
            let msg = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock post creation failed".to_string());
            return Err(PostwrightError::PostCreation(msg));
        }

        self.config
            .posts
            .lock()
            .unwrap()
            .push((text.to_string(), media.to_vec()));

        Ok(format!("{}:post-{}", self.config.name, uuid::Uuid::new_v4()))
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::success("test");

        assert_eq!(platform.name(), "test");
        assert_eq!(platform.character_limit(), Some(280));

        let handle = platform
            .upload_media(Path::new("/tmp/a.jpg"), MediaKind::Image)
            .await
            .unwrap();
        assert!(handle.0.starts_with("test:media-"));
        assert_eq!(platform.upload_count(), 1);

        let post_id = platform
            .create_post("Test content", &[handle.clone()])
            .await
            .unwrap();
        assert!(post_id.starts_with("test:post-"));

        let posts = platform.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "Test content");
        assert_eq!(posts[0].1, vec![handle]);
    }

    #[tokio::test]
    async fn test_mock_upload_failure() {
        let platform = MockPlatform::upload_failure("test", "media rejected");

        let result = platform
            .upload_media(Path::new("/tmp/a.jpg"), MediaKind::Image)
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("media rejected"));
        assert_eq!(platform.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_post_failure() {
        let platform = MockPlatform::post_failure("test", "duplicate status");

        let result = platform.create_post("Test", &[]).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("duplicate status"));
        assert_eq!(platform.post_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let platform = MockPlatform::with_delay("test", Duration::from_millis(50));

        let start = std::time::Instant::now();
        platform.create_post("Test", &[]).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_validate_content_limit() {
        let platform = MockPlatform::success("test");

        assert!(platform.validate_content("Short").is_ok());

        let long = "x".repeat(281);
        let result = platform.validate_content(&long);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("character limit"));
    }

    #[tokio::test]
    async fn test_validate_content_empty() {
        let platform = MockPlatform::success("test");
        let result = platform.validate_content("   ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }
}
