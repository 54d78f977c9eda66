//! Publishing platform abstraction
//!
//! The publishing platform is an external collaborator with two calls and a
//! strict ordering between them: media is uploaded first to obtain handles,
//! then the post is created referencing those handles. Implementations wrap
//! a real platform API; this crate ships the trait and a configurable mock.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{PostwrightError, Result};
use crate::types::{MediaHandle, MediaKind};

// Mock platform is available for all builds (not just tests) to support
// integration tests and the console frontend's dry-run mode.
pub mod mock;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Upload a staged media file, returning the platform's handle for it.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Upload` wrapped in the crate error. An upload
    /// failure aborts the whole publish attempt; the text post is never
    /// created without its media.
    async fn upload_media(&self, path: &Path, kind: MediaKind) -> Result<MediaHandle>;

    /// Create the post with the given text and any previously uploaded
    /// media handles. Returns the platform's post id.
    ///
    /// # Errors
    ///
    /// Returns `PostwrightError::PostCreation`. Already-uploaded media is
    /// not rolled back on failure.
    async fn create_post(&self, text: &str, media: &[MediaHandle]) -> Result<String>;

    /// Validate content before posting. Runs before any media is touched,
    /// so a validation failure leaves the staged asset in place.
    fn validate_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(PostwrightError::InvalidInput(
                "Content cannot be empty".to_string(),
            ));
        }
        if let Some(limit) = self.character_limit() {
            let len = content.chars().count();
            if len > limit {
                return Err(PostwrightError::InvalidInput(format!(
                    "Content exceeds {} character limit (got {} characters)",
                    limit, len
                )));
            }
        }
        Ok(())
    }

    /// Lowercase platform identifier (e.g. "twitter").
    fn name(&self) -> &str;

    /// Maximum post length, or `None` if the platform has no hard limit.
    fn character_limit(&self) -> Option<usize> {
        Some(280)
    }
}
