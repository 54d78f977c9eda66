//! Media preparation pipeline
//!
//! Incoming attachments are staged to disk until a publish attempt consumes
//! them. Staged files are ephemeral: `release` removes them exactly once and
//! is called on every publish exit path except a transcode failure, where
//! the original is deliberately retained for manual retry.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{MediaError, Result};
use crate::transcode::Transcoder;
use crate::types::{IncomingMedia, MediaAsset, MediaKind, UserId};

pub struct MediaService {
    dir: PathBuf,
}

impl MediaService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist an incoming attachment and classify it.
    ///
    /// The staged path is unique per (user, attachment identity). Nothing is
    /// recorded if the write fails.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Download` if the attachment is empty or cannot
    /// be written to the staging directory.
    pub async fn ingest(&self, user: UserId, incoming: &IncomingMedia) -> Result<MediaAsset> {
        if incoming.bytes.is_empty() {
            return Err(MediaError::Download("attachment has no content".to_string()).into());
        }

        let kind = MediaKind::from_mime(&incoming.mime);
        // Stage under the declared subtype so a non-mp4 video keeps its
        // source extension until transcoding produces the mp4.
        let file_name = match staging_extension(&incoming.mime) {
            Some(ext) => format!("media_{}_{}.{}", user, incoming.unique_id, ext),
            None => format!("media_{}_{}", user, incoming.unique_id),
        };
        let path = self.dir.join(file_name);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MediaError::Download(format!("staging dir unavailable: {}", e)))?;
        tokio::fs::write(&path, &incoming.bytes)
            .await
            .map_err(|e| MediaError::Download(format!("failed to stage attachment: {}", e)))?;

        debug!(%user, path = %path.display(), %kind, "staged attachment");
        Ok(MediaAsset::new(path, kind))
    }

    /// Make an asset uploadable: video not already in the required container
    /// is transcoded, everything else passes through. The derived path is
    /// recorded on the asset so release can clean it up too.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Transcode`; on failure the asset is left
    /// untouched on disk.
    pub async fn prepare_for_publish(
        &self,
        asset: &mut MediaAsset,
        transcoder: &dyn Transcoder,
    ) -> Result<PathBuf> {
        if asset.needs_transcode() {
            let derived = transcoder.transcode(&asset.path).await?;
            asset.derived = Some(derived);
        }
        Ok(asset.upload_path().clone())
    }

    /// Remove the staged file and any transcoded derivative.
    ///
    /// Idempotent: files already gone are treated as released. Other IO
    /// errors are logged and swallowed; cleanup must never fail a publish
    /// outcome that has already been decided.
    pub async fn release(&self, asset: &MediaAsset) {
        for path in std::iter::once(&asset.path).chain(asset.derived.iter()) {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "released staged media"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to release staged media"),
            }
        }
    }
}

/// File extension for staging an attachment of the given mime type.
fn staging_extension(mime: &str) -> Option<String> {
    let subtype = mime.split('/').nth(1)?.trim().to_ascii_lowercase();
    match subtype.as_str() {
        "" => None,
        "jpeg" => Some("jpg".to_string()),
        "quicktime" => Some("mov".to_string()),
        other => Some(other.to_string()),
    }
}

/// Shared handle used across services.
pub type SharedMedia = Arc<MediaService>;
