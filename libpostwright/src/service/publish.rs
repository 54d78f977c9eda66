//! Publication executor
//!
//! Runs one publish attempt end to end with a strict upload-before-post
//! ordering, and owns the staged-media cleanup contract:
//!
//! - validation failure: nothing attempted, asset untouched;
//! - transcode failure: attempt aborted, asset retained for manual retry;
//! - upload failure: attempt aborted, asset released, no post created;
//! - post-creation failure: asset released, uploaded media not rolled back;
//! - success: asset released.
//!
//! Every terminal outcome is announced on the event bus. Nothing is retried
//! automatically; retry is always a fresh operator action.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::events::{Event, EventBus, PublishStage};
use crate::error::{MediaError, PostwrightError, Result};
use crate::media::MediaService;
use crate::platforms::Platform;
use crate::transcode::Transcoder;
use crate::types::{MediaHandle, PostContent, UserId};

pub struct PublishService {
    platform: Arc<dyn Platform>,
    transcoder: Arc<dyn Transcoder>,
    media: Arc<MediaService>,
    events: EventBus,
}

impl PublishService {
    pub fn new(
        platform: Arc<dyn Platform>,
        transcoder: Arc<dyn Transcoder>,
        media: Arc<MediaService>,
        events: EventBus,
    ) -> Self {
        Self {
            platform,
            transcoder,
            media,
            events,
        }
    }

    /// Execute one publish attempt. `entry_id` is set when this attempt is a
    /// scheduled entry firing, so notifications can reference it.
    ///
    /// # Errors
    ///
    /// Propagates the stage failure after performing the cleanup described
    /// in the module docs. The caller decides draft bookkeeping from the
    /// error variant.
    pub async fn publish(
        &self,
        user: UserId,
        content: &mut PostContent,
        entry_id: Option<Uuid>,
    ) -> Result<String> {
        if let Err(e) = self.platform.validate_content(&content.text) {
            self.events.emit(Event::PublishFailed {
                user,
                stage: PublishStage::Validation,
                error: e.to_string(),
                entry_id,
            });
            return Err(e);
        }

        let mut handles: Vec<MediaHandle> = Vec::new();

        if let Some(asset) = content.media.as_mut() {
            let upload_path = match self.media.prepare_for_publish(asset, &*self.transcoder).await
            {
                Ok(path) => path,
                Err(e) => {
                    warn!(%user, error = %e, "transcode failed, media retained");
                    self.events.emit(Event::PublishFailed {
                        user,
                        stage: PublishStage::Transcode,
                        error: e.to_string(),
                        entry_id,
                    });
                    return Err(e);
                }
            };

            match self.platform.upload_media(&upload_path, asset.kind).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(%user, error = %e, "media upload failed, aborting publish");
                    self.media.release(asset).await;
                    self.events.emit(Event::PublishFailed {
                        user,
                        stage: PublishStage::MediaUpload,
                        error: e.to_string(),
                        entry_id,
                    });
                    return Err(e);
                }
            }
        }

        match self.platform.create_post(&content.text, &handles).await {
            Ok(post_id) => {
                if let Some(asset) = content.media.as_ref() {
                    self.media.release(asset).await;
                }
                info!(%user, platform = self.platform.name(), %post_id, "published");
                self.events.emit(Event::Published {
                    user,
                    platform_post_id: post_id.clone(),
                    entry_id,
                });
                Ok(post_id)
            }
            Err(e) => {
                // No rollback of already-uploaded media
                if let Some(asset) = content.media.as_ref() {
                    self.media.release(asset).await;
                }
                warn!(%user, error = %e, "post creation failed");
                self.events.emit(Event::PublishFailed {
                    user,
                    stage: PublishStage::PostCreation,
                    error: e.to_string(),
                    entry_id,
                });
                Err(e)
            }
        }
    }
}

/// Which slot bookkeeping the facade should perform after a failed attempt.
pub fn failed_stage(error: &PostwrightError) -> PublishStage {
    match error {
        PostwrightError::InvalidInput(_) => PublishStage::Validation,
        PostwrightError::Media(MediaError::Transcode(_)) => PublishStage::Transcode,
        PostwrightError::Media(_) => PublishStage::MediaUpload,
        _ => PublishStage::PostCreation,
    }
}
