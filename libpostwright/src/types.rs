//! Core types for Postwright

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of characters shown in a queue listing preview.
pub const PREVIEW_LEN: usize = 100;

/// Opaque operator identity. Exactly one authorized identity exists per
/// process, but everything downstream is keyed by it so a multi-user
/// extension does not require a redesign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation mode attached to a user. Governs how the next input is
/// interpreted; transitions are total over (mode, event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    /// No pending interaction. A draft may or may not exist.
    #[default]
    Idle,
    /// Media arrived without text; the next text message is its caption.
    AwaitingCaption,
    /// Edit was requested; the next text message is the revision instruction.
    AwaitingEdit,
    /// A generation call is outstanding; further input is rejected.
    Generating,
    /// The next text message is parsed as a schedule time.
    AwaitingScheduleTime,
}

/// A user's current candidate post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Rewritten text produced by the generator.
    pub text: String,
    /// The operator's source text the draft was generated from.
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(text: String, source: String) -> Self {
        Self {
            text,
            source,
            created_at: Utc::now(),
        }
    }
}

/// Media category classified from the declared mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Image,
    Other,
}

impl MediaKind {
    /// Classify a declared mime string (e.g. "video/mp4", "image/jpeg").
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("video") {
            Self::Video
        } else if mime.starts_with("image") {
            Self::Image
        } else {
            Self::Other
        }
    }

}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Image => write!(f, "image"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A locally staged attachment pending transcoding/upload.
///
/// The staged file (and any derived transcode output) has a defined release
/// point: after a publish attempt completes, or on explicit cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Path of the staged file on disk.
    pub path: PathBuf,
    /// Declared mime category.
    pub kind: MediaKind,
    /// Output of a completed transcode step, if one ran.
    pub derived: Option<PathBuf>,
}

impl MediaAsset {
    pub fn new(path: PathBuf, kind: MediaKind) -> Self {
        Self {
            path,
            kind,
            derived: None,
        }
    }

    /// Whether this asset still needs a transcode pass before upload:
    /// a video whose container is not already mp4.
    pub fn needs_transcode(&self) -> bool {
        self.kind == MediaKind::Video
            && self.derived.is_none()
            && self
                .path
                .extension()
                .map_or(true, |ext| !ext.eq_ignore_ascii_case("mp4"))
    }

    /// The path to hand to the platform upload: the transcoded derivative
    /// when one exists, the staged original otherwise.
    pub fn upload_path(&self) -> &PathBuf {
        self.derived.as_ref().unwrap_or(&self.path)
    }
}

/// Platform-assigned media identifier returned by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle(pub String);

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Approved content as handed to the publication executor. Captured
/// immutably per scheduled entry, so firing one entry never mutates
/// another's data.
#[derive(Debug, Clone)]
pub struct PostContent {
    pub text: String,
    pub media: Option<MediaAsset>,
}

/// An approved draft queued for publication at a future absolute time.
#[derive(Debug, Clone)]
pub struct ScheduledPost {
    /// Stable identity assigned at creation; listing and removal address
    /// entries by this id, never by position.
    pub id: Uuid,
    pub content: PostContent,
    pub publish_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledPost {
    pub fn new(content: PostContent, publish_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            publish_at,
            created_at: Utc::now(),
        }
    }
}

/// Read view of a pending scheduled post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub publish_at: DateTime<Utc>,
    pub preview: String,
    pub has_media: bool,
}

/// Truncate text to a bounded preview, appending an ellipsis if shortened.
pub fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_LEN {
        trimmed.to_string()
    } else {
        let mut out: String = trimmed.chars().take(PREVIEW_LEN).collect();
        out.push('…');
        out
    }
}

/// An attachment as delivered by the chat transport.
#[derive(Debug, Clone)]
pub struct IncomingMedia {
    /// Transport-unique identity of the attachment, used in the staged
    /// file name so paths are unique per (user, attachment).
    pub unique_id: String,
    /// Declared mime type (e.g. "video/webm").
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("video/webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("IMAGE/PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Other);
        assert_eq!(MediaKind::from_mime(""), MediaKind::Other);
    }

    #[test]
    fn test_needs_transcode_only_for_non_mp4_video() {
        let webm = MediaAsset::new(PathBuf::from("/tmp/media_1_a.webm"), MediaKind::Video);
        assert!(webm.needs_transcode());

        let mp4 = MediaAsset::new(PathBuf::from("/tmp/media_1_a.mp4"), MediaKind::Video);
        assert!(!mp4.needs_transcode());

        let jpg = MediaAsset::new(PathBuf::from("/tmp/media_1_a.jpg"), MediaKind::Image);
        assert!(!jpg.needs_transcode());

        // No extension at all is treated as not-yet-mp4
        let bare = MediaAsset::new(PathBuf::from("/tmp/media_1_a"), MediaKind::Video);
        assert!(bare.needs_transcode());
    }

    #[test]
    fn test_needs_transcode_false_once_derived() {
        let mut asset = MediaAsset::new(PathBuf::from("/tmp/media_1_a.webm"), MediaKind::Video);
        asset.derived = Some(PathBuf::from("/tmp/media_1_a_converted.mp4"));
        assert!(!asset.needs_transcode());
        assert_eq!(
            asset.upload_path(),
            &PathBuf::from("/tmp/media_1_a_converted.mp4")
        );
    }

    #[test]
    fn test_upload_path_prefers_original_without_derivative() {
        let asset = MediaAsset::new(PathBuf::from("/tmp/media_1_a.jpg"), MediaKind::Image);
        assert_eq!(asset.upload_path(), &PathBuf::from("/tmp/media_1_a.jpg"));
    }

    #[test]
    fn test_scheduled_post_unique_ids() {
        let content = PostContent {
            text: "T1".to_string(),
            media: None,
        };
        let a = ScheduledPost::new(content.clone(), Utc::now());
        let b = ScheduledPost::new(content, Utc::now());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("T1"), "T1");
        assert_eq!(preview("  padded  "), "padded");
    }

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        let long = "x".repeat(150);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_LEN + 1);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let long = "ё".repeat(120);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_LEN + 1);
    }

    #[test]
    fn test_mode_default_is_idle() {
        assert_eq!(Mode::default(), Mode::Idle);
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId(42).to_string(), "42");
    }
}
