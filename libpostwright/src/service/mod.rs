//! Service layer wiring the draft state machine, media pipeline,
//! publication executor and scheduling engine into one facade the chat
//! transport talks to.
//!
//! Authorization happens here, once per entry point. Input from anyone but
//! the configured operator is dropped silently; core operations below this
//! layer never re-check identity.

pub mod draft;
pub mod events;
pub mod publish;
pub mod scheduler;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Authorizer;
use crate::config::Config;
use crate::error::{PostwrightError, Result};
use crate::generator::Generator;
use crate::media::MediaService;
use crate::platforms::Platform;
use crate::schedule::parse_schedule;
use crate::store::StateStore;
use crate::transcode::Transcoder;
use crate::types::{IncomingMedia, Mode, PostContent, QueueItem, UserId};

use draft::{DraftService, TextOutcome};
use events::{Event, EventBus, EventReceiver};
use publish::{failed_stage, PublishService};
use scheduler::Scheduler;

pub use events::PublishStage;

/// What an entry point did, for the transport to render as a reply.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Input came from an unauthorized identity and was dropped.
    Ignored,
    /// A rewrite finished; the text awaits approve / edit / schedule.
    DraftReady { text: String },
    /// Media was staged; the next text message is its caption.
    CaptionRequested,
    /// Edit entry: the next text message is the revision instruction.
    EditPrompt { current: String },
    /// The next text message will be parsed as a publish time.
    ScheduleTimePrompt,
    /// The draft was published immediately.
    Published { post_id: String },
    /// The draft was handed to the scheduling engine.
    Scheduled {
        entry_id: Uuid,
        publish_at: DateTime<Utc>,
    },
    /// Draft and staged media were discarded.
    Cancelled,
}

pub struct PostwrightService {
    config: Config,
    auth: Authorizer,
    store: Arc<StateStore>,
    drafts: DraftService,
    publisher: Arc<PublishService>,
    scheduler: Scheduler,
    media: Arc<MediaService>,
    events: EventBus,
}

impl PostwrightService {
    pub fn new(
        config: Config,
        generator: Arc<dyn Generator>,
        platform: Arc<dyn Platform>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let events = EventBus::new(100);
        let store = Arc::new(StateStore::new());
        let media = Arc::new(MediaService::new(config.media.dir.clone()));
        let drafts = DraftService::new(
            store.clone(),
            generator,
            config.persona_prompt.clone(),
            events.clone(),
        );
        let publisher = Arc::new(PublishService::new(
            platform,
            transcoder,
            media.clone(),
            events.clone(),
        ));
        let scheduler = Scheduler::new(publisher.clone(), media.clone(), events.clone());
        let auth = Authorizer::new(config.authorized_user());

        Self {
            config,
            auth,
            store,
            drafts,
            publisher,
            scheduler,
            media,
            events,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to outcome notifications. Fire-time results of scheduled
    /// entries are only visible here.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Consume a text message: source text for a rewrite, caption for
    /// staged media, revision instruction, or schedule time, depending on
    /// the user's mode.
    pub async fn handle_message(&self, user: UserId, text: &str) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }

        match self.drafts.handle_text(user, text).await? {
            TextOutcome::DraftReady(text) => Ok(Outcome::DraftReady { text }),
            TextOutcome::ScheduleInput(raw) => {
                // On a parse failure the slot stays in schedule entry so the
                // operator can just try again.
                let publish_at = parse_schedule(&raw)?;
                self.hand_off_to_scheduler(user, publish_at).await
            }
        }
    }

    /// Stage an incoming attachment for the user. Replaces any previously
    /// staged asset, releasing its file first. The caption flow starts
    /// here: the next text message becomes the source text.
    pub async fn handle_media(&self, user: UserId, incoming: &IncomingMedia) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }

        let slot = self.store.slot(user);
        let mut s = slot.lock().await;
        match s.mode {
            Mode::Generating => {
                return Err(PostwrightError::InvalidState(
                    "a rewrite is already in progress".to_string(),
                ))
            }
            Mode::AwaitingEdit | Mode::AwaitingScheduleTime => {
                return Err(PostwrightError::InvalidState(
                    "finish the pending prompt before sending media".to_string(),
                ))
            }
            Mode::Idle | Mode::AwaitingCaption => {}
        }

        let asset = self.media.ingest(user, incoming).await?;
        if let Some(old) = s.media.replace(asset) {
            self.media.release(&old).await;
        }
        s.mode = Mode::AwaitingCaption;

        self.events.emit(Event::MediaStaged { user });
        Ok(Outcome::CaptionRequested)
    }

    /// Enter edit mode on the current draft.
    pub async fn request_edit(&self, user: UserId) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }
        let current = self.drafts.request_edit(user).await?;
        Ok(Outcome::EditPrompt { current })
    }

    /// Enter schedule-time entry: the next text message is parsed as a
    /// publish time.
    pub async fn begin_custom_schedule(&self, user: UserId) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }
        self.drafts.request_schedule_time(user).await?;
        Ok(Outcome::ScheduleTimePrompt)
    }

    /// Discard the draft and any staged media, returning to empty Idle.
    /// Discarding nothing is not an error.
    pub async fn cancel_draft(&self, user: UserId) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }

        let slot = self.store.slot(user);
        let mut s = slot.lock().await;
        if s.mode == Mode::Generating {
            return Err(PostwrightError::InvalidState(
                "a rewrite is already in progress".to_string(),
            ));
        }

        let (_, media) = s.clear();
        if let Some(asset) = media {
            self.media.release(&asset).await;
        }
        info!(%user, "draft discarded");
        Ok(Outcome::Cancelled)
    }

    /// Publish the current draft immediately.
    ///
    /// On success the slot is emptied. On failure the draft text is kept
    /// for another attempt; the media slot is kept only when the staged
    /// file survived (a transcode failure), since later stages release it.
    pub async fn publish_now(&self, user: UserId) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }

        let slot = self.store.slot(user);
        let mut s = slot.lock().await;
        if s.mode == Mode::Generating {
            return Err(PostwrightError::InvalidState(
                "a rewrite is already in progress".to_string(),
            ));
        }
        let draft = s
            .draft
            .as_ref()
            .ok_or_else(|| PostwrightError::InvalidState("no draft to publish".to_string()))?;

        let mut content = PostContent {
            text: draft.text.clone(),
            media: s.media.clone(),
        };

        // Slot stays locked for the attempt; further operator input is
        // serialized behind it.
        match self.publisher.publish(user, &mut content, None).await {
            Ok(post_id) => {
                s.clear();
                Ok(Outcome::Published { post_id })
            }
            Err(e) => {
                match failed_stage(&e) {
                    PublishStage::Validation | PublishStage::Transcode => {
                        // Staged file retained for manual retry
                    }
                    PublishStage::MediaUpload | PublishStage::PostCreation => {
                        s.media = None;
                    }
                }
                s.mode = Mode::Idle;
                warn!(%user, error = %e, "publish failed, draft kept");
                Err(e)
            }
        }
    }

    /// Queue the draft to publish after one of the quick delays.
    pub async fn schedule_in(&self, user: UserId, minutes: u64) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }
        let publish_at = Utc::now() + Duration::minutes(minutes as i64);
        self.hand_off_to_scheduler(user, publish_at).await
    }

    /// Queue the draft to publish at an absolute time. Past times fire as
    /// soon as possible.
    pub async fn schedule_at(&self, user: UserId, publish_at: DateTime<Utc>) -> Result<Outcome> {
        if !self.auth.is_authorized(user) {
            return Ok(Outcome::Ignored);
        }
        self.hand_off_to_scheduler(user, publish_at).await
    }

    /// Move the slot's draft and media into a scheduled entry. The slot is
    /// emptied on hand-off; the entry owns the content from here on.
    async fn hand_off_to_scheduler(
        &self,
        user: UserId,
        publish_at: DateTime<Utc>,
    ) -> Result<Outcome> {
        let slot = self.store.slot(user);
        let mut s = slot.lock().await;
        if s.mode == Mode::Generating {
            return Err(PostwrightError::InvalidState(
                "a rewrite is already in progress".to_string(),
            ));
        }
        if s.draft.is_none() {
            return Err(PostwrightError::InvalidState(
                "no draft to schedule".to_string(),
            ));
        }

        let (draft, media) = s.clear();
        let content = PostContent {
            text: draft.map(|d| d.text).unwrap_or_default(),
            media,
        };
        let entry_id = self.scheduler.schedule(user, content, publish_at);
        Ok(Outcome::Scheduled {
            entry_id,
            publish_at,
        })
    }

    /// Snapshot the user's pending scheduled entries in submission order.
    pub fn queue(&self, user: UserId) -> Vec<QueueItem> {
        if !self.auth.is_authorized(user) {
            return Vec::new();
        }
        self.scheduler.list(user)
    }

    /// Remove a pending entry before it fires.
    ///
    /// # Errors
    ///
    /// `NotFound` when no pending entry has this id (including one that
    /// already fired).
    pub async fn remove_queued(&self, user: UserId, id: Uuid) -> Result<()> {
        if !self.auth.is_authorized(user) {
            return Ok(());
        }
        self.scheduler.cancel(user, id).await
    }

    /// Disarm all timers and release staged files. Pending entries are
    /// lost; state is memory-resident by design.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;

        let user = self.auth.allowed();
        let slot = self.store.slot(user);
        let mut s = slot.lock().await;
        let (_, media) = s.clear();
        if let Some(asset) = media {
            self.media.release(&asset).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;
    use crate::platforms::mock::MockPlatform;
    use crate::transcode::MockTranscoder;

    const OPERATOR: UserId = UserId(42);
    const STRANGER: UserId = UserId(99);

    struct Fixture {
        _dir: tempfile::TempDir,
        platform: Arc<MockPlatform>,
        generator: Arc<MockGenerator>,
        service: PostwrightService,
    }

    fn fixture_with(generator: MockGenerator, platform: MockPlatform) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default_config(OPERATOR.0);
        config.media.dir = dir.path().to_string_lossy().into_owned();

        let platform = Arc::new(platform);
        let generator = Arc::new(generator);
        let service = PostwrightService::new(
            config,
            generator.clone(),
            platform.clone(),
            Arc::new(MockTranscoder::success()),
        );
        Fixture {
            _dir: dir,
            platform,
            generator,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockGenerator::success(), MockPlatform::success("test"))
    }

    fn jpeg(unique_id: &str) -> IncomingMedia {
        IncomingMedia {
            unique_id: unique_id.to_string(),
            mime: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff],
        }
    }

    #[tokio::test]
    async fn test_unauthorized_input_is_dropped_silently() {
        let f = fixture();

        let outcome = f.service.handle_message(STRANGER, "hello").await.unwrap();
        assert!(matches!(outcome, Outcome::Ignored));
        assert_eq!(f.generator.call_count(), 0);

        let outcome = f.service.publish_now(STRANGER).await.unwrap();
        assert!(matches!(outcome, Outcome::Ignored));
        assert!(f.service.queue(STRANGER).is_empty());
    }

    #[tokio::test]
    async fn test_message_then_publish_now() {
        let f = fixture();

        let outcome = f.service.handle_message(OPERATOR, "big news").await.unwrap();
        match outcome {
            Outcome::DraftReady { text } => assert_eq!(text, "rewritten: big news"),
            other => panic!("unexpected outcome {:?}", other),
        }

        let outcome = f.service.publish_now(OPERATOR).await.unwrap();
        match outcome {
            Outcome::Published { post_id } => assert!(post_id.starts_with("test:post-")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(f.platform.posts()[0].0, "rewritten: big news");

        // Slot is empty; publishing again has nothing to send
        let result = f.service.publish_now(OPERATOR).await;
        assert!(matches!(result, Err(PostwrightError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_media_caption_flow() {
        let f = fixture();

        let outcome = f.service.handle_media(OPERATOR, &jpeg("a1")).await.unwrap();
        assert!(matches!(outcome, Outcome::CaptionRequested));

        f.service
            .handle_message(OPERATOR, "photo caption")
            .await
            .unwrap();
        f.service.publish_now(OPERATOR).await.unwrap();

        assert_eq!(f.platform.upload_count(), 1);
        let posts = f.platform.posts();
        assert_eq!(posts[0].0, "rewritten: photo caption");
        assert_eq!(posts[0].1.len(), 1);
    }

    #[tokio::test]
    async fn test_new_media_replaces_and_releases_old() {
        let f = fixture();

        f.service.handle_media(OPERATOR, &jpeg("a1")).await.unwrap();
        let first = f._dir.path().join(format!("media_{}_a1.jpg", OPERATOR));
        assert!(first.exists());

        f.service.handle_media(OPERATOR, &jpeg("a2")).await.unwrap();
        assert!(!first.exists(), "replaced asset must be released");
        assert!(f._dir.path().join(format!("media_{}_a2.jpg", OPERATOR)).exists());
    }

    #[tokio::test]
    async fn test_media_rejected_during_edit_prompt() {
        let f = fixture();

        f.service.handle_message(OPERATOR, "news").await.unwrap();
        f.service.request_edit(OPERATOR).await.unwrap();

        let result = f.service.handle_media(OPERATOR, &jpeg("a1")).await;
        assert!(matches!(result, Err(PostwrightError::InvalidState(_))));
        // The rejected attachment was never staged
        assert!(!f._dir.path().join(format!("media_{}_a1.jpg", OPERATOR)).exists());
    }

    #[tokio::test]
    async fn test_cancel_releases_staged_media() {
        let f = fixture();

        f.service.handle_media(OPERATOR, &jpeg("a1")).await.unwrap();
        let path = f._dir.path().join(format!("media_{}_a1.jpg", OPERATOR));
        assert!(path.exists());

        let outcome = f.service.cancel_draft(OPERATOR).await.unwrap();
        assert!(matches!(outcome, Outcome::Cancelled));
        assert!(!path.exists());

        // Cancelling with nothing held is still fine
        f.service.cancel_draft(OPERATOR).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_draft() {
        let f = fixture_with(
            MockGenerator::success(),
            MockPlatform::post_failure("test", "duplicate"),
        );

        f.service.handle_message(OPERATOR, "news").await.unwrap();
        let result = f.service.publish_now(OPERATOR).await;
        assert!(result.is_err());

        // Draft survives for a retry prompt; a fresh message still works too
        let outcome = f.service.request_edit(OPERATOR).await.unwrap();
        match outcome {
            Outcome::EditPrompt { current } => assert_eq!(current, "rewritten: news"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schedule_empties_slot_and_entry_owns_content() {
        let f = fixture();

        f.service.handle_message(OPERATOR, "queued news").await.unwrap();
        let outcome = f.service.schedule_in(OPERATOR, 30).await.unwrap();
        let entry_id = match outcome {
            Outcome::Scheduled { entry_id, .. } => entry_id,
            other => panic!("unexpected outcome {:?}", other),
        };

        // Slot emptied on hand-off
        let result = f.service.publish_now(OPERATOR).await;
        assert!(matches!(result, Err(PostwrightError::InvalidState(_))));

        let items = f.service.queue(OPERATOR);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, entry_id);
        assert_eq!(items[0].preview, "rewritten: queued news");

        // A new draft does not disturb the queued entry
        f.service.handle_message(OPERATOR, "other news").await.unwrap();
        assert_eq!(f.service.queue(OPERATOR).len(), 1);
    }

    #[tokio::test]
    async fn test_custom_schedule_time_flow() {
        let f = fixture();

        f.service.handle_message(OPERATOR, "news").await.unwrap();
        let outcome = f.service.begin_custom_schedule(OPERATOR).await.unwrap();
        assert!(matches!(outcome, Outcome::ScheduleTimePrompt));

        let before = Utc::now();
        let outcome = f.service.handle_message(OPERATOR, "2h").await.unwrap();
        match outcome {
            Outcome::Scheduled { publish_at, .. } => {
                let delta = publish_at - before;
                assert!(delta >= Duration::minutes(119) && delta <= Duration::minutes(121));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_schedule_time_keeps_prompt_open() {
        let f = fixture();

        f.service.handle_message(OPERATOR, "news").await.unwrap();
        f.service.begin_custom_schedule(OPERATOR).await.unwrap();

        let result = f.service.handle_message(OPERATOR, "not a time").await;
        assert!(matches!(result, Err(PostwrightError::InvalidInput(_))));

        // The prompt is still open; a valid time now succeeds
        let outcome = f.service.handle_message(OPERATOR, "15m").await.unwrap();
        assert!(matches!(outcome, Outcome::Scheduled { .. }));
    }

    #[tokio::test]
    async fn test_remove_queued_entry() {
        let f = fixture();

        f.service.handle_message(OPERATOR, "news").await.unwrap();
        let outcome = f.service.schedule_in(OPERATOR, 60).await.unwrap();
        let entry_id = match outcome {
            Outcome::Scheduled { entry_id, .. } => entry_id,
            other => panic!("unexpected outcome {:?}", other),
        };

        f.service.remove_queued(OPERATOR, entry_id).await.unwrap();
        assert!(f.service.queue(OPERATOR).is_empty());

        let result = f.service.remove_queued(OPERATOR, entry_id).await;
        assert!(matches!(result, Err(PostwrightError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_schedule_without_draft_rejected() {
        let f = fixture();
        let result = f.service.schedule_in(OPERATOR, 15).await;
        assert!(matches!(result, Err(PostwrightError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_shutdown_releases_staged_media() {
        let f = fixture();

        f.service.handle_media(OPERATOR, &jpeg("a1")).await.unwrap();
        let path = f._dir.path().join(format!("media_{}_a1.jpg", OPERATOR));
        assert!(path.exists());

        f.service.shutdown().await;
        assert!(!path.exists());
    }
}
