//! Delayed-publication engine
//!
//! Keeps per-user queues of scheduled entries, each paired with an armed
//! tokio timer task. Entries are addressed by the stable id assigned at
//! creation, never by position.
//!
//! The cancel/fire race is decided at the queue, exactly once: a firing
//! timer removes its own entry *before* publishing, and cancellation
//! removes the entry before aborting the timer. Whichever side removes the
//! entry wins; the loser observes it gone and does nothing. A publish
//! already in flight is never aborted mid-operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{Event, EventBus};
use super::publish::PublishService;
use crate::error::{PostwrightError, Result};
use crate::media::MediaService;
use crate::types::{preview, PostContent, QueueItem, ScheduledPost, UserId};

struct Entry {
    post: ScheduledPost,
    timer: JoinHandle<()>,
}

type Queues = Arc<Mutex<HashMap<UserId, Vec<Entry>>>>;

pub struct Scheduler {
    queues: Queues,
    publisher: Arc<PublishService>,
    media: Arc<MediaService>,
    events: EventBus,
}

impl Scheduler {
    pub fn new(publisher: Arc<PublishService>, media: Arc<MediaService>, events: EventBus) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            publisher,
            media,
            events,
        }
    }

    /// Queue `content` for publication at `publish_at` and arm a timer for
    /// it. A time already in the past fires as soon as possible; it is
    /// never rejected and never skipped.
    ///
    /// Returns the entry's stable id.
    pub fn schedule(
        &self,
        user: UserId,
        content: PostContent,
        publish_at: DateTime<Utc>,
    ) -> Uuid {
        let post = ScheduledPost::new(content, publish_at);
        let id = post.id;

        // Clamp past or sub-tick delays to zero
        let delay = (publish_at - Utc::now())
            .max(ChronoDuration::zero())
            .to_std()
            .unwrap_or_default();

        let queues = self.queues.clone();
        let publisher = self.publisher.clone();

        // The timer is spawned while the queue lock is held and the entry is
        // pushed under the same guard, so even a zero-delay timer finds its
        // entry in place.
        let mut q = self.queues.lock().expect("scheduler queue lock poisoned");
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Claim the entry; if a cancel got there first, stand down.
            let post = {
                let mut q = queues.lock().expect("scheduler queue lock poisoned");
                let Some(list) = q.get_mut(&user) else {
                    return;
                };
                let Some(pos) = list.iter().position(|e| e.post.id == id) else {
                    return;
                };
                list.remove(pos).post
            };

            debug!(%user, entry_id = %id, "scheduled entry firing");
            let mut content = post.content;
            if let Err(e) = publisher.publish(user, &mut content, Some(id)).await {
                // Outcome already announced on the bus by the executor
                warn!(%user, entry_id = %id, error = %e, "scheduled publish failed");
            }
        });
        q.entry(user).or_default().push(Entry { post, timer });
        drop(q);

        info!(%user, entry_id = %id, %publish_at, "entry scheduled");
        self.events.emit(Event::EntryScheduled {
            user,
            entry_id: id,
            publish_at,
        });
        id
    }

    /// Remove a pending entry before it fires, disarm its timer, and
    /// release any staged media it still owned.
    ///
    /// # Errors
    ///
    /// `NotFound` when no pending entry has this id, including when the
    /// entry already fired.
    pub async fn cancel(&self, user: UserId, id: Uuid) -> Result<()> {
        let entry = {
            let mut q = self.queues.lock().expect("scheduler queue lock poisoned");
            let list = q
                .get_mut(&user)
                .ok_or_else(|| PostwrightError::NotFound(format!("no entry {}", id)))?;
            let pos = list
                .iter()
                .position(|e| e.post.id == id)
                .ok_or_else(|| PostwrightError::NotFound(format!("no entry {}", id)))?;
            list.remove(pos)
        };

        entry.timer.abort();
        if let Some(asset) = entry.post.content.media.as_ref() {
            self.media.release(asset).await;
        }

        info!(%user, entry_id = %id, "entry cancelled");
        self.events.emit(Event::EntryCancelled {
            user,
            entry_id: id,
        });
        Ok(())
    }

    /// Snapshot the user's pending entries in submission order.
    pub fn list(&self, user: UserId) -> Vec<QueueItem> {
        let q = self.queues.lock().expect("scheduler queue lock poisoned");
        q.get(&user)
            .map(|list| {
                list.iter()
                    .map(|e| QueueItem {
                        id: e.post.id,
                        publish_at: e.post.publish_at,
                        preview: preview(&e.post.content.text),
                        has_media: e.post.content.media.is_some(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn pending_count(&self, user: UserId) -> usize {
        let q = self.queues.lock().expect("scheduler queue lock poisoned");
        q.get(&user).map(Vec::len).unwrap_or(0)
    }

    /// Disarm every timer and release staged media of entries that never
    /// fired. Pending entries are lost; state is memory-resident.
    pub async fn shutdown(&self) {
        let entries: Vec<Entry> = {
            let mut q = self.queues.lock().expect("scheduler queue lock poisoned");
            q.drain().flat_map(|(_, list)| list).collect()
        };

        for entry in entries {
            entry.timer.abort();
            if let Some(asset) = entry.post.content.media.as_ref() {
                self.media.release(asset).await;
            }
        }
    }
}
