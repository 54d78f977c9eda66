//! Per-user state store
//!
//! A user's draft, staged media and conversation mode live in a single slot
//! guarded by its own async lock. Every mutation goes through the slot, which
//! is what makes "at most one live Draft / one pending MediaAsset per user"
//! an enforced invariant rather than an accident of call ordering. The store
//! is keyed per user so a multi-user extension needs no redesign.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::types::{Draft, MediaAsset, Mode, UserId};

/// Everything the system remembers about one user between inputs.
#[derive(Debug, Default)]
pub struct UserSlot {
    pub draft: Option<Draft>,
    pub media: Option<MediaAsset>,
    pub mode: Mode,
}

impl UserSlot {
    /// Reset to the empty Idle state, handing back whatever was held so the
    /// caller can release staged files.
    pub fn clear(&mut self) -> (Option<Draft>, Option<MediaAsset>) {
        self.mode = Mode::Idle;
        (self.draft.take(), self.media.take())
    }
}

/// Handle to a user's slot. Cloning is cheap; all clones lock the same slot.
pub type SlotHandle = Arc<AsyncMutex<UserSlot>>;

/// Store of per-user slots. The outer map lock is only held to look up or
/// create a slot handle, never across an await.
#[derive(Default)]
pub struct StateStore {
    slots: Mutex<HashMap<UserId, SlotHandle>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the slot for a user, creating an empty one on first contact.
    pub fn slot(&self, user: UserId) -> SlotHandle {
        let mut slots = self.slots.lock().expect("state store lock poisoned");
        slots
            .entry(user)
            .or_insert_with(|| Arc::new(AsyncMutex::new(UserSlot::default())))
            .clone()
    }

    /// Drop a user's slot entirely.
    pub fn remove(&self, user: UserId) {
        let mut slots = self.slots.lock().expect("state store lock poisoned");
        slots.remove(&user);
    }
}
