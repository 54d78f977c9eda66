//! Draft state machine
//!
//! Holds each user's candidate post and conversation mode, and drives the
//! generative collaborator. Transitions are total over (mode, event): every
//! input either performs a defined transition or is rejected with
//! `InvalidState` and no state change. Nothing is silently dropped.
//!
//! Generation calls are serialized per user by rejection: while a call is
//! outstanding the slot sits in `Mode::Generating` and further input is
//! refused, so a second input can never interleave with or overwrite an
//! in-flight result.

use std::sync::Arc;

use tracing::{debug, info};

use super::events::{Event, EventBus};
use crate::error::{PostwrightError, Result};
use crate::generator::Generator;
use crate::store::StateStore;
use crate::types::{Draft, Mode, UserId};

pub struct DraftService {
    store: Arc<StateStore>,
    generator: Arc<dyn Generator>,
    persona: String,
    events: EventBus,
}

/// How a text message was consumed.
#[derive(Debug, Clone)]
pub enum TextOutcome {
    /// A rewrite finished (fresh draft, caption flow, or applied edit);
    /// carries the new draft text awaiting approval.
    DraftReady(String),
    /// The slot was awaiting a schedule time; the caller parses this as one.
    ScheduleInput(String),
}

enum GenerationKind {
    /// Fresh rewrite from operator source text.
    New,
    /// Revision of the current draft under an instruction.
    Edit { draft_text: String },
}

impl DraftService {
    pub fn new(
        store: Arc<StateStore>,
        generator: Arc<dyn Generator>,
        persona: String,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            generator,
            persona,
            events,
        }
    }

    /// Consume a text message according to the user's current mode.
    ///
    /// # Errors
    ///
    /// `InvalidState` while a generation call is outstanding (input
    /// refused, nothing changes); `Generation` when the collaborator fails
    /// (draft preserved, mode reverted as documented on each flow).
    pub async fn handle_text(&self, user: UserId, text: &str) -> Result<TextOutcome> {
        let slot = self.store.slot(user);

        let (prev_mode, kind) = {
            let mut s = slot.lock().await;
            let kind = match s.mode {
                Mode::Generating => {
                    return Err(PostwrightError::InvalidState(
                        "a rewrite is already in progress".to_string(),
                    ))
                }
                Mode::AwaitingScheduleTime => {
                    return Ok(TextOutcome::ScheduleInput(text.to_string()));
                }
                Mode::AwaitingEdit => {
                    let draft_text = s
                        .draft
                        .as_ref()
                        .map(|d| d.text.clone())
                        .ok_or_else(|| {
                            PostwrightError::InvalidState("no draft to edit".to_string())
                        })?;
                    GenerationKind::Edit { draft_text }
                }
                Mode::Idle | Mode::AwaitingCaption => GenerationKind::New,
            };
            let prev = s.mode;
            s.mode = Mode::Generating;
            (prev, kind)
        };

        let generated = match &kind {
            GenerationKind::New => self.generator.generate(&self.persona, text).await,
            GenerationKind::Edit { draft_text } => {
                let prompt = format!(
                    "Here is the current draft:\n{}\n\nRevise it according to this instruction: {}",
                    draft_text, text
                );
                self.generator.generate(&self.persona, &prompt).await
            }
        };

        let mut s = slot.lock().await;
        match generated {
            Ok(rewritten) => {
                match kind {
                    GenerationKind::New => {
                        // New input overwrites any prior draft
                        s.draft = Some(Draft::new(rewritten.clone(), text.to_string()));
                    }
                    GenerationKind::Edit { .. } => {
                        if let Some(draft) = s.draft.as_mut() {
                            draft.text = rewritten.clone();
                        }
                    }
                }
                s.mode = Mode::Idle;
                info!(%user, "draft ready for approval");
                self.events.emit(Event::DraftReady {
                    user,
                    text: rewritten.clone(),
                });
                Ok(TextOutcome::DraftReady(rewritten))
            }
            Err(e) => {
                // Draft untouched. A failed fresh rewrite reverts to the
                // pre-call mode; a failed edit lands back at Idle-with-draft.
                s.mode = match kind {
                    GenerationKind::New => prev_mode,
                    GenerationKind::Edit { .. } => Mode::Idle,
                };
                debug!(%user, error = %e, "generation failed, state reverted");
                self.events.emit(Event::GenerationFailed {
                    user,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Transition to edit entry: the next text message becomes the revision
    /// instruction. Rejected as a no-op when there is no draft or a
    /// generation call is outstanding. Returns the current draft text for
    /// display.
    pub async fn request_edit(&self, user: UserId) -> Result<String> {
        let slot = self.store.slot(user);
        let mut s = slot.lock().await;

        if s.mode == Mode::Generating {
            return Err(PostwrightError::InvalidState(
                "a rewrite is already in progress".to_string(),
            ));
        }
        let text = s
            .draft
            .as_ref()
            .map(|d| d.text.clone())
            .ok_or_else(|| PostwrightError::InvalidState("no draft to edit".to_string()))?;

        s.mode = Mode::AwaitingEdit;
        Ok(text)
    }

    /// Transition to schedule-time entry: the next text message is parsed
    /// as a publish time. Requires an approved draft.
    pub async fn request_schedule_time(&self, user: UserId) -> Result<()> {
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

        s.mode = Mode::AwaitingScheduleTime;
        Ok(())
    }
}
