//! Postwright - single-operator drafting and publication bot core
//!
//! This library provides the core of a chat-driven posting assistant: a
//! generative draft workflow, a media staging pipeline, and a delayed
//! publication queue, behind one service facade a chat transport drives.

pub mod auth;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod media;
pub mod platforms;
pub mod schedule;
pub mod service;
pub mod store;
pub mod transcode;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{PostwrightError, Result};
pub use service::events::{Event, EventReceiver, PublishStage};
pub use service::{Outcome, PostwrightService};
pub use types::{Draft, IncomingMedia, MediaKind, Mode, QueueItem, UserId};
