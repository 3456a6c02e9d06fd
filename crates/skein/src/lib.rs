// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Embeddable analytics instrumentation client.
//!
//! Application code reports discrete occurrences (screen views, actions,
//! goals, orders, searches, content). The tracker buffers them durably,
//! stamps visitor and session identity onto each one, and drains the
//! buffer in bounded batches to a remote collector over HTTP. A failed
//! batch stays queued and is retried on the next timer tick; delivery is
//! at-least-once.
//!
//! Key principles:
//!
//! - **Fire-and-forget**: tracking calls never fail or block the caller;
//!   every failure degrades to a diagnostic
//! - **At-least-once**: an event is forgotten only after the collector
//!   confirms the batch that carried it
//! - **Single owner**: all mutable state is serialized onto one logical
//!   execution context, so callers on any task can share a tracker
//! - **Pluggable seams**: transport, queue, and identity storage are
//!   trait objects; bring your own for tests or custom integrations
//!
//! # Usage
//!
//! ```rust,no_run
//! use skein::{Tracker, TrackerConfig};
//!
//! # async fn run() -> Result<(), skein::TrackerError> {
//! let tracker = Tracker::new(TrackerConfig::new(
//!     "https://collector.example.com/collect",
//!     "site-42",
//! ))?;
//!
//! tracker
//!     .track_view(vec!["settings".into(), "profile".into()], None, Vec::new())
//!     .await;
//! tracker
//!     .track_event("ui", "button_tap", Some("checkout".into()), None, Vec::new(), None)
//!     .await;
//!
//! // events go out on the dispatch interval, or right now:
//! tracker.dispatch().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;
mod error;
mod http;
mod identity;
mod queue;
mod storage;
mod tracker;
mod transport;

pub use config::TrackerConfig;
pub use dispatcher::DispatchState;
pub use error::{Result, TrackerError};
pub use queue::{EventQueue, FileQueue, MemoryQueue};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageKey};
pub use tracker::Tracker;
pub use transport::{HttpTransport, Transport};

pub use skein_core::{
	CustomDimension, CustomVariable, Event, EventId, EventKind, EventParams, OrderItem, Session,
	Visitor, VisitorId,
};
