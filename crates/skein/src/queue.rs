// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Buffering of pending events.
//!
//! Entries are peeked in enqueue order and stay queued until removal is
//! explicitly acknowledged, so an interrupted send never forgets events.
//! Removal is keyed by event id rather than position; enqueues that land
//! while a batch is in flight cannot corrupt the removal of that batch.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use skein_core::{Event, EventId};

use crate::storage::StorageError;

/// Buffer of pending events.
#[async_trait]
pub trait EventQueue: Send + Sync + std::fmt::Debug {
	/// Appends an entry. Fails only on unrecoverable storage faults, in
	/// which case the event is dropped.
	async fn enqueue(&self, event: Event) -> Result<(), StorageError>;

	/// Returns up to `limit` oldest entries in enqueue order, leaving
	/// them queued.
	async fn peek(&self, limit: usize) -> Vec<Event>;

	/// Removes entries matching the given ids. Removing an absent id is
	/// a no-op.
	async fn remove(&self, ids: &[EventId]) -> Result<(), StorageError>;

	/// Number of queued, not-yet-removed entries.
	async fn len(&self) -> usize;
}

/// In-memory queue; pending events do not survive a restart.
#[derive(Debug)]
pub struct MemoryQueue {
	entries: Mutex<Vec<Event>>,
	max_size: usize,
}

impl MemoryQueue {
	pub fn new(max_size: usize) -> Self {
		Self {
			entries: Mutex::new(Vec::new()),
			max_size,
		}
	}
}

#[async_trait]
impl EventQueue for MemoryQueue {
	async fn enqueue(&self, event: Event) -> Result<(), StorageError> {
		let mut entries = self.entries.lock().await;
		while entries.len() >= self.max_size {
			let dropped = entries.remove(0);
			warn!(event_id = %dropped.id, "dropped oldest event due to queue overflow");
		}
		entries.push(event);
		Ok(())
	}

	async fn peek(&self, limit: usize) -> Vec<Event> {
		let entries = self.entries.lock().await;
		entries.iter().take(limit).cloned().collect()
	}

	async fn remove(&self, ids: &[EventId]) -> Result<(), StorageError> {
		let mut entries = self.entries.lock().await;
		entries.retain(|e| !ids.contains(&e.id));
		Ok(())
	}

	async fn len(&self) -> usize {
		self.entries.lock().await.len()
	}
}

/// Durable queue backed by a JSON file.
///
/// The file is rewritten before an enqueue or removal is acknowledged;
/// pending events survive process restarts.
#[derive(Debug)]
pub struct FileQueue {
	path: PathBuf,
	entries: Mutex<Vec<Event>>,
	max_size: usize,
}

impl FileQueue {
	/// Opens the queue, loading any pending entries. A corrupt file
	/// degrades to an empty queue with a warning.
	pub fn open(path: impl Into<PathBuf>, max_size: usize) -> Result<Self, StorageError> {
		let path = path.into();
		let entries = match std::fs::read(&path) {
			Ok(bytes) => match serde_json::from_slice(&bytes) {
				Ok(entries) => entries,
				Err(error) => {
					warn!(path = %path.display(), error = %error, "corrupt event queue, starting empty");
					Vec::new()
				}
			},
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
			Err(error) => return Err(error.into()),
		};
		Ok(Self {
			path,
			entries: Mutex::new(entries),
			max_size,
		})
	}

	fn persist(&self, entries: &[Event]) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let bytes = serde_json::to_vec(entries)?;
		std::fs::write(&self.path, bytes)?;
		Ok(())
	}
}

#[async_trait]
impl EventQueue for FileQueue {
	async fn enqueue(&self, event: Event) -> Result<(), StorageError> {
		let mut entries = self.entries.lock().await;
		while entries.len() >= self.max_size {
			let dropped = entries.remove(0);
			warn!(event_id = %dropped.id, "dropped oldest event due to queue overflow");
		}
		entries.push(event);
		if let Err(error) = self.persist(&entries) {
			// not durable; drop the entry and report the fault
			entries.pop();
			return Err(error);
		}
		Ok(())
	}

	async fn peek(&self, limit: usize) -> Vec<Event> {
		let entries = self.entries.lock().await;
		entries.iter().take(limit).cloned().collect()
	}

	async fn remove(&self, ids: &[EventId]) -> Result<(), StorageError> {
		let mut entries = self.entries.lock().await;
		entries.retain(|e| !ids.contains(&e.id));
		self.persist(&entries)
	}

	async fn len(&self) -> usize {
		self.entries.lock().await.len()
	}
}
