// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted key-value storage for identity state.
//!
//! The identity store reads its keys once at initialization and writes
//! through on every mutation; the values must survive process restarts.
//! All access is funneled through the tracker's owning execution context,
//! so the store itself only needs plain interior mutability.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

/// Keys of the persisted identity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
	VisitorId,
	ForcedVisitorId,
	UserId,
	OptedOut,
	FirstVisit,
	PreviousVisit,
	CurrentVisit,
	VisitCount,
	LastOrderAt,
}

impl StorageKey {
	/// Returns the stable string form used on disk.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::VisitorId => "visitor_id",
			StorageKey::ForcedVisitorId => "forced_visitor_id",
			StorageKey::UserId => "user_id",
			StorageKey::OptedOut => "opted_out",
			StorageKey::FirstVisit => "first_visit",
			StorageKey::PreviousVisit => "previous_visit",
			StorageKey::CurrentVisit => "current_visit",
			StorageKey::VisitCount => "visit_count",
			StorageKey::LastOrderAt => "last_order_at",
		}
	}
}

/// Persistence faults. Reported to diagnostics; never fatal to tracking.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Underlying I/O failed.
	#[error("storage I/O failed: {0}")]
	Io(#[from] std::io::Error),

	/// Stored data could not be serialized or deserialized.
	#[error("storage serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Key-value store for identity state.
///
/// Writes are durable when `set` returns.
pub trait Storage: Send + Sync + std::fmt::Debug {
	fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

	/// Sets or clears a value.
	fn set(&self, key: StorageKey, value: Option<&str>) -> Result<(), StorageError>;
}

impl<S: Storage> Storage for std::sync::Arc<S> {
	fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
		self.as_ref().get(key)
	}

	fn set(&self, key: StorageKey, value: Option<&str>) -> Result<(), StorageError> {
		self.as_ref().set(key, value)
	}
}

/// In-memory store for tests and explicitly ephemeral trackers.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

impl Storage for MemoryStorage {
	fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
		let values = self.values.lock().expect("storage lock poisoned");
		Ok(values.get(key.as_str()).cloned())
	}

	fn set(&self, key: StorageKey, value: Option<&str>) -> Result<(), StorageError> {
		let mut values = self.values.lock().expect("storage lock poisoned");
		match value {
			Some(value) => values.insert(key.as_str().to_string(), value.to_string()),
			None => values.remove(key.as_str()),
		};
		Ok(())
	}
}

/// JSON-file-backed store, loaded at open and rewritten on every set.
#[derive(Debug)]
pub struct FileStorage {
	path: PathBuf,
	values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
	/// Opens the store, loading any existing values.
	///
	/// An unreadable or corrupt file degrades to an empty store with a
	/// warning; identity state is then rematerialized on first use.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();
		let values = match std::fs::read(&path) {
			Ok(bytes) => match serde_json::from_slice(&bytes) {
				Ok(values) => values,
				Err(error) => {
					warn!(path = %path.display(), error = %error, "corrupt identity store, starting empty");
					BTreeMap::new()
				}
			},
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
			Err(error) => return Err(error.into()),
		};
		Ok(Self {
			path,
			values: Mutex::new(values),
		})
	}

	fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let bytes = serde_json::to_vec_pretty(values)?;
		std::fs::write(&self.path, bytes)?;
		Ok(())
	}
}

impl Storage for FileStorage {
	fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
		let values = self.values.lock().expect("storage lock poisoned");
		Ok(values.get(key.as_str()).cloned())
	}

	fn set(&self, key: StorageKey, value: Option<&str>) -> Result<(), StorageError> {
		let mut values = self.values.lock().expect("storage lock poisoned");
		match value {
			Some(value) => values.insert(key.as_str().to_string(), value.to_string()),
			None => values.remove(key.as_str()),
		};
		self.persist(&values)
	}
}
