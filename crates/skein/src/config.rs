// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
	/// Collector endpoint that event batches are POSTed to.
	pub collector_url: String,
	/// Identifier of the tracked property at the collector.
	pub site_id: String,
	/// Maximum number of events sent in one transport call.
	pub max_batch_size: usize,
	/// Interval between automatic dispatches. Zero disables the timer;
	/// manual dispatch still drains.
	pub dispatch_interval: Duration,
	/// Maximum number of events buffered before dropping oldest.
	pub max_queue_size: usize,
	/// Timeout for a single collector request.
	pub request_timeout: Duration,
	/// File the identity state persists to. `None` keeps it in memory.
	pub storage_path: Option<PathBuf>,
	/// File the pending-event queue persists to. `None` keeps it in memory.
	pub queue_path: Option<PathBuf>,
}

impl TrackerConfig {
	/// Creates a config for the given collector and site, with defaults
	/// for everything else.
	pub fn new(collector_url: impl Into<String>, site_id: impl Into<String>) -> Self {
		Self {
			collector_url: collector_url.into(),
			site_id: site_id.into(),
			..Self::default()
		}
	}
}

impl Default for TrackerConfig {
	fn default() -> Self {
		Self {
			collector_url: String::new(),
			site_id: String::new(),
			max_batch_size: 20,
			dispatch_interval: Duration::from_secs(30),
			max_queue_size: 10_000,
			request_timeout: Duration::from_secs(10),
			storage_path: None,
			queue_path: None,
		}
	}
}
