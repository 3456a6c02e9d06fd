// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session types for visit tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One continuous period of app usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// When this installation was first seen.
	pub first_visit: DateTime<Utc>,
	/// Start of the previous session, if there was one.
	pub previous_visit: Option<DateTime<Utc>>,
	/// Start of the current session.
	pub current_visit: DateTime<Utc>,
	/// Monotonically incremented visit counter.
	pub visit_count: u32,
}

impl Session {
	/// Creates the first session for a fresh installation.
	#[must_use]
	pub fn begin() -> Self {
		let now = Utc::now();
		Self {
			first_visit: now,
			previous_visit: None,
			current_visit: now,
			visit_count: 1,
		}
	}

	/// Rotates into a new session.
	///
	/// The previous visit takes the current timestamp, the current visit
	/// restarts at now, and the counter increments.
	#[must_use]
	pub fn next(&self) -> Self {
		Self {
			first_visit: self.first_visit,
			previous_visit: Some(self.current_visit),
			current_visit: Utc::now(),
			visit_count: self.visit_count.saturating_add(1),
		}
	}
}
