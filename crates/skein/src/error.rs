// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracker SDK.

use thiserror::Error;

use crate::storage::StorageError;

/// Tracker SDK errors.
///
/// None of these surface from `track*` calls; tracking is fire-and-forget
/// and failures are routed to diagnostics instead.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// Collector URL did not parse.
	#[error("invalid collector URL: {0}")]
	InvalidCollectorUrl(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned an error response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Rate limited by the collector.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Persistence read/write failure.
	#[error(transparent)]
	Storage(#[from] StorageError),

	/// The tracker has been shut down.
	#[error("tracker has been shut down")]
	ClientShutdown,
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
