// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for core data validation.

use thiserror::Error;

/// Errors from core type validation.
#[derive(Debug, Error)]
pub enum CoreError {
	/// A visitor id that is not exactly 16 hexadecimal characters.
	#[error("invalid visitor id {0:?}: must be 16 hexadecimal characters")]
	InvalidVisitorId(String),
}
