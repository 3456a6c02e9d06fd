// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helper for building free-form event parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A builder for free-form key-value parameters attached to an event.
///
/// # Example
///
/// ```
/// use skein_core::EventParams;
///
/// let params = EventParams::new()
///     .insert("campaign", "spring_launch")
///     .insert("position", 3)
///     .insert("is_returning", true);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventParams {
	inner: Map<String, Value>,
}

impl EventParams {
	/// Creates a new empty parameter set.
	#[must_use]
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair.
	///
	/// The value can be any type that implements `Into<serde_json::Value>`,
	/// including strings, numbers, booleans, arrays, and nested objects.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Merges another parameter set into this one.
	///
	/// If both contain the same key, the value from `other` takes
	/// precedence.
	pub fn merge(mut self, other: EventParams) -> Self {
		for (k, v) in other.inner {
			self.inner.insert(k, v);
		}
		self
	}

	/// Returns true if there are no parameters.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Returns the number of parameters.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Gets a value by key.
	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}
}

impl From<Map<String, Value>> for EventParams {
	fn from(map: Map<String, Value>) -> Self {
		Self { inner: map }
	}
}
