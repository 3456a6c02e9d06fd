// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Custom dimensions and custom variables attached to events.
//!
//! Both are indexed values configured on the tracker and stamped onto
//! every event; per-call values override the tracker-level ones on index
//! collision.

use serde::{Deserialize, Serialize};

/// An indexed custom dimension value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDimension {
	pub index: u32,
	pub value: String,
}

impl CustomDimension {
	pub fn new(index: u32, value: impl Into<String>) -> Self {
		Self {
			index,
			value: value.into(),
		}
	}
}

/// An indexed, named custom variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomVariable {
	pub index: u32,
	pub name: String,
	pub value: String,
}

impl CustomVariable {
	pub fn new(index: u32, name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			index,
			name: name.into(),
			value: value.into(),
		}
	}
}

/// Custom dimensions keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSet {
	entries: Vec<CustomDimension>,
}

impl DimensionSet {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a dimension, replacing any existing entry at the same index.
	pub fn set(&mut self, dimension: CustomDimension) {
		self.remove(dimension.index);
		self.entries.push(dimension);
	}

	/// Removes the entry at an index. Removing an absent index is a no-op.
	pub fn remove(&mut self, index: u32) -> Option<CustomDimension> {
		let pos = self.entries.iter().position(|d| d.index == index)?;
		Some(self.entries.remove(pos))
	}

	#[must_use]
	pub fn get(&self, index: u32) -> Option<&CustomDimension> {
		self.entries.iter().find(|d| d.index == index)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Merges per-call overrides over this set; overrides win on index
	/// collision. The result is sorted by index.
	#[must_use]
	pub fn merged_with(&self, overrides: &[CustomDimension]) -> Vec<CustomDimension> {
		let mut merged = self.clone();
		for dimension in overrides {
			merged.set(dimension.clone());
		}
		merged.entries.sort_by_key(|d| d.index);
		merged.entries
	}
}

/// Custom variables keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSet {
	entries: Vec<CustomVariable>,
}

impl VariableSet {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a variable, replacing any existing entry at the same index.
	pub fn set(&mut self, variable: CustomVariable) {
		self.remove(variable.index);
		self.entries.push(variable);
	}

	/// Removes the entry at an index. Removing an absent index is a no-op.
	pub fn remove(&mut self, index: u32) -> Option<CustomVariable> {
		let pos = self.entries.iter().position(|v| v.index == index)?;
		Some(self.entries.remove(pos))
	}

	#[must_use]
	pub fn get(&self, index: u32) -> Option<&CustomVariable> {
		self.entries.iter().find(|v| v.index == index)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Merges per-call overrides over this set; overrides win on index
	/// collision. The result is sorted by index.
	#[must_use]
	pub fn merged_with(&self, overrides: &[CustomVariable]) -> Vec<CustomVariable> {
		let mut merged = self.clone();
		for variable in overrides {
			merged.set(variable.clone());
		}
		merged.entries.sort_by_key(|v| v.index);
		merged.entries
	}
}
