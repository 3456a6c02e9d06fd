// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor identity types.
//!
//! A visitor represents one installation of the client. It carries a
//! randomly generated stable identifier, an optional application-supplied
//! user identifier, and an optional forced identifier overriding the
//! generated one. Exactly one of these is authoritative for any event:
//! forced id over user id over generated id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// A 16-character hexadecimal visitor identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
	/// Number of hex characters in a visitor id.
	pub const LEN: usize = 16;

	/// Generates a new random visitor id.
	#[must_use]
	pub fn random() -> Self {
		let hex = Uuid::new_v4().to_string().replace('-', "");
		Self(hex[..Self::LEN].to_string())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for VisitorId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for VisitorId {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.len() != Self::LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(CoreError::InvalidVisitorId(s.to_string()));
		}
		Ok(Self(s.to_string()))
	}
}

/// One installation of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
	/// Randomly generated stable identifier, created once and persisted.
	pub id: VisitorId,
	/// Application-supplied user identifier, if any.
	pub user_id: Option<String>,
	/// Application-supplied override for the generated identifier.
	pub forced_id: Option<VisitorId>,
}

impl Visitor {
	/// Creates a visitor with a freshly generated identifier.
	#[must_use]
	pub fn generate() -> Self {
		Self {
			id: VisitorId::random(),
			user_id: None,
			forced_id: None,
		}
	}

	/// The authoritative identifier for events.
	///
	/// Forced id takes precedence over user id, which takes precedence
	/// over the generated id.
	#[must_use]
	pub fn resolved_id(&self) -> &str {
		if let Some(forced) = &self.forced_id {
			forced.as_str()
		} else if let Some(user) = &self.user_id {
			user
		} else {
			self.id.as_str()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn random_id_has_expected_shape() {
		let id = VisitorId::random();
		assert_eq!(id.as_str().len(), VisitorId::LEN);
		assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn parse_valid_id() {
		let id: VisitorId = "0123456789abcdef".parse().unwrap();
		assert_eq!(id.as_str(), "0123456789abcdef");
	}

	#[test]
	fn parse_accepts_uppercase_hex() {
		let id: VisitorId = "ABCDEF0123456789".parse().unwrap();
		assert_eq!(id.as_str(), "ABCDEF0123456789");
	}

	#[test]
	fn parse_rejects_non_hex() {
		assert!("nothex!!nothex!!".parse::<VisitorId>().is_err());
	}

	#[test]
	fn parse_rejects_wrong_length() {
		assert!("0123456789abcde".parse::<VisitorId>().is_err()); // 15 chars
		assert!("0123456789abcdef0".parse::<VisitorId>().is_err()); // 17 chars
		assert!("".parse::<VisitorId>().is_err());
	}

	#[test]
	fn resolved_id_precedence() {
		let mut visitor = Visitor::generate();
		let generated = visitor.id.clone();
		assert_eq!(visitor.resolved_id(), generated.as_str());

		visitor.user_id = Some("user@example.com".to_string());
		assert_eq!(visitor.resolved_id(), "user@example.com");

		visitor.forced_id = Some("00ff00ff00ff00ff".parse().unwrap());
		assert_eq!(visitor.resolved_id(), "00ff00ff00ff00ff");
	}

	proptest! {
		#[test]
		fn random_ids_are_unique(_seed: u64) {
			prop_assert_ne!(VisitorId::random(), VisitorId::random());
		}

		#[test]
		fn random_ids_reparse(_seed: u64) {
			let id = VisitorId::random();
			let parsed: VisitorId = id.as_str().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn garbage_never_parses(garbage in "[g-z!@#$%^&*]{1,32}") {
			prop_assert!(garbage.parse::<VisitorId>().is_err());
		}

		#[test]
		fn valid_hex_roundtrips(hex in "[0-9a-f]{16}") {
			let id: VisitorId = hex.parse().unwrap();
			let json = serde_json::to_string(&id).unwrap();
			let back: VisitorId = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(id, back);
		}
	}
}
