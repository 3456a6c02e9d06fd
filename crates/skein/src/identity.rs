// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor and session identity lifecycle.
//!
//! The identity store owns the current visitor and session, the opt-out
//! flag, and the last-order timestamp. Every mutation is persisted before
//! the call returns; storage faults degrade to the last-known in-memory
//! value with a warning.

use chrono::{DateTime, Utc};
use tracing::warn;

use skein_core::{Session, Visitor, VisitorId};

use crate::storage::{Storage, StorageKey};

/// Owns the current visitor and session state.
///
/// Opening the store starts a session: a fresh installation begins its
/// first one, an existing installation rotates into the next. The event
/// enqueued right after a session start carries the new-session flag.
#[derive(Debug)]
pub struct IdentityStore {
	storage: Box<dyn Storage>,
	visitor: Visitor,
	session: Session,
	opted_out: bool,
	last_order_at: Option<DateTime<Utc>>,
	new_session_pending: bool,
}

impl IdentityStore {
	/// Opens the store, materializing a fresh visitor and session on
	/// first use and persisting them.
	pub fn open(storage: Box<dyn Storage>) -> Self {
		let visitor = Self::load_visitor(storage.as_ref());
		let session = Self::load_session(storage.as_ref());
		let opted_out = Self::read(storage.as_ref(), StorageKey::OptedOut)
			.map(|v| v == "true")
			.unwrap_or(false);
		let last_order_at = Self::read(storage.as_ref(), StorageKey::LastOrderAt)
			.and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
			.map(|t| t.with_timezone(&Utc));

		let store = Self {
			storage,
			visitor,
			session,
			opted_out,
			last_order_at,
			new_session_pending: true,
		};
		store.persist_session();
		store
	}

	fn load_visitor(storage: &dyn Storage) -> Visitor {
		let stored = Self::read(storage, StorageKey::VisitorId).and_then(|v| {
			match v.parse::<VisitorId>() {
				Ok(id) => Some(id),
				Err(error) => {
					warn!(error = %error, "stored visitor id is invalid, regenerating");
					None
				}
			}
		});
		let id = match stored {
			Some(id) => id,
			None => {
				let id = VisitorId::random();
				Self::write(storage, StorageKey::VisitorId, Some(id.as_str()));
				id
			}
		};

		let user_id = Self::read(storage, StorageKey::UserId);
		let forced_id = Self::read(storage, StorageKey::ForcedVisitorId).and_then(|v| {
			match v.parse::<VisitorId>() {
				Ok(id) => Some(id),
				Err(error) => {
					warn!(error = %error, "stored forced visitor id is invalid, ignoring");
					None
				}
			}
		});

		Visitor {
			id,
			user_id,
			forced_id,
		}
	}

	fn load_session(storage: &dyn Storage) -> Session {
		let first_visit = Self::read_timestamp(storage, StorageKey::FirstVisit);
		let current_visit = Self::read_timestamp(storage, StorageKey::CurrentVisit);
		let visit_count = Self::read(storage, StorageKey::VisitCount).and_then(|v| v.parse::<u32>().ok());

		match (first_visit, current_visit, visit_count) {
			(Some(first_visit), Some(current_visit), Some(visit_count)) => {
				let stored = Session {
					first_visit,
					previous_visit: Self::read_timestamp(storage, StorageKey::PreviousVisit),
					current_visit,
					visit_count,
				};
				stored.next()
			}
			_ => Session::begin(),
		}
	}

	fn read_timestamp(storage: &dyn Storage, key: StorageKey) -> Option<DateTime<Utc>> {
		Self::read(storage, key)
			.and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
			.map(|t| t.with_timezone(&Utc))
	}

	fn read(storage: &dyn Storage, key: StorageKey) -> Option<String> {
		match storage.get(key) {
			Ok(value) => value,
			Err(error) => {
				warn!(key = key.as_str(), error = %error, "identity read failed, using in-memory default");
				None
			}
		}
	}

	fn write(storage: &dyn Storage, key: StorageKey, value: Option<&str>) {
		if let Err(error) = storage.set(key, value) {
			warn!(key = key.as_str(), error = %error, "identity write failed, keeping in-memory value");
		}
	}

	pub fn visitor(&self) -> &Visitor {
		&self.visitor
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn opted_out(&self) -> bool {
		self.opted_out
	}

	pub fn set_opted_out(&mut self, opted_out: bool) {
		self.opted_out = opted_out;
		let value = if opted_out { "true" } else { "false" };
		Self::write(self.storage.as_ref(), StorageKey::OptedOut, Some(value));
	}

	pub fn last_order_at(&self) -> Option<DateTime<Utc>> {
		self.last_order_at
	}

	/// Records that an order was tracked now.
	pub fn record_order_now(&mut self) {
		let now = Utc::now();
		self.last_order_at = Some(now);
		Self::write(
			self.storage.as_ref(),
			StorageKey::LastOrderAt,
			Some(&now.to_rfc3339()),
		);
	}

	pub fn set_user_id(&mut self, user_id: Option<String>) {
		Self::write(self.storage.as_ref(), StorageKey::UserId, user_id.as_deref());
		self.visitor.user_id = user_id;
	}

	/// Sets or clears the forced visitor id override.
	///
	/// Invalid values (anything but 16 hex characters) are rejected and
	/// the previously stored value is retained.
	pub fn set_forced_visitor_id(&mut self, forced_id: Option<&str>) {
		match forced_id {
			None => {
				self.visitor.forced_id = None;
				Self::write(self.storage.as_ref(), StorageKey::ForcedVisitorId, None);
			}
			Some(raw) => match raw.parse::<VisitorId>() {
				Ok(id) => {
					Self::write(
						self.storage.as_ref(),
						StorageKey::ForcedVisitorId,
						Some(id.as_str()),
					);
					self.visitor.forced_id = Some(id);
				}
				Err(error) => {
					warn!(forced_id = raw, error = %error, "rejecting forced visitor id, keeping previous value");
				}
			},
		}
	}

	/// Rotates into a new session and arms the new-session flag.
	pub fn start_new_session(&mut self) {
		self.session = self.session.next();
		self.new_session_pending = true;
		self.persist_session();
	}

	/// Consumes the new-session flag armed by the last session start.
	pub fn take_new_session_flag(&mut self) -> bool {
		std::mem::take(&mut self.new_session_pending)
	}

	/// Re-arms the flag when the event that consumed it was never
	/// enqueued.
	pub fn restore_new_session_flag(&mut self) {
		self.new_session_pending = true;
	}

	/// Value copies stamped into each event.
	pub fn snapshot(&self) -> (Visitor, Session) {
		(self.visitor.clone(), self.session.clone())
	}

	fn persist_session(&self) {
		let storage = self.storage.as_ref();
		Self::write(
			storage,
			StorageKey::FirstVisit,
			Some(&self.session.first_visit.to_rfc3339()),
		);
		Self::write(
			storage,
			StorageKey::PreviousVisit,
			self.session.previous_visit.map(|t| t.to_rfc3339()).as_deref(),
		);
		Self::write(
			storage,
			StorageKey::CurrentVisit,
			Some(&self.session.current_visit.to_rfc3339()),
		);
		Self::write(
			storage,
			StorageKey::VisitCount,
			Some(&self.session.visit_count.to_string()),
		);
	}
}
