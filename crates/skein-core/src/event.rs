// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event records and payload variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dimensions::{CustomDimension, CustomVariable};
use crate::params::EventParams;
use crate::session::Session;
use crate::visitor::Visitor;

/// Unique identifier for an event, assigned at creation.
///
/// Queue removal is keyed by this id rather than by position, so entries
/// enqueued while a batch is in flight cannot corrupt the removal of that
/// batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for EventId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// One line item of a tracked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
	pub sku: String,
	pub name: Option<String>,
	pub category: Option<String>,
	pub price: Option<f64>,
	pub quantity: Option<u32>,
}

impl OrderItem {
	/// Creates an item with only a SKU; the remaining fields are optional.
	pub fn new(sku: impl Into<String>) -> Self {
		Self {
			sku: sku.into(),
			name: None,
			category: None,
			price: None,
			quantity: None,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn with_price(mut self, price: f64) -> Self {
		self.price = Some(price);
		self
	}

	pub fn with_quantity(mut self, quantity: u32) -> Self {
		self.quantity = Some(quantity);
		self
	}
}

/// The kind-specific payload of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
	/// A screen (or page) was shown.
	ScreenView {
		path: Vec<String>,
		url: Option<String>,
	},
	/// A custom action with category/action naming.
	Action {
		category: String,
		action: String,
		name: Option<String>,
		value: Option<f64>,
		url: Option<String>,
	},
	/// A goal conversion.
	Goal {
		goal_id: Option<u32>,
		revenue: Option<f64>,
	},
	/// A completed order.
	Order {
		id: String,
		items: Vec<OrderItem>,
		revenue: f64,
		sub_total: Option<f64>,
		tax: Option<f64>,
		shipping: Option<f64>,
		discount: Option<f64>,
	},
	/// A site-search query.
	Search {
		query: String,
		category: Option<String>,
		result_count: Option<u64>,
		url: Option<String>,
	},
	/// A content impression or interaction.
	Content {
		name: String,
		piece: Option<String>,
		target: Option<String>,
		interaction: Option<String>,
	},
}

/// An immutable record of one occurrence.
///
/// The visitor and session are copied by value at creation time; the
/// record stays frozen even if the live identity changes afterwards. It is
/// destroyed only when the queue confirms removal after successful
/// transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub id: EventId,
	pub created_at: DateTime<Utc>,
	pub visitor: Visitor,
	pub session: Session,
	/// Set on the first event enqueued after a session starts.
	pub is_new_session: bool,
	/// Timestamp of the most recent tracked order, if any.
	pub last_order_at: Option<DateTime<Utc>>,
	pub kind: EventKind,
	pub dimensions: Vec<CustomDimension>,
	pub variables: Vec<CustomVariable>,
	/// Free-form key-value parameters forwarded to the collector as-is.
	#[serde(default, skip_serializing_if = "EventParams::is_empty")]
	pub params: EventParams,
}

impl Event {
	/// Creates an event stamped with the given identity snapshot.
	#[must_use]
	pub fn new(visitor: Visitor, session: Session, kind: EventKind) -> Self {
		Self {
			id: EventId::new(),
			created_at: Utc::now(),
			visitor,
			session,
			is_new_session: false,
			last_order_at: None,
			kind,
			dimensions: Vec::new(),
			variables: Vec::new(),
			params: EventParams::new(),
		}
	}

	pub fn with_new_session(mut self, is_new_session: bool) -> Self {
		self.is_new_session = is_new_session;
		self
	}

	pub fn with_last_order_at(mut self, last_order_at: Option<DateTime<Utc>>) -> Self {
		self.last_order_at = last_order_at;
		self
	}

	pub fn with_dimensions(mut self, dimensions: Vec<CustomDimension>) -> Self {
		self.dimensions = dimensions;
		self
	}

	pub fn with_variables(mut self, variables: Vec<CustomVariable>) -> Self {
		self.variables = variables;
		self
	}

	pub fn with_params(mut self, params: EventParams) -> Self {
		self.params = params;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn test_event(kind: EventKind) -> Event {
		Event::new(Visitor::generate(), Session::begin(), kind)
	}

	#[test]
	fn event_snapshot_is_frozen() {
		let mut visitor = Visitor::generate();
		let session = Session::begin();
		let event = Event::new(
			visitor.clone(),
			session,
			EventKind::ScreenView {
				path: vec!["home".to_string()],
				url: None,
			},
		);

		visitor.user_id = Some("late@example.com".to_string());

		assert!(event.visitor.user_id.is_none());
	}

	#[test]
	fn payload_tag_format() {
		let event = test_event(EventKind::ScreenView {
			path: vec!["settings".to_string(), "profile".to_string()],
			url: Some("app://settings/profile".to_string()),
		});

		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["kind"]["type"], "screen_view");
		assert_eq!(json["kind"]["path"][1], "profile");
	}

	#[test]
	fn order_roundtrip() {
		let event = test_event(EventKind::Order {
			id: "order-1001".to_string(),
			items: vec![
				OrderItem::new("sku-1")
					.with_name("Widget")
					.with_price(19.99)
					.with_quantity(2),
				OrderItem::new("sku-2").with_category("gadgets"),
			],
			revenue: 49.98,
			sub_total: Some(39.98),
			tax: Some(5.0),
			shipping: Some(5.0),
			discount: None,
		});

		let json = serde_json::to_string(&event).unwrap();
		let back: Event = serde_json::from_str(&json).unwrap();
		assert_eq!(event, back);
	}

	#[test]
	fn builder_sets_shared_fields() {
		let event = test_event(EventKind::Goal {
			goal_id: Some(7),
			revenue: Some(10.0),
		})
		.with_new_session(true)
		.with_dimensions(vec![CustomDimension::new(1, "beta")]);

		assert!(event.is_new_session);
		assert_eq!(event.dimensions.len(), 1);
	}

	proptest! {
		#[test]
		fn event_id_is_unique(_seed: u64) {
			prop_assert_ne!(EventId::new(), EventId::new());
		}

		#[test]
		fn event_id_roundtrip(uuid_str in "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}") {
			if let Ok(id) = uuid_str.parse::<EventId>() {
				let s = id.to_string();
				let parsed: EventId = s.parse().unwrap();
				prop_assert_eq!(id, parsed);
			}
		}

		#[test]
		fn search_roundtrip(query in "[a-zA-Z0-9 ]{1,40}", count in proptest::option::of(0u64..1000)) {
			let event = test_event(EventKind::Search {
				query: query.clone(),
				category: None,
				result_count: count,
				url: None,
			});
			let json = serde_json::to_string(&event).unwrap();
			let back: Event = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(event, back);
		}
	}
}
