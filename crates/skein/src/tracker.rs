// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracker facade: the single access point for application code.
//!
//! Every mutating operation (enqueue, identity mutation, dispatch
//! trigger) is serialized onto one logical execution context, so the
//! queue and identity store never observe interleaved partial updates
//! from two call sites. Tracking calls are fire-and-forget: they never
//! return an error to the caller; failures degrade to diagnostics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use skein_core::{
	CustomDimension, CustomVariable, DimensionSet, Event, EventKind, EventParams, OrderItem,
	Session, VariableSet, Visitor,
};

use crate::config::TrackerConfig;
use crate::dispatcher::{DispatchState, Dispatcher};
use crate::error::TrackerError;
use crate::identity::IdentityStore;
use crate::queue::{EventQueue, FileQueue, MemoryQueue};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::transport::{HttpTransport, Transport};

/// Mutable tracker state, serialized behind one lock.
#[derive(Debug)]
struct TrackerState {
	identity: IdentityStore,
	dimensions: DimensionSet,
	variables: VariableSet,
}

#[derive(Debug)]
struct TrackerInner {
	state: Mutex<TrackerState>,
	queue: Arc<dyn EventQueue>,
	dispatcher: Dispatcher,
	/// Dispatch interval in milliseconds; zero disables the timer.
	interval_ms: AtomicU64,
	/// Wakes the timer loop when the interval changes or shutdown begins.
	timer_notify: Notify,
	shutdown: AtomicBool,
}

/// The embeddable analytics tracker.
///
/// Cloning is cheap and shares the same underlying state. Construction
/// starts a new session and spawns the automatic dispatch timer; call
/// [`Tracker::shutdown`] to stop the timer. Queued events stay buffered
/// across shutdown; there is no flush-on-exit guarantee.
#[derive(Debug, Clone)]
pub struct Tracker {
	inner: Arc<TrackerInner>,
}

impl Tracker {
	/// Creates a tracker with the HTTP transport and file- or
	/// memory-backed persistence per the config.
	///
	/// Must be called within a tokio runtime; the dispatch timer is
	/// spawned onto it.
	pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
		let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
		let storage: Box<dyn Storage> = match &config.storage_path {
			Some(path) => Box::new(FileStorage::open(path)?),
			None => Box::new(MemoryStorage::new()),
		};
		let queue: Arc<dyn EventQueue> = match &config.queue_path {
			Some(path) => Arc::new(FileQueue::open(path, config.max_queue_size)?),
			None => Arc::new(MemoryQueue::new(config.max_queue_size)),
		};
		Ok(Self::with_parts(config, storage, queue, transport))
	}

	/// Creates a tracker from explicit parts.
	///
	/// This is the seam used by tests and by integrations that bring
	/// their own transport, queue, or storage.
	pub fn with_parts(
		config: TrackerConfig,
		storage: Box<dyn Storage>,
		queue: Arc<dyn EventQueue>,
		transport: Arc<dyn Transport>,
	) -> Self {
		let identity = IdentityStore::open(storage);
		let dispatcher = Dispatcher::new(Arc::clone(&queue), transport, config.max_batch_size);

		let inner = Arc::new(TrackerInner {
			state: Mutex::new(TrackerState {
				identity,
				dimensions: DimensionSet::new(),
				variables: VariableSet::new(),
			}),
			queue,
			dispatcher,
			interval_ms: AtomicU64::new(config.dispatch_interval.as_millis() as u64),
			timer_notify: Notify::new(),
			shutdown: AtomicBool::new(false),
		});

		tokio::spawn(timer_loop(Arc::clone(&inner)));

		Self { inner }
	}

	/// Tracks a screen view.
	pub async fn track_view(
		&self,
		path: Vec<String>,
		url: Option<String>,
		dimensions: Vec<CustomDimension>,
	) {
		self.track(EventKind::ScreenView { path, url }, dimensions).await;
	}

	/// Tracks a custom action event.
	pub async fn track_event(
		&self,
		category: impl Into<String>,
		action: impl Into<String>,
		name: Option<String>,
		value: Option<f64>,
		dimensions: Vec<CustomDimension>,
		url: Option<String>,
	) {
		self.track(
			EventKind::Action {
				category: category.into(),
				action: action.into(),
				name,
				value,
				url,
			},
			dimensions,
		)
		.await;
	}

	/// Tracks a goal conversion.
	pub async fn track_goal(&self, goal_id: Option<u32>, revenue: Option<f64>) {
		self.track(EventKind::Goal { goal_id, revenue }, Vec::new()).await;
	}

	/// Tracks a completed order and records the order timestamp.
	#[allow(clippy::too_many_arguments)]
	pub async fn track_order(
		&self,
		id: impl Into<String>,
		items: Vec<OrderItem>,
		revenue: f64,
		sub_total: Option<f64>,
		tax: Option<f64>,
		shipping: Option<f64>,
		discount: Option<f64>,
	) {
		self.track(
			EventKind::Order {
				id: id.into(),
				items,
				revenue,
				sub_total,
				tax,
				shipping,
				discount,
			},
			Vec::new(),
		)
		.await;
	}

	/// Tracks a site-search query.
	pub async fn track_search(
		&self,
		query: impl Into<String>,
		category: Option<String>,
		result_count: Option<u64>,
		dimensions: Vec<CustomDimension>,
		url: Option<String>,
	) {
		self.track(
			EventKind::Search {
				query: query.into(),
				category,
				result_count,
				url,
			},
			dimensions,
		)
		.await;
	}

	/// Tracks a content impression or interaction.
	pub async fn track_content(
		&self,
		name: impl Into<String>,
		piece: Option<String>,
		target: Option<String>,
		interaction: Option<String>,
	) {
		self.track(
			EventKind::Content {
				name: name.into(),
				piece,
				target,
				interaction,
			},
			Vec::new(),
		)
		.await;
	}

	/// Stamps the identity snapshot onto the payload and enqueues it.
	///
	/// Fire-and-forget: opted-out and shut-down trackers drop the event
	/// silently, and storage faults drop it with a warning. The
	/// new-session flag is consumed by the first successfully enqueued
	/// event after a session start.
	pub async fn track(&self, kind: EventKind, dimensions: Vec<CustomDimension>) {
		self.track_with_params(kind, dimensions, EventParams::new())
			.await;
	}

	/// Like [`Tracker::track`], with free-form parameters forwarded to
	/// the collector as-is.
	pub async fn track_with_params(
		&self,
		kind: EventKind,
		dimensions: Vec<CustomDimension>,
		params: EventParams,
	) {
		if self.inner.shutdown.load(Ordering::SeqCst) {
			debug!("tracker shut down, dropping event");
			return;
		}

		let mut state = self.inner.state.lock().await;
		if state.identity.opted_out() {
			debug!("tracking opted out, dropping event");
			return;
		}

		let is_order = matches!(kind, EventKind::Order { .. });
		let (visitor, session) = state.identity.snapshot();
		let event = Event::new(visitor, session, kind)
			.with_new_session(state.identity.take_new_session_flag())
			.with_last_order_at(state.identity.last_order_at())
			.with_dimensions(state.dimensions.merged_with(&dimensions))
			.with_variables(state.variables.merged_with(&[]))
			.with_params(params);
		let was_new_session = event.is_new_session;

		match self.inner.queue.enqueue(event).await {
			Ok(()) => {
				if is_order {
					state.identity.record_order_now();
				}
			}
			Err(fault) => {
				warn!(error = %fault, "enqueue failed, dropping event");
				if was_new_session {
					state.identity.restore_new_session_flag();
				}
			}
		}
	}

	/// Sets a tracker-level custom dimension stamped onto every event.
	pub async fn set_dimension(&self, index: u32, value: impl Into<String>) {
		let mut state = self.inner.state.lock().await;
		state.dimensions.set(CustomDimension::new(index, value));
	}

	/// Removes a tracker-level custom dimension. Removing an absent
	/// index is a no-op.
	pub async fn remove_dimension(&self, index: u32) {
		let mut state = self.inner.state.lock().await;
		state.dimensions.remove(index);
	}

	/// Sets a tracker-level custom variable stamped onto every event.
	pub async fn set_custom_variable(
		&self,
		index: u32,
		name: impl Into<String>,
		value: impl Into<String>,
	) {
		let mut state = self.inner.state.lock().await;
		state.variables.set(CustomVariable::new(index, name, value));
	}

	/// Removes a tracker-level custom variable. Removing an absent index
	/// is a no-op.
	pub async fn remove_custom_variable(&self, index: u32) {
		let mut state = self.inner.state.lock().await;
		state.variables.remove(index);
	}

	/// Enables or disables tracking.
	///
	/// While opted out, tracking calls become no-ops; events already
	/// queued still drain normally.
	pub async fn set_opted_out(&self, opted_out: bool) {
		let mut state = self.inner.state.lock().await;
		state.identity.set_opted_out(opted_out);
	}

	/// Sets or clears the application-supplied user identifier.
	pub async fn set_user_id(&self, user_id: Option<String>) {
		let mut state = self.inner.state.lock().await;
		state.identity.set_user_id(user_id);
	}

	/// Sets or clears the forced visitor id override.
	///
	/// Values that are not 16 hexadecimal characters are rejected with a
	/// diagnostic and the previous value is kept.
	pub async fn set_forced_visitor_id(&self, forced_id: Option<&str>) {
		let mut state = self.inner.state.lock().await;
		state.identity.set_forced_visitor_id(forced_id);
	}

	/// Starts a new session; the next tracked event carries the
	/// new-session flag.
	pub async fn start_new_session(&self) {
		let mut state = self.inner.state.lock().await;
		state.identity.start_new_session();
	}

	/// Snapshot of the current visitor.
	pub async fn visitor(&self) -> Visitor {
		self.inner.state.lock().await.identity.visitor().clone()
	}

	/// Snapshot of the current session.
	pub async fn session(&self) -> Session {
		self.inner.state.lock().await.identity.session().clone()
	}

	/// Manually triggers a drain pass. A pass already in flight makes
	/// this a no-op.
	pub async fn dispatch(&self) {
		self.inner.dispatcher.dispatch().await;
	}

	/// Number of queued, not-yet-sent events.
	pub async fn queue_len(&self) -> usize {
		self.inner.queue.len().await
	}

	/// Current dispatch controller state.
	pub fn dispatch_state(&self) -> DispatchState {
		self.inner.dispatcher.state()
	}

	/// Changes the automatic dispatch cadence.
	///
	/// The pending timer is cancelled and rearmed with the new interval;
	/// zero disables automatic dispatch (manual [`Tracker::dispatch`]
	/// still drains).
	pub fn set_dispatch_interval(&self, interval: Duration) {
		self.inner
			.interval_ms
			.store(interval.as_millis() as u64, Ordering::SeqCst);
		self.inner.timer_notify.notify_one();
	}

	/// Stops the dispatch timer and drops subsequent tracking calls.
	///
	/// Queued events stay buffered; no final flush is attempted.
	pub fn shutdown(&self) {
		self.inner.shutdown.store(true, Ordering::SeqCst);
		self.inner.timer_notify.notify_one();
	}
}

/// The automatic dispatch timer.
///
/// One timer exists per tracker. Changing the interval wakes the loop,
/// which drops the pending alarm and rearms with the new value; there is
/// never more than one alarm pending.
async fn timer_loop(inner: Arc<TrackerInner>) {
	info!("dispatch timer started");
	loop {
		if inner.shutdown.load(Ordering::SeqCst) {
			break;
		}

		let interval = Duration::from_millis(inner.interval_ms.load(Ordering::SeqCst));
		if interval.is_zero() {
			// automatic dispatch disabled; park until the interval changes
			inner.timer_notify.notified().await;
			continue;
		}

		tokio::select! {
			_ = tokio::time::sleep(interval) => {
				if inner.shutdown.load(Ordering::SeqCst) {
					break;
				}
				inner.dispatcher.dispatch().await;
			}
			_ = inner.timer_notify.notified() => {
				// interval changed or shutdown requested; rearm
			}
		}
	}
	info!("dispatch timer stopped");
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::sync::atomic::AtomicBool;

	use tokio::sync::Mutex as AsyncMutex;

	use crate::storage::MemoryStorage;

	#[derive(Debug)]
	struct MockTransport {
		batches: AsyncMutex<Vec<Vec<Event>>>,
		should_fail: AtomicBool,
	}

	impl MockTransport {
		fn new() -> Self {
			Self {
				batches: AsyncMutex::new(Vec::new()),
				should_fail: AtomicBool::new(false),
			}
		}

		fn set_should_fail(&self, fail: bool) {
			self.should_fail.store(fail, Ordering::SeqCst);
		}

		async fn sent_batches(&self) -> Vec<Vec<Event>> {
			self.batches.lock().await.clone()
		}
	}

	#[async_trait::async_trait]
	impl Transport for MockTransport {
		async fn send(&self, batch: &[Event]) -> Result<(), TrackerError> {
			if self.should_fail.load(Ordering::SeqCst) {
				return Err(TrackerError::ServerError {
					status: 500,
					message: "mock failure".to_string(),
				});
			}
			self.batches.lock().await.push(batch.to_vec());
			Ok(())
		}
	}

	struct TestHarness {
		tracker: Tracker,
		queue: Arc<MemoryQueue>,
		transport: Arc<MockTransport>,
	}

	fn harness_with_config(config: TrackerConfig) -> TestHarness {
		let queue = Arc::new(MemoryQueue::new(config.max_queue_size));
		let transport = Arc::new(MockTransport::new());
		let tracker = Tracker::with_parts(
			config,
			Box::new(MemoryStorage::new()),
			queue.clone(),
			transport.clone(),
		);
		TestHarness {
			tracker,
			queue,
			transport,
		}
	}

	fn harness() -> TestHarness {
		// long interval so tests drive dispatch manually
		let config = TrackerConfig {
			dispatch_interval: Duration::from_secs(3600),
			..TrackerConfig::new("https://collector.example.com/collect", "site-1")
		};
		harness_with_config(config)
	}

	#[tokio::test]
	async fn test_track_stamps_identity_and_enqueues() {
		let h = harness();

		h.tracker
			.track_view(vec!["home".to_string()], None, Vec::new())
			.await;

		assert_eq!(h.tracker.queue_len().await, 1);
		let event = &h.queue.peek(1).await[0];
		let visitor = h.tracker.visitor().await;
		assert_eq!(event.visitor.id, visitor.id);
		assert_eq!(event.session.visit_count, 1);
	}

	#[tokio::test]
	async fn test_dispatch_drains_and_settles_idle() {
		let h = harness();
		for i in 0..5 {
			h.tracker
				.track_event("ui", format!("click{i}"), None, None, Vec::new(), None)
				.await;
		}

		h.tracker.dispatch().await;

		assert_eq!(h.tracker.queue_len().await, 0);
		assert_eq!(h.tracker.dispatch_state(), DispatchState::Idle);
		assert_eq!(h.transport.sent_batches().await.len(), 1);
	}

	#[tokio::test]
	async fn test_opt_out_drops_new_events_but_drains_existing() {
		let h = harness();
		h.tracker.track_goal(Some(1), None).await;
		h.tracker.track_goal(Some(2), None).await;
		assert_eq!(h.tracker.queue_len().await, 2);

		h.tracker.set_opted_out(true).await;
		h.tracker.track_goal(Some(3), None).await;
		h.tracker
			.track_view(vec!["ignored".to_string()], None, Vec::new())
			.await;
		assert_eq!(h.tracker.queue_len().await, 2);

		// history is not purged; it still drains
		h.tracker.dispatch().await;
		assert_eq!(h.tracker.queue_len().await, 0);
		assert_eq!(h.transport.sent_batches().await[0].len(), 2);
	}

	#[tokio::test]
	async fn test_invalid_forced_id_keeps_previous_value() {
		let h = harness();

		h.tracker.set_forced_visitor_id(Some("00ff00ff00ff00ff")).await;
		h.tracker.set_forced_visitor_id(Some("nothex!!")).await;

		let visitor = h.tracker.visitor().await;
		assert_eq!(
			visitor.forced_id.as_ref().map(|id| id.as_str()),
			Some("00ff00ff00ff00ff")
		);
		assert_eq!(visitor.resolved_id(), "00ff00ff00ff00ff");
	}

	#[tokio::test]
	async fn test_new_session_flags_next_event_only() {
		let h = harness();

		// construction started the first session
		h.tracker.track_goal(None, None).await;
		h.tracker.track_goal(None, None).await;

		h.tracker.start_new_session().await;
		h.tracker.track_goal(None, None).await;
		h.tracker.track_goal(None, None).await;

		let events = h.queue.peek(10).await;
		assert_eq!(events.len(), 4);
		assert!(events[0].is_new_session);
		assert!(!events[1].is_new_session);
		assert!(events[2].is_new_session);
		assert!(!events[3].is_new_session);

		assert_eq!(events[1].session.visit_count, 1);
		assert_eq!(events[2].session.visit_count, 2);
	}

	#[tokio::test]
	async fn test_remove_absent_dimension_is_noop() {
		let h = harness();
		h.tracker.set_dimension(1, "beta").await;
		h.tracker.remove_dimension(42).await;

		h.tracker.track_goal(None, None).await;

		let event = &h.queue.peek(1).await[0];
		assert_eq!(event.dimensions, vec![CustomDimension::new(1, "beta")]);
	}

	#[tokio::test]
	async fn test_per_call_dimensions_override_tracker_level() {
		let h = harness();
		h.tracker.set_dimension(1, "base").await;
		h.tracker.set_dimension(2, "kept").await;

		h.tracker
			.track_view(
				vec!["home".to_string()],
				None,
				vec![CustomDimension::new(1, "override")],
			)
			.await;

		let event = &h.queue.peek(1).await[0];
		assert_eq!(
			event.dimensions,
			vec![
				CustomDimension::new(1, "override"),
				CustomDimension::new(2, "kept"),
			]
		);
	}

	#[tokio::test]
	async fn test_custom_variables_stamped_and_removable() {
		let h = harness();
		h.tracker.set_custom_variable(1, "plan", "pro").await;
		h.tracker.set_custom_variable(2, "tier", "gold").await;
		h.tracker.remove_custom_variable(2).await;
		h.tracker.remove_custom_variable(9).await;

		h.tracker.track_goal(None, None).await;

		let event = &h.queue.peek(1).await[0];
		assert_eq!(event.variables, vec![CustomVariable::new(1, "plan", "pro")]);
	}

	#[tokio::test]
	async fn test_params_forwarded_verbatim() {
		let h = harness();

		h.tracker
			.track_with_params(
				EventKind::Goal {
					goal_id: Some(1),
					revenue: None,
				},
				Vec::new(),
				EventParams::new().insert("campaign", "spring_launch"),
			)
			.await;

		let event = &h.queue.peek(1).await[0];
		assert_eq!(
			event.params.get("campaign"),
			Some(&serde_json::Value::String("spring_launch".to_string()))
		);
	}

	#[tokio::test]
	async fn test_order_updates_last_order_timestamp() {
		let h = harness();

		h.tracker
			.track_order("order-1", vec![OrderItem::new("sku-1")], 10.0, None, None, None, None)
			.await;
		h.tracker.track_goal(None, None).await;

		let events = h.queue.peek(10).await;
		// the order itself carries the previous (absent) timestamp
		assert!(events[0].last_order_at.is_none());
		// later events carry the recorded one
		assert!(events[1].last_order_at.is_some());
	}

	#[tokio::test]
	async fn test_user_id_snapshot_is_frozen_per_event() {
		let h = harness();

		h.tracker.track_goal(None, None).await;
		h.tracker.set_user_id(Some("late@example.com".to_string())).await;
		h.tracker.track_goal(None, None).await;

		let events = h.queue.peek(10).await;
		assert!(events[0].visitor.user_id.is_none());
		assert_eq!(events[1].visitor.user_id.as_deref(), Some("late@example.com"));
	}

	#[tokio::test]
	async fn test_shutdown_drops_tracking_calls() {
		let h = harness();
		h.tracker.shutdown();

		h.tracker.track_goal(None, None).await;
		assert_eq!(h.tracker.queue_len().await, 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_timer_retries_failed_batch() {
		let config = TrackerConfig {
			dispatch_interval: Duration::from_secs(30),
			..TrackerConfig::new("https://collector.example.com/collect", "site-1")
		};
		let h = harness_with_config(config);

		h.transport.set_should_fail(true);
		for _ in 0..3 {
			h.tracker.track_goal(None, None).await;
		}

		h.tracker.dispatch().await;
		assert_eq!(h.tracker.queue_len().await, 3);
		assert_eq!(h.tracker.dispatch_state(), DispatchState::AwaitingRetry);

		// the collector recovers; the next timer tick drains the queue
		h.transport.set_should_fail(false);
		tokio::time::sleep(Duration::from_secs(35)).await;

		assert_eq!(h.tracker.queue_len().await, 0);
		assert_eq!(h.tracker.dispatch_state(), DispatchState::Idle);
		assert_eq!(h.transport.sent_batches().await[0].len(), 3);
		h.tracker.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn test_zero_interval_disables_timer() {
		let config = TrackerConfig {
			dispatch_interval: Duration::ZERO,
			..TrackerConfig::new("https://collector.example.com/collect", "site-1")
		};
		let h = harness_with_config(config);

		h.tracker.track_goal(None, None).await;
		tokio::time::sleep(Duration::from_secs(300)).await;
		assert_eq!(h.tracker.queue_len().await, 1);

		// rearming with a non-zero interval resumes automatic dispatch
		h.tracker.set_dispatch_interval(Duration::from_secs(5));
		tokio::time::sleep(Duration::from_secs(10)).await;
		assert_eq!(h.tracker.queue_len().await, 0);
		h.tracker.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn test_timer_dispatches_periodically() {
		let config = TrackerConfig {
			dispatch_interval: Duration::from_secs(30),
			..TrackerConfig::new("https://collector.example.com/collect", "site-1")
		};
		let h = harness_with_config(config);

		h.tracker.track_goal(None, None).await;
		tokio::time::sleep(Duration::from_secs(31)).await;
		assert_eq!(h.tracker.queue_len().await, 0);

		h.tracker.track_goal(None, None).await;
		tokio::time::sleep(Duration::from_secs(31)).await;
		assert_eq!(h.tracker.queue_len().await, 0);

		assert_eq!(h.transport.sent_batches().await.len(), 2);
		h.tracker.shutdown();
	}
}
