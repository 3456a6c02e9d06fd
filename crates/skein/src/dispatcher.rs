// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The dispatch controller draining the queue in bounded batches.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

use skein_core::EventId;

use crate::queue::EventQueue;
use crate::transport::Transport;

/// Dispatch controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
	/// Nothing in flight; the next trigger starts a drain pass.
	Idle,
	/// A drain pass is running; further triggers are no-ops.
	Dispatching,
	/// The last batch failed; waiting for the retry tick.
	AwaitingRetry,
}

/// Drains the queue through the transport, one bounded batch at a time.
///
/// Only one drain pass runs at a time. A batch is removed from the queue
/// strictly after the transport confirms it; a failed batch stays queued
/// verbatim and the controller parks until the next retry tick.
#[derive(Debug)]
pub struct Dispatcher {
	queue: Arc<dyn EventQueue>,
	transport: Arc<dyn Transport>,
	batch_size: usize,
	state: Mutex<DispatchState>,
}

impl Dispatcher {
	pub fn new(queue: Arc<dyn EventQueue>, transport: Arc<dyn Transport>, batch_size: usize) -> Self {
		Self {
			queue,
			transport,
			batch_size,
			state: Mutex::new(DispatchState::Idle),
		}
	}

	/// Current controller state.
	pub fn state(&self) -> DispatchState {
		*self.state.lock().expect("dispatch state lock poisoned")
	}

	fn begin(&self) -> bool {
		let mut state = self.state.lock().expect("dispatch state lock poisoned");
		if *state == DispatchState::Dispatching {
			debug!("dispatch already in progress, ignoring trigger");
			return false;
		}
		*state = DispatchState::Dispatching;
		true
	}

	fn settle(&self, next: DispatchState) {
		*self.state.lock().expect("dispatch state lock poisoned") = next;
	}

	/// Runs one drain pass: repeatedly peeks a bounded batch, sends it,
	/// and removes it on success, until the queue is empty or a send
	/// fails. Also serves as the retry tick; a parked controller
	/// re-evaluates the queue from here.
	pub async fn dispatch(&self) {
		if !self.begin() {
			return;
		}

		loop {
			let batch = self.queue.peek(self.batch_size).await;
			if batch.is_empty() {
				self.settle(DispatchState::Idle);
				return;
			}

			debug!(count = batch.len(), "sending event batch");
			match self.transport.send(&batch).await {
				Ok(()) => {
					let ids: Vec<EventId> = batch.iter().map(|e| e.id).collect();
					if let Err(fault) = self.queue.remove(&ids).await {
						// already delivered; the worst case is a re-send
						warn!(error = %fault, "failed to remove delivered batch from queue");
					}
				}
				Err(failure) => {
					error!(error = %failure, count = batch.len(), "batch send failed, leaving events queued");
					self.settle(DispatchState::AwaitingRetry);
					return;
				}
			}
		}
	}
}
