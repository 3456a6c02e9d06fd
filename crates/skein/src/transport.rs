// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport boundary for delivering event batches.
//!
//! The dispatcher is agnostic to how a batch reaches the collector; it
//! hands over a bounded slice of events and interprets the completion as
//! success or failure. `HttpTransport` is the production implementation;
//! tests and custom integrations bring their own.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use skein_core::Event;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::http;

/// Delivers batches of events to the collector.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
	/// Sends a batch. One serialized unit per event, batched per call.
	async fn send(&self, batch: &[Event]) -> Result<(), TrackerError>;
}

/// JSON envelope POSTed to the collector.
#[derive(Debug, Serialize)]
struct CollectEnvelope<'a> {
	site_id: &'a str,
	events: &'a [Event],
}

/// HTTP transport POSTing JSON batches to the collector endpoint.
#[derive(Debug)]
pub struct HttpTransport {
	client: reqwest::Client,
	endpoint: reqwest::Url,
	site_id: String,
}

impl HttpTransport {
	pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
		let endpoint = reqwest::Url::parse(&config.collector_url)
			.map_err(|_| TrackerError::InvalidCollectorUrl(config.collector_url.clone()))?;
		Ok(Self {
			client: http::new_client_with_timeout(config.request_timeout),
			endpoint,
			site_id: config.site_id.clone(),
		})
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, batch: &[Event]) -> Result<(), TrackerError> {
		let response = self
			.client
			.post(self.endpoint.clone())
			.json(&CollectEnvelope {
				site_id: &self.site_id,
				events: batch,
			})
			.send()
			.await?;

		let status = response.status();
		if status.is_success() {
			debug!(count = batch.len(), "batch accepted by collector");
			return Ok(());
		}

		if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
			let retry_after_secs = response
				.headers()
				.get(reqwest::header::RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|v| v.parse().ok());
			return Err(TrackerError::RateLimited { retry_after_secs });
		}

		let message = response.text().await.unwrap_or_default();
		Err(TrackerError::ServerError {
			status: status.as_u16(),
			message,
		})
	}
}
