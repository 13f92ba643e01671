// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single delivery of an [`Outcome`] to the orchestrator.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::ReportError;
use crate::event::LifecycleEvent;
use crate::outcome::Outcome;

/// The orchestrator rejects response bodies over 4 KiB; the reason is the
/// only unbounded field.
const MAX_REASON_CHARS: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
	Success,
	Failed,
}

/// Response document addressed with identifiers echoed from the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseBody {
	pub status: ResponseStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	pub physical_resource_id: String,
	pub stack_id: String,
	pub request_id: String,
	pub logical_resource_id: String,
	pub no_echo: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<BTreeMap<String, String>>,
}

impl ResponseBody {
	pub fn new(event: &LifecycleEvent, physical_resource_id: String, outcome: &Outcome) -> Self {
		let (status, reason, data) = match outcome {
			Outcome::Success { data } => (ResponseStatus::Success, None, Some(data.clone())),
			Outcome::Failure { reason } => {
				(ResponseStatus::Failed, Some(truncate_reason(reason)), None)
			}
		};
		Self {
			status,
			reason,
			physical_resource_id,
			stack_id: event.stack_id.clone(),
			request_id: event.request_id.clone(),
			logical_resource_id: event.logical_resource_id.clone(),
			no_echo: false,
			data,
		}
	}
}

fn truncate_reason(reason: &str) -> String {
	if reason.chars().count() <= MAX_REASON_CHARS {
		return reason.to_string();
	}
	let mut truncated: String = reason.chars().take(MAX_REASON_CHARS - 3).collect();
	truncated.push_str("...");
	truncated
}

/// Transport for response documents.
#[async_trait]
pub trait ResultReporter: Send + Sync {
	async fn deliver(&self, event: &LifecycleEvent, body: &ResponseBody) -> Result<(), ReportError>;
}

/// The right to answer one lifecycle event, consumed by [`ResponseHandle::send`].
///
/// A handle is created once per event, so the event can be answered at most
/// once. The [`Handler`](crate::Handler) always sends, which makes it at least once.
pub struct ResponseHandle<'a, R: ?Sized> {
	reporter: &'a R,
	event: &'a LifecycleEvent,
	physical_resource_id: String,
}

impl<'a, R: ResultReporter + ?Sized> ResponseHandle<'a, R> {
	pub fn new(reporter: &'a R, event: &'a LifecycleEvent, physical_resource_id: String) -> Self {
		Self {
			reporter,
			event,
			physical_resource_id,
		}
	}

	pub fn physical_resource_id(&self) -> &str {
		&self.physical_resource_id
	}

	#[instrument(skip_all, fields(request_id = %self.event.request_id, success = outcome.is_success()))]
	pub async fn send(self, outcome: &Outcome) -> Result<(), ReportError> {
		let body = ResponseBody::new(self.event, self.physical_resource_id, outcome);
		match self.reporter.deliver(self.event, &body).await {
			Ok(()) => {
				info!(physical_resource_id = %body.physical_resource_id, status = ?body.status, "response delivered");
				Ok(())
			}
			Err(err) => {
				warn!(error = %err, "response delivery failed");
				Err(err)
			}
		}
	}
}
