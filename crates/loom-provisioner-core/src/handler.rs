// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One invocation: route the event, then answer it exactly once.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, instrument};

use crate::action::ActionClient;
use crate::error::ReportError;
use crate::event::LifecycleEvent;
use crate::outcome::Outcome;
use crate::reporter::{ResponseHandle, ResultReporter};
use crate::router::LifecycleRouter;

pub struct Handler<C, R> {
	router: LifecycleRouter<C>,
	reporter: R,
}

impl<C: ActionClient, R: ResultReporter> Handler<C, R> {
	pub fn new(client: C, reporter: R) -> Self {
		Self {
			router: LifecycleRouter::new(client),
			reporter,
		}
	}

	pub fn client(&self) -> &C {
		self.router.client()
	}

	pub fn reporter(&self) -> &R {
		&self.reporter
	}

	/// Route `event` and deliver its outcome.
	///
	/// The response is sent even when routing panics; the panic message becomes
	/// the failure reason. The returned error only ever describes delivery.
	#[instrument(skip_all, fields(request_id = %event.request_id, action = self.client().action()))]
	pub async fn handle(&self, event: &LifecycleEvent) -> Result<Outcome, ReportError> {
		let physical_resource_id = event.physical_resource_id_for(self.client().action());
		let response = ResponseHandle::new(&self.reporter, event, physical_resource_id);

		let outcome = match AssertUnwindSafe(self.router.route(event))
			.catch_unwind()
			.await
		{
			Ok(outcome) => outcome,
			Err(panic) => {
				let message = panic_message(panic.as_ref());
				error!(panic = %message, "provisioning panicked");
				Outcome::failure(format!("provisioning panicked: {message}"))
			}
		};

		response.send(&outcome).await?;
		Ok(outcome)
	}
}

/// Answer `event` with a failure without routing it.
///
/// Used when an invocation cannot even build its action client, so the
/// orchestrator is still released instead of waiting out its own timeout.
pub async fn reject<R: ResultReporter + ?Sized>(
	reporter: &R,
	event: &LifecycleEvent,
	action: &str,
	reason: impl Into<String>,
) -> Result<Outcome, ReportError> {
	let outcome = Outcome::failure(reason);
	ResponseHandle::new(reporter, event, event.physical_resource_id_for(action))
		.send(&outcome)
		.await?;
	Ok(outcome)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::RequestType;
	use crate::mock::{RecordingReporter, ScriptedActionClient, Step};
	use crate::reporter::ResponseStatus;

	#[tokio::test(start_paused = true)]
	async fn success_is_reported_once() {
		let client = ScriptedActionClient::new("crawl")
			.with_targets(["sales"])
			.script("sales", [Step::Succeed]);
		let handler = Handler::new(client, RecordingReporter::new());
		let event = LifecycleEvent::new(RequestType::Create, "r1").with_logical_resource_id("Crawler");

		let outcome = handler.handle(&event).await.unwrap();

		assert!(outcome.is_success());
		let delivered = handler.reporter().delivered();
		assert_eq!(delivered.len(), 1);
		assert_eq!(delivered[0].status, ResponseStatus::Success);
		assert_eq!(delivered[0].physical_resource_id, "crawl-Crawler");
	}

	#[tokio::test(start_paused = true)]
	async fn panic_in_start_is_reported_as_failure() {
		let client = ScriptedActionClient::new("ingestion")
			.with_targets(["a"])
			.start_panic("client exploded");
		let handler = Handler::new(client, RecordingReporter::new());
		let event = LifecycleEvent::new(RequestType::Create, "r1");

		let outcome = handler.handle(&event).await.unwrap();

		assert_eq!(outcome.reason(), Some("provisioning panicked: client exploded"));
		let delivered = handler.reporter().delivered();
		assert_eq!(delivered.len(), 1);
		assert_eq!(delivered[0].status, ResponseStatus::Failed);
	}

	#[tokio::test(start_paused = true)]
	async fn delivery_failure_is_surfaced_after_one_attempt() {
		let client = ScriptedActionClient::new("crawl");
		let handler = Handler::new(client, RecordingReporter::failing("dns failure"));
		let event = LifecycleEvent::new(RequestType::Delete, "r1");

		let result = handler.handle(&event).await;

		assert!(matches!(result, Err(ReportError::Transport(_))));
		assert_eq!(handler.reporter().attempts(), 1);
	}

	#[tokio::test]
	async fn reject_reports_failure_without_routing() {
		let reporter = RecordingReporter::new();
		let event = LifecycleEvent::new(RequestType::Create, "r1").with_logical_resource_id("Grant");

		let outcome = reject(&reporter, &event, "grant", "configuration error: bad env")
			.await
			.unwrap();

		assert!(!outcome.is_success());
		let delivered = reporter.delivered();
		assert_eq!(delivered.len(), 1);
		assert_eq!(delivered[0].reason.as_deref(), Some("configuration error: bad env"));
		assert_eq!(delivered[0].physical_resource_id, "grant-Grant");
	}

	#[test]
	fn panic_message_handles_common_payloads() {
		let static_str: Box<dyn Any + Send> = Box::new("static");
		let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
		let other: Box<dyn Any + Send> = Box::new(7u8);
		assert_eq!(panic_message(static_str.as_ref()), "static");
		assert_eq!(panic_message(owned.as_ref()), "owned");
		assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
	}
}
