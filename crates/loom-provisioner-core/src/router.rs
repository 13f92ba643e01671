// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tracing::{info, instrument, warn};

use crate::action::{ActionClient, Completion};
use crate::error::Result;
use crate::event::{LifecycleEvent, RequestType};
use crate::operation::OperationSet;
use crate::outcome::Outcome;
use crate::poller::await_completion;

/// Routes lifecycle events to one [`ActionClient`].
///
/// Create and Update start the action and wait for it; Delete is always a
/// successful no-op because teardown belongs to the declarative layer.
pub struct LifecycleRouter<C> {
	client: C,
}

impl<C: ActionClient> LifecycleRouter<C> {
	pub fn new(client: C) -> Self {
		Self { client }
	}

	pub fn client(&self) -> &C {
		&self.client
	}

	/// Produce the outcome for `event`. Never fails: every error on the
	/// provisioning path becomes a failure outcome.
	#[instrument(skip_all, fields(action = self.client.action(), request_id = %event.request_id, request_type = %event.request_type))]
	pub async fn route(&self, event: &LifecycleEvent) -> Outcome {
		match event.request_type {
			RequestType::Delete => {
				info!("nothing to do for delete");
				Outcome::success_empty()
			}
			RequestType::Create | RequestType::Update => match self.provision(event).await {
				Ok(outcome) => outcome,
				Err(err) => {
					warn!(error = %err, "provisioning failed");
					err.into()
				}
			},
		}
	}

	async fn provision(&self, event: &LifecycleEvent) -> Result<Outcome> {
		let action = self.client.action();
		let targets = self.client.targets(&event.resource_properties)?;
		let completion = self.client.completion()?;

		if targets.is_empty() {
			info!("no targets configured, nothing to provision");
			return Ok(Outcome::success(
				self.client.response_data(&OperationSet::default()),
			));
		}

		let settle = self.client.settle_delay();
		if !settle.is_zero() {
			info!(settle_secs = settle.as_secs_f64(), "waiting before starting");
			tokio::time::sleep(settle).await;
		}

		let mut operations = OperationSet::default();
		for target in &targets {
			let operation = self.client.start(target, &event.request_id).await?;
			info!(
				resource = %target,
				operation_id = %operation.operation_id,
				state = %operation.state,
				"operation started"
			);
			operations.push(operation);
		}

		let (operations, deadline) = match completion {
			Completion::OnSubmission => (operations, std::time::Duration::ZERO),
			Completion::Await(budget) => (
				await_completion(&self.client, operations, &budget).await,
				budget.deadline(),
			),
		};

		match operations.failure_reason(action, deadline) {
			None => {
				info!(operations = operations.len(), "all operations succeeded");
				Ok(Outcome::success(self.client.response_data(&operations)))
			}
			Some(reason) => {
				warn!(reason = %reason, "operations did not succeed");
				Ok(Outcome::failure(reason))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::budget::PollBudget;
	use crate::mock::{ScriptedActionClient, Step};
	use std::time::Duration;
	use tokio::time::Instant;

	fn event(request_type: RequestType) -> LifecycleEvent {
		LifecycleEvent::new(request_type, "req-1").with_logical_resource_id("Hook")
	}

	#[tokio::test(start_paused = true)]
	async fn delete_is_a_successful_no_op() {
		let client = ScriptedActionClient::new("crawl").with_targets(["sales"]);
		let router = LifecycleRouter::new(client);
		let outcome = router.route(&event(RequestType::Delete)).await;

		assert_eq!(outcome, Outcome::success_empty());
		assert_eq!(router.client().start_calls(), 0);
		assert_eq!(router.client().poll_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn update_runs_the_same_path_as_create() {
		let client = ScriptedActionClient::new("crawl")
			.with_targets(["sales"])
			.script("sales", [Step::Succeed]);
		let router = LifecycleRouter::new(client);
		let outcome = router.route(&event(RequestType::Update)).await;

		assert!(outcome.is_success());
		assert_eq!(router.client().start_calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn no_targets_succeeds_without_calls() {
		let router = LifecycleRouter::new(ScriptedActionClient::new("ingestion"));
		let outcome = router.route(&event(RequestType::Create)).await;

		assert!(outcome.is_success());
		assert_eq!(router.client().start_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn target_errors_become_failures_before_any_start() {
		let client = ScriptedActionClient::new("ingestion")
			.with_targets(["a"])
			.target_error("2 knowledge base ids but 1 data source ids");
		let router = LifecycleRouter::new(client);
		let outcome = router.route(&event(RequestType::Create)).await;

		assert!(outcome.reason().unwrap().starts_with("configuration error"));
		assert_eq!(router.client().start_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn invalid_budget_is_reported_as_configuration_error() {
		let client = ScriptedActionClient::new("crawl")
			.with_targets(["sales"])
			.raw_budget(Duration::from_secs(30), Duration::from_secs(5));
		let router = LifecycleRouter::new(client);
		let outcome = router.route(&event(RequestType::Create)).await;

		assert!(outcome.reason().unwrap().contains("poll deadline"));
		assert_eq!(router.client().start_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn submission_error_is_reported_and_stops_further_starts() {
		let client = ScriptedActionClient::new("ingestion")
			.with_targets(["a", "b"])
			.start_error("AccessDeniedException: not authorized");
		let router = LifecycleRouter::new(client);
		let outcome = router.route(&event(RequestType::Create)).await;

		let reason = outcome.reason().unwrap();
		assert!(reason.contains("failed to start ingestion for a"));
		assert!(reason.contains("AccessDeniedException"));
		assert_eq!(router.client().start_calls(), 1);
		assert_eq!(router.client().poll_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn settle_delay_precedes_start() {
		let client = ScriptedActionClient::new("crawl")
			.with_targets(["sales"])
			.settle(Duration::from_secs(10))
			.budget(PollBudget::crawl_default())
			.script("sales", [Step::Succeed]);
		let router = LifecycleRouter::new(client);
		let start = Instant::now();
		let outcome = router.route(&event(RequestType::Create)).await;

		assert!(outcome.is_success());
		assert_eq!(start.elapsed(), Duration::from_secs(10 + 30));
	}

	#[tokio::test(start_paused = true)]
	async fn success_data_comes_from_the_client() {
		let client = ScriptedActionClient::new("ingestion")
			.with_targets(["a", "b"])
			.script("a", [Step::Succeed])
			.script("b", [Step::Succeed]);
		let router = LifecycleRouter::new(client);
		let outcome = router.route(&event(RequestType::Create)).await;

		assert_eq!(
			outcome.data().unwrap().get("OperationIds").map(String::as_str),
			Some("a-op,b-op")
		);
	}
}
