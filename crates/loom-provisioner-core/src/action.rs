// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::budget::PollBudget;
use crate::error::Result;
use crate::event::ResourceProperties;
use crate::operation::{Operation, OperationSet};

/// When an action counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
	/// Poll every started operation until it is terminal or the budget runs out.
	Await(PollBudget),
	/// The start call's acceptance is the terminal signal; nothing is polled.
	OnSubmission,
}

/// One control-plane operation: how to find its targets, start it and check on it.
#[async_trait]
pub trait ActionClient: Send + Sync {
	type Target: Clone + fmt::Debug + fmt::Display + Send + Sync;

	/// Short action name used in logs, physical ids and failure messages.
	fn action(&self) -> &'static str;

	/// Resolve the targets for an event.
	///
	/// Configuration problems are reported here, before any start call.
	fn targets(&self, properties: &ResourceProperties) -> Result<Vec<Self::Target>>;

	fn completion(&self) -> Result<Completion>;

	/// Pause before the first start call, for resources the orchestrator has
	/// only just created.
	fn settle_delay(&self) -> Duration {
		Duration::ZERO
	}

	/// Start the action for one target.
	///
	/// `request_id` identifies the invocation so clients can derive idempotency
	/// tokens from it.
	async fn start(&self, target: &Self::Target, request_id: &str)
		-> Result<Operation<Self::Target>>;

	/// Fetch a refreshed view of a started operation.
	async fn poll(&self, operation: &Operation<Self::Target>) -> Result<Operation<Self::Target>>;

	/// Attributes returned to the orchestrator when every operation succeeded.
	fn response_data(&self, operations: &OperationSet<Self::Target>) -> BTreeMap<String, String> {
		let ids: Vec<&str> = operations
			.iter()
			.map(|op| op.operation_id.as_str())
			.collect();
		BTreeMap::from([("OperationIds".to_string(), ids.join(","))])
	}
}
