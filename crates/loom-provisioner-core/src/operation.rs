// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Externally tracked units of work and the sets they are started in.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ProvisionerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
	Started,
	Polling,
	Succeeded,
	Failed,
	TimedOut,
}

impl OperationState {
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			OperationState::Succeeded | OperationState::Failed | OperationState::TimedOut
		)
	}

	pub fn is_pending(self) -> bool {
		!self.is_terminal()
	}
}

impl fmt::Display for OperationState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			OperationState::Started => "started",
			OperationState::Polling => "polling",
			OperationState::Succeeded => "succeeded",
			OperationState::Failed => "failed",
			OperationState::TimedOut => "timed_out",
		};
		f.write_str(name)
	}
}

/// One asynchronous unit of work tracked by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation<T> {
	/// Assigned by the control plane when the start call returns.
	pub operation_id: String,
	pub target: T,
	pub state: OperationState,
	/// Raw status string last reported by the control plane.
	pub status: Option<String>,
	/// Failure reason, or the last transient status-check error.
	pub detail: Option<String>,
	/// Status checks issued against this operation.
	pub checks: u32,
}

impl<T> Operation<T> {
	/// An operation the control plane accepted and that still has to be polled.
	pub fn started(operation_id: impl Into<String>, target: T) -> Self {
		Self {
			operation_id: operation_id.into(),
			target,
			state: OperationState::Started,
			status: None,
			detail: None,
			checks: 0,
		}
	}

	/// An operation whose acceptance is its terminal success.
	pub fn accepted(operation_id: impl Into<String>, target: T) -> Self {
		Self {
			state: OperationState::Succeeded,
			..Self::started(operation_id, target)
		}
	}

	pub fn with_status(mut self, status: impl Into<String>) -> Self {
		self.status = Some(status.into());
		self
	}

	pub fn polling(mut self) -> Self {
		self.state = OperationState::Polling;
		self
	}

	pub fn succeeded(mut self) -> Self {
		self.state = OperationState::Succeeded;
		self.detail = None;
		self
	}

	pub fn failed(mut self, detail: impl Into<String>) -> Self {
		self.state = OperationState::Failed;
		self.detail = Some(detail.into());
		self
	}

	/// Copy state, status and detail from a refreshed view of this operation.
	///
	/// Identity fields are never taken from the refresh, and a refresh that
	/// comes back `Started` counts as `Polling`.
	pub(crate) fn absorb(&mut self, refreshed: Operation<T>) {
		self.state = match refreshed.state {
			OperationState::Started => OperationState::Polling,
			state => state,
		};
		if refreshed.status.is_some() {
			self.status = refreshed.status;
		}
		self.detail = refreshed.detail;
	}
}

impl<T: fmt::Display> Operation<T> {
	fn describe(&self) -> String {
		let mut description = self.target.to_string();
		match (&self.status, &self.detail) {
			(Some(status), Some(detail)) => {
				description.push_str(&format!(" (status {status}: {detail})"))
			}
			(Some(status), None) => description.push_str(&format!(" (status {status})")),
			(None, Some(detail)) => description.push_str(&format!(" ({detail})")),
			(None, None) => {}
		}
		description
	}
}

/// Operations started together for one lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSet<T> {
	operations: Vec<Operation<T>>,
}

impl<T> Default for OperationSet<T> {
	fn default() -> Self {
		Self {
			operations: Vec::new(),
		}
	}
}

impl<T> OperationSet<T> {
	pub fn new(operations: Vec<Operation<T>>) -> Self {
		Self { operations }
	}

	pub fn push(&mut self, operation: Operation<T>) {
		self.operations.push(operation);
	}

	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Operation<T>> {
		self.operations.iter()
	}

	pub fn get(&self, index: usize) -> Option<&Operation<T>> {
		self.operations.get(index)
	}

	pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Operation<T>> {
		self.operations.get_mut(index)
	}

	/// Indices of members that still need status checks.
	pub fn pending_indices(&self) -> Vec<usize> {
		self
			.operations
			.iter()
			.enumerate()
			.filter(|(_, op)| op.state.is_pending())
			.map(|(index, _)| index)
			.collect()
	}

	/// Every member is terminal. Vacuously true for an empty set.
	pub fn is_settled(&self) -> bool {
		self.operations.iter().all(|op| op.state.is_terminal())
	}

	/// Every member succeeded. Vacuously true for an empty set.
	pub fn all_succeeded(&self) -> bool {
		self
			.operations
			.iter()
			.all(|op| op.state == OperationState::Succeeded)
	}

	/// Mark every still-pending member as timed out.
	pub fn expire(&mut self) {
		for op in self.operations.iter_mut().filter(|op| op.state.is_pending()) {
			op.state = OperationState::TimedOut;
		}
	}

	pub fn into_operations(self) -> Vec<Operation<T>> {
		self.operations
	}
}

impl<T: fmt::Display> OperationSet<T> {
	/// Why the set did not succeed, or `None` when every member succeeded.
	///
	/// Failed members are reported before timed-out ones; no member is left out.
	pub fn failure_reason(&self, action: &'static str, deadline: Duration) -> Option<String> {
		if self.all_succeeded() {
			return None;
		}

		let failures: Vec<String> = self
			.operations
			.iter()
			.filter(|op| op.state == OperationState::Failed)
			.map(Operation::describe)
			.collect();
		let pending: Vec<String> = self
			.operations
			.iter()
			.filter(|op| op.state != OperationState::Succeeded && op.state != OperationState::Failed)
			.map(Operation::describe)
			.collect();

		let mut reasons = Vec::new();
		if !failures.is_empty() {
			reasons.push(ProvisionerError::TerminalFailure { action, failures }.to_string());
		}
		if !pending.is_empty() {
			reasons.push(
				ProvisionerError::Timeout {
					deadline_secs: deadline.as_secs(),
					pending,
				}
				.to_string(),
			);
		}
		Some(reasons.join("; "))
	}
}
