// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scripted action client and recording reporter for tests.
//!
//! These doubles let routing, polling and reporting be exercised without a
//! control plane or an orchestrator.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::action::{ActionClient, Completion};
use crate::budget::PollBudget;
use crate::error::{ProvisionerError, ReportError, Result};
use crate::event::{LifecycleEvent, ResourceProperties};
use crate::operation::Operation;
use crate::reporter::{ResponseBody, ResultReporter};

/// What the next status check of a target reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
	Run,
	Succeed,
	Fail(String),
	/// The status check itself fails.
	Error(String),
}

/// An [`ActionClient`] whose targets are plain strings and whose status checks
/// follow a per-target script. The last step of a script repeats; targets
/// without a script keep running.
///
/// Targets come from the `Targets` list property when present, otherwise from
/// the configured list.
#[derive(Debug)]
pub struct ScriptedActionClient {
	action: &'static str,
	targets: Vec<String>,
	target_error: Option<String>,
	start_error: Option<String>,
	start_panic: Option<String>,
	on_submission: bool,
	budget: (Duration, Duration),
	settle: Duration,
	scripts: Mutex<HashMap<String, VecDeque<Step>>>,
	start_calls: AtomicU32,
	poll_calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedActionClient {
	pub fn new(action: &'static str) -> Self {
		let budget = PollBudget::ingestion_default();
		Self {
			action,
			targets: Vec::new(),
			target_error: None,
			start_error: None,
			start_panic: None,
			on_submission: false,
			budget: (budget.interval(), budget.deadline()),
			settle: Duration::ZERO,
			scripts: Mutex::new(HashMap::new()),
			start_calls: AtomicU32::new(0),
			poll_calls: Mutex::new(HashMap::new()),
		}
	}

	pub fn with_targets<I, S>(mut self, targets: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.targets = targets.into_iter().map(Into::into).collect();
		self
	}

	pub fn script(self, target: &str, steps: impl IntoIterator<Item = Step>) -> Self {
		self
			.scripts
			.lock()
			.unwrap()
			.insert(target.to_string(), steps.into_iter().collect());
		self
	}

	pub fn budget(mut self, budget: PollBudget) -> Self {
		self.budget = (budget.interval(), budget.deadline());
		self
	}

	/// Budget values that are only validated when routing.
	pub fn raw_budget(mut self, interval: Duration, deadline: Duration) -> Self {
		self.budget = (interval, deadline);
		self
	}

	pub fn settle(mut self, delay: Duration) -> Self {
		self.settle = delay;
		self
	}

	/// Acceptance of the start call is terminal success.
	pub fn on_submission(mut self) -> Self {
		self.on_submission = true;
		self
	}

	pub fn target_error(mut self, message: impl Into<String>) -> Self {
		self.target_error = Some(message.into());
		self
	}

	pub fn start_error(mut self, message: impl Into<String>) -> Self {
		self.start_error = Some(message.into());
		self
	}

	pub fn start_panic(mut self, message: impl Into<String>) -> Self {
		self.start_panic = Some(message.into());
		self
	}

	pub fn start_calls(&self) -> u32 {
		self.start_calls.load(Ordering::SeqCst)
	}

	pub fn poll_calls(&self) -> u32 {
		self.poll_calls.lock().unwrap().values().sum()
	}

	pub fn poll_calls_for(&self, target: &str) -> u32 {
		self
			.poll_calls
			.lock()
			.unwrap()
			.get(target)
			.copied()
			.unwrap_or(0)
	}

	fn next_step(&self, target: &str) -> Step {
		let mut scripts = self.scripts.lock().unwrap();
		match scripts.get_mut(target) {
			Some(steps) if steps.len() > 1 => steps.pop_front().unwrap_or(Step::Run),
			Some(steps) => steps.front().cloned().unwrap_or(Step::Run),
			None => Step::Run,
		}
	}
}

#[async_trait]
impl ActionClient for ScriptedActionClient {
	type Target = String;

	fn action(&self) -> &'static str {
		self.action
	}

	fn targets(&self, properties: &ResourceProperties) -> Result<Vec<String>> {
		if let Some(message) = &self.target_error {
			return Err(ProvisionerError::configuration(message.clone()));
		}
		Ok(properties
			.list("Targets")?
			.unwrap_or_else(|| self.targets.clone()))
	}

	fn completion(&self) -> Result<Completion> {
		if self.on_submission {
			return Ok(Completion::OnSubmission);
		}
		let (interval, deadline) = self.budget;
		Ok(Completion::Await(PollBudget::new(interval, deadline)?))
	}

	fn settle_delay(&self) -> Duration {
		self.settle
	}

	async fn start(&self, target: &String, _request_id: &str) -> Result<Operation<String>> {
		self.start_calls.fetch_add(1, Ordering::SeqCst);
		if let Some(message) = &self.start_panic {
			panic!("{message}");
		}
		if let Some(message) = &self.start_error {
			return Err(ProvisionerError::ActionSubmission {
				action: self.action,
				target: target.clone(),
				message: message.clone(),
			});
		}
		let operation_id = format!("{target}-op");
		if self.on_submission {
			Ok(Operation::accepted(operation_id, target.clone()))
		} else {
			Ok(Operation::started(operation_id, target.clone()))
		}
	}

	async fn poll(&self, operation: &Operation<String>) -> Result<Operation<String>> {
		*self
			.poll_calls
			.lock()
			.unwrap()
			.entry(operation.target.clone())
			.or_default() += 1;

		let current = operation.clone();
		match self.next_step(&operation.target) {
			Step::Run => {
				let mut running = current.polling().with_status("RUNNING");
				running.detail = None;
				Ok(running)
			}
			Step::Succeed => Ok(current.succeeded().with_status("SUCCEEDED")),
			Step::Fail(reason) => Ok(current.with_status("FAILED").failed(reason)),
			Step::Error(message) => Err(ProvisionerError::PollingTransient {
				target: operation.target.clone(),
				message,
			}),
		}
	}
}

/// A [`ResultReporter`] that records every body it is asked to deliver.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
	delivered: Arc<Mutex<Vec<ResponseBody>>>,
	attempts: Arc<AtomicU32>,
	failure: Option<String>,
}

impl RecordingReporter {
	pub fn new() -> Self {
		Self::default()
	}

	/// A reporter whose deliveries always fail with a transport error.
	pub fn failing(message: impl Into<String>) -> Self {
		Self {
			failure: Some(message.into()),
			..Self::default()
		}
	}

	pub fn delivered(&self) -> Vec<ResponseBody> {
		self.delivered.lock().unwrap().clone()
	}

	pub fn attempts(&self) -> u32 {
		self.attempts.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ResultReporter for RecordingReporter {
	async fn deliver(&self, _event: &LifecycleEvent, body: &ResponseBody) -> std::result::Result<(), ReportError> {
		self.attempts.fetch_add(1, Ordering::SeqCst);
		if let Some(message) = &self.failure {
			return Err(ReportError::Transport(message.clone()));
		}
		self.delivered.lock().unwrap().push(body.clone());
		Ok(())
	}
}
