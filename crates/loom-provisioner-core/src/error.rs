// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionerError>;

/// Errors raised on the provisioning path.
///
/// None of these leave the [`LifecycleRouter`](crate::LifecycleRouter); each is
/// turned into a failure [`Outcome`](crate::Outcome) carrying its message.
#[derive(Debug, Error)]
pub enum ProvisionerError {
	/// Missing or malformed target identifiers or poll budget.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The control plane rejected the start call.
	#[error("failed to start {action} for {target}: {message}")]
	ActionSubmission {
		action: &'static str,
		target: String,
		message: String,
	},

	/// A status check failed. The poller keeps the member pending.
	#[error("status check for {target} failed: {message}")]
	PollingTransient { target: String, message: String },

	/// The control plane reported a failed terminal status.
	#[error("{action} failed for {}", .failures.join("; "))]
	TerminalFailure {
		action: &'static str,
		failures: Vec<String>,
	},

	/// The deadline passed with members still pending.
	#[error("timed out after {deadline_secs}s waiting for {}", .pending.join("; "))]
	Timeout {
		deadline_secs: u64,
		pending: Vec<String>,
	},
}

impl ProvisionerError {
	pub fn configuration(message: impl Into<String>) -> Self {
		ProvisionerError::Configuration(message.into())
	}
}

/// Errors delivering the response to the orchestrator.
#[derive(Debug, Error)]
pub enum ReportError {
	#[error("lifecycle event has no response URL")]
	MissingResponseUrl,

	#[error("failed to encode response: {0}")]
	Encode(#[from] serde_json::Error),

	#[error("response delivery failed: {0}")]
	Transport(String),

	#[error("response rejected with HTTP {status}: {body}")]
	Rejected { status: u16, body: String },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn terminal_failure_lists_every_target() {
		let err = ProvisionerError::TerminalFailure {
			action: "ingestion",
			failures: vec!["kb-1/ds-1: FAILED".to_string(), "kb-2/ds-2: STOPPED".to_string()],
		};
		assert_eq!(
			err.to_string(),
			"ingestion failed for kb-1/ds-1: FAILED; kb-2/ds-2: STOPPED"
		);
	}

	#[test]
	fn timeout_mentions_deadline_and_pending_targets() {
		let err = ProvisionerError::Timeout {
			deadline_secs: 1200,
			pending: vec!["crawler 'sales'".to_string()],
		};
		let message = err.to_string();
		assert!(message.contains("timed out after 1200s"));
		assert!(message.contains("crawler 'sales'"));
	}

	#[test]
	fn configuration_error_is_prefixed() {
		let err = ProvisionerError::configuration("crawler name is missing");
		assert_eq!(err.to_string(), "configuration error: crawler name is missing");
	}
}
