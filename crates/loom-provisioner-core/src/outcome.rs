// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ProvisionerError;

/// The single result produced for a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
	Success { data: BTreeMap<String, String> },
	#[serde(rename = "FAILED")]
	Failure { reason: String },
}

impl Outcome {
	pub fn success(data: BTreeMap<String, String>) -> Self {
		Outcome::Success { data }
	}

	pub fn success_empty() -> Self {
		Outcome::Success {
			data: BTreeMap::new(),
		}
	}

	pub fn failure(reason: impl Into<String>) -> Self {
		Outcome::Failure {
			reason: reason.into(),
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, Outcome::Success { .. })
	}

	pub fn data(&self) -> Option<&BTreeMap<String, String>> {
		match self {
			Outcome::Success { data } => Some(data),
			Outcome::Failure { .. } => None,
		}
	}

	pub fn reason(&self) -> Option<&str> {
		match self {
			Outcome::Success { .. } => None,
			Outcome::Failure { reason } => Some(reason),
		}
	}
}

impl From<ProvisionerError> for Outcome {
	fn from(err: ProvisionerError) -> Self {
		Outcome::failure(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn serializes_with_orchestrator_status_names() {
		let success = Outcome::success(BTreeMap::from([(
			"Message".to_string(),
			"done".to_string(),
		)]));
		assert_eq!(
			serde_json::to_value(&success).unwrap(),
			json!({"status": "SUCCESS", "data": {"Message": "done"}})
		);

		let failure = Outcome::failure("boom");
		assert_eq!(
			serde_json::to_value(&failure).unwrap(),
			json!({"status": "FAILED", "reason": "boom"})
		);
	}

	#[test]
	fn error_converts_to_failure_with_message() {
		let outcome: Outcome = ProvisionerError::configuration("no crawler").into();
		assert!(!outcome.is_success());
		assert_eq!(outcome.reason(), Some("configuration error: no crawler"));
		assert_eq!(outcome.data(), None);
	}
}
