// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControlPlaneError>;

/// Errors from a single control-plane call.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// The service answered with an error document.
	#[error("{code} (HTTP {status}): {message}")]
	Service {
		status: u16,
		code: String,
		message: String,
	},

	#[error("invalid response body: {0}")]
	Json(#[from] serde_json::Error),
}

impl ControlPlaneError {
	/// Service error code without namespace, e.g. `CrawlerRunningException`.
	pub fn code(&self) -> Option<&str> {
		match self {
			ControlPlaneError::Service { code, .. } => Some(code),
			_ => None,
		}
	}

	pub fn is_transient(&self) -> bool {
		match self {
			ControlPlaneError::Http(err) => err.is_timeout() || err.is_connect(),
			ControlPlaneError::Service { status, code, .. } => {
				*status == 429 || *status >= 500 || code.contains("Throttling")
			}
			ControlPlaneError::Json(_) => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn service(status: u16, code: &str) -> ControlPlaneError {
		ControlPlaneError::Service {
			status,
			code: code.to_string(),
			message: "m".to_string(),
		}
	}

	#[test]
	fn code_is_only_set_for_service_errors() {
		assert_eq!(service(400, "EntityNotFoundException").code(), Some("EntityNotFoundException"));
		let json = serde_json::from_str::<u8>("x").unwrap_err();
		assert_eq!(ControlPlaneError::from(json).code(), None);
	}

	#[test]
	fn throttling_and_server_errors_are_transient() {
		assert!(service(400, "ThrottlingException").is_transient());
		assert!(service(503, "ServiceUnavailable").is_transient());
		assert!(!service(400, "ValidationException").is_transient());
	}
}
