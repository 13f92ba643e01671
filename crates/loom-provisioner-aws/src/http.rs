// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client construction with a consistent User-Agent header.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

/// Format: `loom-provisioner/{version}`
pub fn user_agent() -> String {
	format!("loom-provisioner/{}", env!("CARGO_PKG_VERSION"))
}

pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Client whose requests fail once `timeout` elapses.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], "loom-provisioner");
	}
}
