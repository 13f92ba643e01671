// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Response delivery configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReporterConfigLayer {
	pub timeout_secs: Option<u64>,
	pub max_attempts: Option<u32>,
	pub base_delay_ms: Option<u64>,
	pub max_delay_ms: Option<u64>,
}

impl ReporterConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.base_delay_ms.is_some() {
			self.base_delay_ms = other.base_delay_ms;
		}
		if other.max_delay_ms.is_some() {
			self.max_delay_ms = other.max_delay_ms;
		}
	}

	pub fn finalize(self) -> ReporterConfig {
		ReporterConfig {
			timeout_secs: self.timeout_secs.unwrap_or(30),
			max_attempts: self.max_attempts.unwrap_or(3).max(1),
			base_delay_ms: self.base_delay_ms.unwrap_or(200),
			max_delay_ms: self.max_delay_ms.unwrap_or(5000),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReporterConfig {
	pub timeout_secs: u64,
	/// Delivery attempts including the first. Never zero.
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}

impl Default for ReporterConfig {
	fn default() -> Self {
		ReporterConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = ReporterConfig::default();
		assert_eq!(config.timeout_secs, 30);
		assert_eq!(config.max_attempts, 3);
		assert_eq!(config.base_delay_ms, 200);
		assert_eq!(config.max_delay_ms, 5000);
	}

	#[test]
	fn test_zero_attempts_still_delivers_once() {
		let config = ReporterConfigLayer {
			max_attempts: Some(0),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.max_attempts, 1);
	}
}
