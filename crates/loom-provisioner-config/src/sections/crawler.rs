// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crawler configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrawlerConfigLayer {
	pub name: Option<String>,
	pub poll_interval_secs: Option<u64>,
	pub poll_deadline_secs: Option<u64>,
	pub settle_delay_secs: Option<u64>,
}

impl CrawlerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.name.is_some() {
			self.name = other.name;
		}
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.poll_deadline_secs.is_some() {
			self.poll_deadline_secs = other.poll_deadline_secs;
		}
		if other.settle_delay_secs.is_some() {
			self.settle_delay_secs = other.settle_delay_secs;
		}
	}

	pub fn finalize(self) -> CrawlerConfig {
		CrawlerConfig {
			name: self.name,
			poll_interval_secs: self.poll_interval_secs.unwrap_or(30),
			poll_deadline_secs: self.poll_deadline_secs.unwrap_or(1200), // 20 minutes
			settle_delay_secs: self.settle_delay_secs.unwrap_or(10),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlerConfig {
	/// Crawler started when the event does not name one.
	pub name: Option<String>,
	pub poll_interval_secs: u64,
	pub poll_deadline_secs: u64,
	pub settle_delay_secs: u64,
}

impl Default for CrawlerConfig {
	fn default() -> Self {
		CrawlerConfigLayer::default().finalize()
	}
}
