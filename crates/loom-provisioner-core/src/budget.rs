// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use crate::error::{ProvisionerError, Result};

/// Cadence and total wait allowed for completion polling.
///
/// Check `k` (1-based) is due `min(k * interval, deadline)` after polling
/// starts, so a budget never performs more than `ceil(deadline / interval)`
/// checks and the final check lands on the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
	interval: Duration,
	deadline: Duration,
}

impl PollBudget {
	/// Requires `interval > 0` and `deadline >= interval`.
	pub fn new(interval: Duration, deadline: Duration) -> Result<Self> {
		if interval.is_zero() {
			return Err(ProvisionerError::configuration(
				"poll interval must be greater than zero",
			));
		}
		if deadline < interval {
			return Err(ProvisionerError::configuration(format!(
				"poll deadline ({}s) must not be shorter than the poll interval ({}s)",
				deadline.as_secs_f64(),
				interval.as_secs_f64()
			)));
		}
		Ok(Self { interval, deadline })
	}

	/// Crawls: every 30 seconds for up to 20 minutes.
	pub fn crawl_default() -> Self {
		Self {
			interval: Duration::from_secs(30),
			deadline: Duration::from_secs(20 * 60),
		}
	}

	/// Ingestion jobs: every 10 seconds for up to 4 minutes.
	pub fn ingestion_default() -> Self {
		Self {
			interval: Duration::from_secs(10),
			deadline: Duration::from_secs(240),
		}
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn deadline(&self) -> Duration {
		self.deadline
	}

	pub fn max_checks(&self) -> u32 {
		let interval = self.interval.as_nanos();
		let checks = self.deadline.as_nanos().div_ceil(interval);
		u32::try_from(checks).unwrap_or(u32::MAX)
	}

	/// Offset from the start of polling at which check `attempt` is due.
	pub fn check_offset(&self, attempt: u32) -> Duration {
		self.interval
			.checked_mul(attempt)
			.map_or(self.deadline, |offset| offset.min(self.deadline))
	}
}
