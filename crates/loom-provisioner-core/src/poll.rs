// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded polling primitive.

use std::future::Future;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::budget::PollBudget;

/// Result of one status check.
#[derive(Debug)]
pub enum Check<S> {
	Ready(S),
	Pending(S),
}

/// How a polling loop ended.
#[derive(Debug)]
pub enum Polled<S> {
	Ready { state: S, checks: u32 },
	Expired { state: S, checks: u32 },
}

impl<S> Polled<S> {
	pub fn checks(&self) -> u32 {
		match self {
			Polled::Ready { checks, .. } | Polled::Expired { checks, .. } => *checks,
		}
	}

	pub fn is_ready(&self) -> bool {
		matches!(self, Polled::Ready { .. })
	}

	pub fn into_state(self) -> S {
		match self {
			Polled::Ready { state, .. } | Polled::Expired { state, .. } => state,
		}
	}
}

/// Run `check` on the budget's cadence until it reports ready or the deadline
/// passes.
///
/// The state is threaded through each check by value so the check can mutate
/// it without holding a borrow across ticks. The first check happens one
/// interval after the call; a slow check never pushes the loop past the
/// deadline by more than that check's own duration.
pub async fn poll_until<S, F, Fut>(budget: &PollBudget, initial: S, mut check: F) -> Polled<S>
where
	F: FnMut(S, u32) -> Fut,
	Fut: Future<Output = Check<S>>,
{
	let started = Instant::now();
	let max_checks = budget.max_checks();
	let mut state = initial;

	for attempt in 1..=max_checks {
		tokio::time::sleep_until(started + budget.check_offset(attempt)).await;

		match check(state, attempt).await {
			Check::Ready(ready) => {
				debug!(attempt, "poll condition met");
				return Polled::Ready {
					state: ready,
					checks: attempt,
				};
			}
			Check::Pending(pending) => state = pending,
		}

		if started.elapsed() >= budget.deadline() {
			debug!(attempt, deadline_secs = budget.deadline().as_secs(), "poll deadline reached");
			return Polled::Expired {
				state,
				checks: attempt,
			};
		}
		trace!(attempt, max_checks, "condition pending");
	}

	Polled::Expired {
		state,
		checks: max_checks,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	fn budget(interval: u64, deadline: u64) -> PollBudget {
		PollBudget::new(Duration::from_secs(interval), Duration::from_secs(deadline)).unwrap()
	}

	#[tokio::test(start_paused = true)]
	async fn ready_on_second_check_waits_two_intervals() {
		let start = Instant::now();
		let polled = poll_until(&budget(30, 1200), 0u32, |seen, _| async move {
			let seen = seen + 1;
			if seen == 2 {
				Check::Ready(seen)
			} else {
				Check::Pending(seen)
			}
		})
		.await;

		assert!(polled.is_ready());
		assert_eq!(polled.checks(), 2);
		assert_eq!(start.elapsed(), Duration::from_secs(60));
	}

	#[tokio::test(start_paused = true)]
	async fn never_ready_expires_at_deadline_with_bounded_checks() {
		let start = Instant::now();
		let polled = poll_until(&budget(30, 1200), 0u32, |seen, _| async move {
			Check::Pending(seen + 1)
		})
		.await;

		assert!(!polled.is_ready());
		assert_eq!(polled.checks(), 40);
		assert_eq!(polled.into_state(), 40);
		assert_eq!(start.elapsed(), Duration::from_secs(1200));
	}

	#[tokio::test(start_paused = true)]
	async fn uneven_budget_makes_last_check_on_deadline() {
		let start = Instant::now();
		let polled = poll_until(&budget(10, 25), Vec::new(), |mut offsets: Vec<Duration>, _| {
			offsets.push(start.elapsed());
			async move { Check::Pending(offsets) }
		})
		.await;

		assert_eq!(
			polled.into_state(),
			vec![
				Duration::from_secs(10),
				Duration::from_secs(20),
				Duration::from_secs(25)
			]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn slow_checks_stop_at_deadline() {
		let start = Instant::now();
		let polled = poll_until(&budget(10, 60), 0u32, |seen, _| async move {
			tokio::time::sleep(Duration::from_secs(25)).await;
			Check::Pending(seen + 1)
		})
		.await;

		assert!(!polled.is_ready());
		assert!(polled.checks() < 6);
		assert!(start.elapsed() >= Duration::from_secs(60));
		assert!(start.elapsed() < Duration::from_secs(60 + 25 + 1));
	}
}
