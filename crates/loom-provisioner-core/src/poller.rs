// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Completion polling over an [`OperationSet`].

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::action::ActionClient;
use crate::budget::PollBudget;
use crate::operation::OperationSet;
use crate::poll::{poll_until, Check, Polled};

/// Poll every pending member of `operations` until all are terminal or the
/// budget's deadline passes.
///
/// Each tick queries all pending members concurrently, one result slot per
/// member, and merges the results only after every query of the tick has
/// returned. A failed member stops being polled but never stops its siblings.
/// A failed status check leaves the member pending for that tick. Members still
/// pending at the deadline are marked [`TimedOut`](crate::OperationState::TimedOut).
#[instrument(skip_all, fields(action = client.action(), operations = operations.len()))]
pub async fn await_completion<C>(
	client: &C,
	operations: OperationSet<C::Target>,
	budget: &PollBudget,
) -> OperationSet<C::Target>
where
	C: ActionClient + ?Sized,
{
	if operations.is_settled() {
		debug!("no pending operations");
		return operations;
	}

	let polled = poll_until(budget, operations, move |mut set, attempt| async move {
		let (pending, queries): (Vec<usize>, Vec<_>) = set
			.iter()
			.enumerate()
			.filter(|(_, op)| op.state.is_pending())
			.map(|(index, op)| (index, client.poll(op)))
			.unzip();
		let results = join_all(queries).await;

		for (index, result) in pending.into_iter().zip(results) {
			let Some(member) = set.get_mut(index) else {
				continue;
			};
			member.checks += 1;
			match result {
				Ok(refreshed) => {
					let previous = member.state;
					member.absorb(refreshed);
					if member.state != previous {
						info!(
							resource = %member.target,
							operation_id = %member.operation_id,
							state = %member.state,
							status = member.status.as_deref().unwrap_or_default(),
							attempt,
							"operation state changed"
						);
					}
				}
				Err(err) => {
					warn!(
						resource = %member.target,
						operation_id = %member.operation_id,
						attempt,
						error = %err,
						"status check failed, will retry next tick"
					);
					member.detail = Some(err.to_string());
				}
			}
		}

		if set.is_settled() {
			Check::Ready(set)
		} else {
			Check::Pending(set)
		}
	})
	.await;

	match polled {
		Polled::Ready { state, checks } => {
			debug!(checks, "all operations terminal");
			state
		}
		Polled::Expired { mut state, checks } => {
			let pending = state.pending_indices().len();
			warn!(
				checks,
				pending,
				deadline_secs = budget.deadline().as_secs(),
				"deadline reached with operations still pending"
			);
			state.expire();
			state
		}
	}
}
