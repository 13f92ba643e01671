// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Asynchronous provisioning operation controller.
//!
//! Provisioning hooks all share one shape: a lifecycle event arrives from the
//! orchestrator, an idempotent action is started against a control plane that
//! completes asynchronously, the control plane is polled under a bounded budget
//! and exactly one outcome is reported back to the waiting orchestrator.
//!
//! This crate provides the pieces of that shape:
//!
//! - [`ActionClient`]: the start/poll capability of one control-plane operation
//! - [`poll_until`]: the bounded polling primitive
//! - [`await_completion`]: fan-out polling of an [`OperationSet`]
//! - [`LifecycleRouter`]: Create/Update/Delete dispatch that never lets an error escape
//! - [`ResultReporter`] / [`ResponseHandle`]: single delivery of the [`Outcome`]
//! - [`Handler`]: router and reporter wired together for one invocation

pub mod action;
pub mod budget;
pub mod error;
pub mod event;
pub mod handler;
pub mod mock;
pub mod operation;
pub mod outcome;
pub mod poll;
pub mod poller;
pub mod reporter;
pub mod router;

pub use action::{ActionClient, Completion};
pub use budget::PollBudget;
pub use error::{ProvisionerError, ReportError, Result};
pub use event::{LifecycleEvent, RequestType, ResourceProperties};
pub use handler::{reject, Handler};
pub use operation::{Operation, OperationSet, OperationState};
pub use outcome::Outcome;
pub use poll::{poll_until, Check, Polled};
pub use poller::await_completion;
pub use reporter::{ResponseBody, ResponseHandle, ResponseStatus, ResultReporter};
pub use router::LifecycleRouter;
