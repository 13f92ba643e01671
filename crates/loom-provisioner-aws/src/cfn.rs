// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of custom resource responses to CloudFormation's pre-signed URL.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use loom_provisioner_config::ReporterConfig;
use loom_provisioner_core::{LifecycleEvent, ReportError, ResponseBody, ResultReporter};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::retry::{is_retryable_status, retry, RetryConfig, RetryableError};

/// Outcome of one PUT attempt.
#[derive(Debug)]
enum AttemptError {
	Http(reqwest::Error),
	Rejected { status: u16, body: String },
}

impl fmt::Display for AttemptError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttemptError::Http(err) => write!(f, "{err}"),
			AttemptError::Rejected { status, body } => write!(f, "HTTP {status}: {body}"),
		}
	}
}

impl RetryableError for AttemptError {
	fn is_retryable(&self) -> bool {
		match self {
			AttemptError::Http(err) => err.is_retryable(),
			AttemptError::Rejected { status, .. } => is_retryable_status(*status),
		}
	}
}

impl From<AttemptError> for ReportError {
	fn from(err: AttemptError) -> Self {
		match err {
			AttemptError::Http(err) => ReportError::Transport(err.to_string()),
			AttemptError::Rejected { status, body } => ReportError::Rejected { status, body },
		}
	}
}

/// PUTs the response document to the event's `ResponseURL`.
///
/// The URL is pre-signed for an empty content type, so none is sent.
pub struct CloudFormationReporter {
	http: Client,
	retry: RetryConfig,
}

impl CloudFormationReporter {
	pub fn new(http: Client, retry: RetryConfig) -> Self {
		Self { http, retry }
	}

	pub fn from_config(config: &ReporterConfig) -> reqwest::Result<Self> {
		let http = crate::http::new_client_with_timeout(Duration::from_secs(config.timeout_secs))?;
		Ok(Self::new(http, RetryConfig::from(config)))
	}

	async fn put_once(&self, url: &str, payload: &[u8]) -> Result<(), AttemptError> {
		let response = self
			.http
			.put(url)
			.header(CONTENT_TYPE, "")
			.body(payload.to_vec())
			.send()
			.await
			.map_err(AttemptError::Http)?;

		let status = response.status();
		if status.is_success() {
			debug!(status = status.as_u16(), "response accepted");
			return Ok(());
		}
		let body = response.text().await.unwrap_or_default();
		Err(AttemptError::Rejected {
			status: status.as_u16(),
			body,
		})
	}
}

#[async_trait]
impl ResultReporter for CloudFormationReporter {
	#[instrument(skip_all, fields(request_id = %event.request_id))]
	async fn deliver(&self, event: &LifecycleEvent, body: &ResponseBody) -> Result<(), ReportError> {
		if event.response_url.is_empty() {
			return Err(ReportError::MissingResponseUrl);
		}
		let payload = serde_json::to_vec(body)?;
		retry(&self.retry, || self.put_once(&event.response_url, &payload)).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_provisioner_core::{Outcome, RequestType, ResponseHandle};
	use serde_json::json;
	use wiremock::matchers::{body_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn reporter() -> CloudFormationReporter {
		CloudFormationReporter::new(
			Client::new(),
			RetryConfig {
				max_attempts: 3,
				base_delay: Duration::from_millis(1),
				max_delay: Duration::from_millis(5),
				backoff_factor: 2.0,
				jitter: false,
			},
		)
	}

	fn event(server: &MockServer) -> LifecycleEvent {
		let mut event = LifecycleEvent::new(RequestType::Create, "req-1")
			.with_logical_resource_id("KBSync")
			.with_response_url(format!("{}/response?X-Amz-Signature=abc", server.uri()));
		event.stack_id = "stack-1".to_string();
		event
	}

	#[tokio::test]
	async fn puts_the_response_document() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/response"))
			.and(header("Content-Type", ""))
			.and(body_json(json!({
				"Status": "SUCCESS",
				"PhysicalResourceId": "ingestion-KBSync",
				"StackId": "stack-1",
				"RequestId": "req-1",
				"LogicalResourceId": "KBSync",
				"NoEcho": false,
				"Data": {"Status": "COMPLETE"}
			})))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let reporter = reporter();
		let event = event(&server);
		let outcome = Outcome::success([("Status".to_string(), "COMPLETE".to_string())].into());
		ResponseHandle::new(&reporter, &event, "ingestion-KBSync".to_string())
			.send(&outcome)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn transient_failures_are_retried() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(503))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let reporter = reporter();
		let event = event(&server);
		let body = ResponseBody::new(&event, "id".to_string(), &Outcome::failure("boom"));
		reporter.deliver(&event, &body).await.unwrap();
	}

	#[tokio::test]
	async fn rejections_are_not_retried() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(403).set_body_string("SignatureDoesNotMatch"))
			.expect(1)
			.mount(&server)
			.await;

		let reporter = reporter();
		let event = event(&server);
		let body = ResponseBody::new(&event, "id".to_string(), &Outcome::failure("boom"));
		let err = reporter.deliver(&event, &body).await.unwrap_err();
		assert!(matches!(err, ReportError::Rejected { status: 403, .. }));
	}

	#[tokio::test]
	async fn missing_url_is_an_error() {
		let reporter = reporter();
		let event = LifecycleEvent::new(RequestType::Delete, "req-1");
		let body = ResponseBody::new(&event, "id".to_string(), &Outcome::success_empty());
		let err = reporter.deliver(&event, &body).await.unwrap_err();
		assert!(matches!(err, ReportError::MissingResponseUrl));
	}
}
