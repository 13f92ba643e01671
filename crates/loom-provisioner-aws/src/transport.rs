// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request plumbing shared by the control-plane clients.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::error::{ControlPlaneError, Result};

const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Client for services speaking the AWS JSON 1.1 protocol: every operation is
/// a POST to the service root, selected by the `X-Amz-Target` header.
#[derive(Debug, Clone)]
pub struct AwsJsonClient {
	http: Client,
	endpoint: String,
	target_prefix: &'static str,
}

impl AwsJsonClient {
	pub fn new(http: Client, endpoint: impl Into<String>, target_prefix: &'static str) -> Self {
		Self {
			http,
			endpoint: endpoint.into(),
			target_prefix,
		}
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	#[instrument(skip(self, request), fields(service = self.target_prefix))]
	pub async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp>
	where
		Req: Serialize + ?Sized,
		Resp: DeserializeOwned,
	{
		let response = self
			.http
			.post(&self.endpoint)
			.header("X-Amz-Target", format!("{}.{operation}", self.target_prefix))
			.header(CONTENT_TYPE, AMZ_JSON)
			.body(serde_json::to_vec(request)?)
			.send()
			.await?;
		debug!(status = response.status().as_u16(), "control plane responded");
		read_response(response).await
	}
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDocument {
	#[serde(rename = "__type")]
	kind: Option<String>,
	#[serde(alias = "Message")]
	message: Option<String>,
}

/// Decode a success body into `Resp`, or turn an error document into
/// [`ControlPlaneError::Service`].
pub(crate) async fn read_response<Resp: DeserializeOwned>(response: Response) -> Result<Resp> {
	let status = response.status();
	let header_code = response
		.headers()
		.get("x-amzn-ErrorType")
		.and_then(|v| v.to_str().ok())
		.map(str::to_string);
	let body = response.bytes().await?;

	if status.is_success() {
		let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
		return Ok(serde_json::from_slice(body)?);
	}

	let document: ErrorDocument = serde_json::from_slice(&body).unwrap_or_default();
	let code = document
		.kind
		.or(header_code)
		.map(|raw| error_code(&raw))
		.unwrap_or_else(|| format!("HTTP{}", status.as_u16()));
	let message = document
		.message
		.unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());

	Err(ControlPlaneError::Service {
		status: status.as_u16(),
		code,
		message,
	})
}

/// `aws.protocoltests#ThrottlingException:http://...` becomes `ThrottlingException`.
pub(crate) fn error_code(raw: &str) -> String {
	let name = raw.rsplit('#').next().unwrap_or(raw);
	name.split(':').next().unwrap_or(name).trim().to_string()
}

/// Idempotency token derived from the invocation and the target, so a
/// redelivered event starts nothing new.
pub(crate) fn client_token(parts: &[&str]) -> String {
	hex::encode(Sha256::digest(parts.join("/").as_bytes()))
}
