// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database usage grant through the Redshift Data API.
//!
//! The statement is fire-and-forget: acceptance by `ExecuteStatement` is the
//! terminal signal and the router issues no status checks.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use loom_provisioner_config::GrantConfig;
use loom_provisioner_core::{
	ActionClient, Completion, Operation, OperationSet, ProvisionerError, ResourceProperties, Result,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::transport::{client_token, AwsJsonClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSettings {
	pub workgroup: Option<String>,
	pub database: String,
	pub grant_database: String,
	pub role_name: String,
}

impl From<&GrantConfig> for GrantSettings {
	fn from(config: &GrantConfig) -> Self {
		Self {
			workgroup: config.workgroup.clone(),
			database: config.database.clone(),
			grant_database: config.grant_database.clone(),
			role_name: config.role_name.clone(),
		}
	}
}

/// Usage on `grant_database` for the IAM role `role_name`.
///
/// The statement runs in `workgroup`, connected to `database`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
	pub workgroup: String,
	pub database: String,
	pub grant_database: String,
	pub role_name: String,
}

impl GrantTarget {
	pub fn sql(&self) -> String {
		format!(
			"GRANT USAGE ON DATABASE \"{}\" TO \"IAMR:{}\"",
			self.grant_database, self.role_name
		)
	}
}

impl fmt::Display for GrantTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "IAMR:{} on {}", self.role_name, self.grant_database)
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteStatementRequest<'a> {
	workgroup_name: &'a str,
	database: &'a str,
	sql: String,
	client_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecuteStatementResponse {
	id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStatementRequest<'a> {
	id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStatementResponse {
	status: String,
	#[serde(default)]
	error: Option<String>,
}

pub struct RedshiftGrantClient {
	data_api: AwsJsonClient,
	settings: GrantSettings,
}

impl RedshiftGrantClient {
	pub fn new(http: Client, endpoint: impl Into<String>, settings: GrantSettings) -> Self {
		Self {
			data_api: AwsJsonClient::new(http, endpoint, "RedshiftData"),
			settings,
		}
	}
}

fn quoted_identifier(key: &str, value: String) -> Result<String> {
	if value.contains('"') {
		return Err(ProvisionerError::configuration(format!(
			"{key} must not contain a double quote: {value}"
		)));
	}
	Ok(value)
}

#[async_trait]
impl ActionClient for RedshiftGrantClient {
	type Target = GrantTarget;

	fn action(&self) -> &'static str {
		"grant"
	}

	fn targets(&self, properties: &ResourceProperties) -> Result<Vec<GrantTarget>> {
		let workgroup = properties
			.get("WorkgroupName")
			.or_else(|| self.settings.workgroup.clone())
			.ok_or_else(|| {
				ProvisionerError::configuration(
					"no workgroup: set the WorkgroupName property or LOOM_PROVISIONER_GRANT_WORKGROUP",
				)
			})?;
		let database = properties
			.get("Database")
			.unwrap_or_else(|| self.settings.database.clone());
		let grant_database = properties
			.get("GrantDatabase")
			.unwrap_or_else(|| self.settings.grant_database.clone());
		let role_name = properties
			.get("RoleName")
			.unwrap_or_else(|| self.settings.role_name.clone());

		Ok(vec![GrantTarget {
			workgroup,
			database,
			grant_database: quoted_identifier("grant database", grant_database)?,
			role_name: quoted_identifier("role name", role_name)?,
		}])
	}

	fn completion(&self) -> Result<Completion> {
		Ok(Completion::OnSubmission)
	}

	#[instrument(skip(self), fields(grant = %target))]
	async fn start(&self, target: &GrantTarget, request_id: &str) -> Result<Operation<GrantTarget>> {
		let request = ExecuteStatementRequest {
			workgroup_name: &target.workgroup,
			database: &target.database,
			sql: target.sql(),
			client_token: client_token(&[
				request_id,
				target.workgroup.as_str(),
				target.database.as_str(),
				target.grant_database.as_str(),
				target.role_name.as_str(),
			]),
		};
		let response: ExecuteStatementResponse = self
			.data_api
			.call("ExecuteStatement", &request)
			.await
			.map_err(|err| ProvisionerError::ActionSubmission {
				action: self.action(),
				target: target.to_string(),
				message: err.to_string(),
			})?;

		info!(statement_id = %response.id, "grant statement submitted");
		Ok(Operation::accepted(response.id, target.clone()).with_status("SUBMITTED"))
	}

	/// Maps `DescribeStatement` status onto the operation.
	///
	/// Only reachable when called directly: grants complete on submission, so
	/// the router never checks statement status.
	async fn poll(&self, operation: &Operation<GrantTarget>) -> Result<Operation<GrantTarget>> {
		let response: DescribeStatementResponse = self
			.data_api
			.call(
				"DescribeStatement",
				&DescribeStatementRequest {
					id: &operation.operation_id,
				},
			)
			.await
			.map_err(|err| ProvisionerError::PollingTransient {
				target: operation.target.to_string(),
				message: err.to_string(),
			})?;

		let current = operation.clone().with_status(response.status.as_str());
		Ok(match response.status.as_str() {
			"FINISHED" => current.succeeded(),
			"FAILED" | "ABORTED" => current.failed(
				response
					.error
					.unwrap_or_else(|| format!("statement {}", response.status)),
			),
			_ => current.polling(),
		})
	}

	fn response_data(&self, operations: &OperationSet<GrantTarget>) -> BTreeMap<String, String> {
		let mut data = BTreeMap::new();
		if let Some(op) = operations.iter().next() {
			data.insert("StatementId".to_string(), op.operation_id.clone());
			data.insert(
				"Message".to_string(),
				format!(
					"Granted usage on {} to IAMR:{}",
					op.target.grant_database, op.target.role_name
				),
			);
		}
		data
	}
}
