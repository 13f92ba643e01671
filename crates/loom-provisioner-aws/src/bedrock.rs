// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Knowledge base ingestion jobs, one per (knowledge base, data source) pair.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use loom_provisioner_config::IngestionConfig;
use loom_provisioner_core::{
	ActionClient, Completion, Operation, OperationSet, PollBudget, ProvisionerError,
	ResourceProperties, Result,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ControlPlaneError;
use crate::transport::{client_token, read_response};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSettings {
	pub knowledge_base_ids: Vec<String>,
	pub data_source_ids: Vec<String>,
	pub poll_interval: Duration,
	pub poll_deadline: Duration,
}

impl From<&IngestionConfig> for IngestionSettings {
	fn from(config: &IngestionConfig) -> Self {
		Self {
			knowledge_base_ids: config.knowledge_base_ids.clone(),
			data_source_ids: config.data_source_ids.clone(),
			poll_interval: Duration::from_secs(config.poll_interval_secs),
			poll_deadline: Duration::from_secs(config.poll_deadline_secs),
		}
	}
}

/// One knowledge base and the data source to ingest into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionTarget {
	pub knowledge_base_id: String,
	pub data_source_id: String,
}

impl fmt::Display for IngestionTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.knowledge_base_id, self.data_source_id)
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartIngestionJobRequest {
	client_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionJobResponse {
	ingestion_job: IngestionJob,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionJob {
	ingestion_job_id: String,
	status: String,
	#[serde(default)]
	failure_reasons: Vec<String>,
}

/// Starts an ingestion job per pair and polls each by its own job id.
pub struct BedrockIngestionClient {
	http: Client,
	endpoint: String,
	settings: IngestionSettings,
}

impl BedrockIngestionClient {
	pub fn new(http: Client, endpoint: impl Into<String>, settings: IngestionSettings) -> Self {
		Self {
			http,
			endpoint: endpoint.into().trim_end_matches('/').to_string(),
			settings,
		}
	}

	fn jobs_url(&self, target: &IngestionTarget) -> String {
		format!(
			"{}/knowledgebases/{}/datasources/{}/ingestionjobs/",
			self.endpoint, target.knowledge_base_id, target.data_source_id
		)
	}

	async fn start_job(
		&self,
		target: &IngestionTarget,
		request_id: &str,
	) -> std::result::Result<IngestionJob, ControlPlaneError> {
		let body = StartIngestionJobRequest {
			client_token: client_token(&[
				request_id,
				target.knowledge_base_id.as_str(),
				target.data_source_id.as_str(),
			]),
		};
		let response = self.http.put(self.jobs_url(target)).json(&body).send().await?;
		let response: IngestionJobResponse = read_response(response).await?;
		Ok(response.ingestion_job)
	}

	async fn get_job(
		&self,
		target: &IngestionTarget,
		job_id: &str,
	) -> std::result::Result<IngestionJob, ControlPlaneError> {
		let url = format!("{}{job_id}", self.jobs_url(target));
		let response = self.http.get(url).send().await?;
		let response: IngestionJobResponse = read_response(response).await?;
		Ok(response.ingestion_job)
	}
}

fn ids(properties: &ResourceProperties, key: &str, configured: &[String]) -> Result<Vec<String>> {
	let ids = properties.list(key)?.unwrap_or_else(|| configured.to_vec());
	for id in &ids {
		if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
			return Err(ProvisionerError::configuration(format!(
				"{key} contains an invalid id: {id:?}"
			)));
		}
	}
	Ok(ids)
}

#[async_trait]
impl ActionClient for BedrockIngestionClient {
	type Target = IngestionTarget;

	fn action(&self) -> &'static str {
		"ingestion"
	}

	/// Pairs ids by position. Lists of different length start nothing.
	fn targets(&self, properties: &ResourceProperties) -> Result<Vec<IngestionTarget>> {
		let knowledge_base_ids = ids(
			properties,
			"KnowledgeBaseIds",
			&self.settings.knowledge_base_ids,
		)?;
		let data_source_ids = ids(properties, "DataSourceIds", &self.settings.data_source_ids)?;

		if knowledge_base_ids.len() != data_source_ids.len() {
			return Err(ProvisionerError::configuration(format!(
				"{} knowledge base ids but {} data source ids",
				knowledge_base_ids.len(),
				data_source_ids.len()
			)));
		}

		Ok(knowledge_base_ids
			.into_iter()
			.zip(data_source_ids)
			.map(|(knowledge_base_id, data_source_id)| IngestionTarget {
				knowledge_base_id,
				data_source_id,
			})
			.collect())
	}

	fn completion(&self) -> Result<Completion> {
		let budget = PollBudget::new(self.settings.poll_interval, self.settings.poll_deadline)?;
		Ok(Completion::Await(budget))
	}

	#[instrument(skip(self), fields(pair = %target))]
	async fn start(
		&self,
		target: &IngestionTarget,
		request_id: &str,
	) -> Result<Operation<IngestionTarget>> {
		let job = self
			.start_job(target, request_id)
			.await
			.map_err(|err| ProvisionerError::ActionSubmission {
				action: self.action(),
				target: target.to_string(),
				message: err.to_string(),
			})?;
		info!(job_id = %job.ingestion_job_id, status = %job.status, "ingestion job started");
		Ok(Operation::started(job.ingestion_job_id, target.clone()).with_status(job.status))
	}

	async fn poll(
		&self,
		operation: &Operation<IngestionTarget>,
	) -> Result<Operation<IngestionTarget>> {
		let job = self
			.get_job(&operation.target, &operation.operation_id)
			.await
			.map_err(|err| ProvisionerError::PollingTransient {
				target: operation.target.to_string(),
				message: err.to_string(),
			})?;

		let current = operation.clone().with_status(job.status.as_str());
		Ok(match job.status.as_str() {
			"COMPLETE" => current.succeeded(),
			"FAILED" | "STOPPED" => {
				let detail = if job.failure_reasons.is_empty() {
					format!("job {} ended without a reason", job.ingestion_job_id)
				} else {
					job.failure_reasons.join("; ")
				};
				current.failed(detail)
			}
			_ => current.polling(),
		})
	}

	fn response_data(&self, operations: &OperationSet<IngestionTarget>) -> BTreeMap<String, String> {
		let job_ids: Vec<&str> = operations
			.iter()
			.map(|op| op.operation_id.as_str())
			.collect();
		BTreeMap::from([
			("IngestionJobIds".to_string(), job_ids.join(",")),
			("Status".to_string(), "COMPLETE".to_string()),
		])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_provisioner_core::mock::RecordingReporter;
	use loom_provisioner_core::{Handler, LifecycleEvent, OperationState, RequestType};
	use serde_json::json;
	use wiremock::matchers::{any, body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn settings(kbs: &[&str], dss: &[&str]) -> IngestionSettings {
		IngestionSettings {
			knowledge_base_ids: kbs.iter().map(|s| s.to_string()).collect(),
			data_source_ids: dss.iter().map(|s| s.to_string()).collect(),
			poll_interval: Duration::from_millis(10),
			poll_deadline: Duration::from_millis(500),
		}
	}

	fn job(id: &str, status: &str) -> ResponseTemplate {
		ResponseTemplate::new(200).set_body_json(json!({
			"ingestionJob": {"ingestionJobId": id, "knowledgeBaseId": "KB", "dataSourceId": "DS", "status": status}
		}))
	}

	#[test]
	fn mismatched_lists_are_rejected() {
		let client = BedrockIngestionClient::new(Client::new(), "http://unused", settings(&["KB1", "KB2"], &["DS1"]));
		let err = client.targets(&ResourceProperties::default()).unwrap_err();
		assert_eq!(
			err.to_string(),
			"configuration error: 2 knowledge base ids but 1 data source ids"
		);
	}

	#[test]
	fn event_lists_override_configuration() {
		let client = BedrockIngestionClient::new(Client::new(), "http://unused", settings(&["KB1"], &["DS1"]));
		let mut properties = ResourceProperties::default();
		properties.insert("KnowledgeBaseIds", json!(["KBA", "KBB"]));
		properties.insert("DataSourceIds", "[\"DSA\", \"DSB\"]");

		let targets = client.targets(&properties).unwrap();
		let names: Vec<String> = targets.iter().map(ToString::to_string).collect();
		assert_eq!(names, vec!["KBA/DSA", "KBB/DSB"]);
	}

	#[test]
	fn ids_must_be_alphanumeric() {
		let client = BedrockIngestionClient::new(Client::new(), "http://unused", settings(&["KB1/../x"], &["DS1"]));
		let err = client.targets(&ResourceProperties::default()).unwrap_err();
		assert!(err.to_string().contains("invalid id"));
	}

	#[tokio::test]
	async fn start_sends_a_deterministic_client_token() {
		let server = MockServer::start().await;
		let token = client_token(&["req-1", "KB1", "DS1"]);
		Mock::given(method("PUT"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/"))
			.and(body_json(json!({"clientToken": token})))
			.respond_with(job("JOB1", "STARTING"))
			.expect(1)
			.mount(&server)
			.await;

		let client = BedrockIngestionClient::new(Client::new(), server.uri(), settings(&[], &[]));
		let target = IngestionTarget {
			knowledge_base_id: "KB1".to_string(),
			data_source_id: "DS1".to_string(),
		};
		let op = client.start(&target, "req-1").await.unwrap();
		assert_eq!(op.operation_id, "JOB1");
		assert_eq!(op.status.as_deref(), Some("STARTING"));
	}

	#[tokio::test]
	async fn stopped_jobs_fail_with_reasons() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/JOB1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"ingestionJob": {
					"ingestionJobId": "JOB1",
					"status": "STOPPED",
					"failureReasons": ["stopped by user"]
				}
			})))
			.mount(&server)
			.await;

		let client = BedrockIngestionClient::new(Client::new(), server.uri(), settings(&[], &[]));
		let op = Operation::started(
			"JOB1",
			IngestionTarget {
				knowledge_base_id: "KB1".to_string(),
				data_source_id: "DS1".to_string(),
			},
		);
		let refreshed = client.poll(&op).await.unwrap();
		assert_eq!(refreshed.state, OperationState::Failed);
		assert_eq!(refreshed.detail.as_deref(), Some("stopped by user"));
	}

	#[tokio::test]
	async fn failed_pair_is_reported_while_sibling_completes() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/"))
			.respond_with(job("JOB1", "STARTING"))
			.mount(&server)
			.await;
		Mock::given(method("PUT"))
			.and(path("/knowledgebases/KB2/datasources/DS2/ingestionjobs/"))
			.respond_with(job("JOB2", "STARTING"))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/JOB1"))
			.respond_with(job("JOB1", "IN_PROGRESS"))
			.up_to_n_times(2)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/JOB1"))
			.respond_with(job("JOB1", "COMPLETE"))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/knowledgebases/KB2/datasources/DS2/ingestionjobs/JOB2"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"ingestionJob": {
					"ingestionJobId": "JOB2",
					"status": "FAILED",
					"failureReasons": ["S3 bucket not found"]
				}
			})))
			.mount(&server)
			.await;

		let client = BedrockIngestionClient::new(
			Client::new(),
			server.uri(),
			settings(&["KB1", "KB2"], &["DS1", "DS2"]),
		);
		let handler = Handler::new(client, RecordingReporter::new());

		let outcome = handler
			.handle(&LifecycleEvent::new(RequestType::Create, "req-1"))
			.await
			.unwrap();

		let reason = outcome.reason().unwrap();
		assert!(reason.starts_with("ingestion failed for KB2/DS2"), "{reason}");
		assert!(reason.contains("S3 bucket not found"), "{reason}");
		assert!(!reason.contains("KB1/DS1"), "{reason}");
	}

	#[tokio::test]
	async fn all_pairs_complete() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/"))
			.respond_with(job("JOB1", "STARTING"))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/knowledgebases/KB1/datasources/DS1/ingestionjobs/JOB1"))
			.respond_with(job("JOB1", "COMPLETE"))
			.mount(&server)
			.await;

		let client = BedrockIngestionClient::new(Client::new(), server.uri(), settings(&["KB1"], &["DS1"]));
		let handler = Handler::new(client, RecordingReporter::new());

		let outcome = handler
			.handle(&LifecycleEvent::new(RequestType::Create, "req-1"))
			.await
			.unwrap();

		let data = outcome.data().unwrap();
		assert_eq!(data.get("IngestionJobIds").map(String::as_str), Some("JOB1"));
		assert_eq!(data.get("Status").map(String::as_str), Some("COMPLETE"));
	}

	#[tokio::test]
	async fn mismatched_lists_fail_without_any_request() {
		let server = MockServer::start().await;
		Mock::given(any())
			.respond_with(ResponseTemplate::new(500))
			.expect(0)
			.mount(&server)
			.await;

		let client = BedrockIngestionClient::new(
			Client::new(),
			server.uri(),
			settings(&["KB1", "KB2", "KB3"], &["DS1", "DS2"]),
		);
		let handler = Handler::new(client, RecordingReporter::new());

		let outcome = handler
			.handle(&LifecycleEvent::new(RequestType::Create, "req-1"))
			.await
			.unwrap();

		assert_eq!(
			outcome.reason(),
			Some("configuration error: 3 knowledge base ids but 2 data source ids")
		);
		assert_eq!(handler.reporter().delivered().len(), 1);
	}
}
