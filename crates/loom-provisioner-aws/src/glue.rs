// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Glue crawler runs.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use loom_provisioner_config::CrawlerConfig;
use loom_provisioner_core::{
	ActionClient, Completion, Operation, OperationSet, PollBudget, ProvisionerError,
	ResourceProperties, Result,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::transport::AwsJsonClient;

const CRAWLER_RUNNING: &str = "CrawlerRunningException";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerSettings {
	/// Used when the event has no `CrawlerName` property.
	pub crawler_name: Option<String>,
	pub poll_interval: Duration,
	pub poll_deadline: Duration,
	pub settle_delay: Duration,
}

impl From<&CrawlerConfig> for CrawlerSettings {
	fn from(config: &CrawlerConfig) -> Self {
		Self {
			crawler_name: config.name.clone(),
			poll_interval: Duration::from_secs(config.poll_interval_secs),
			poll_deadline: Duration::from_secs(config.poll_deadline_secs),
			settle_delay: Duration::from_secs(config.settle_delay_secs),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCrawlerResponse {
	crawler: Crawler,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Crawler {
	state: String,
	#[serde(default)]
	last_crawl: Option<LastCrawl>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LastCrawl {
	status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CrawlerName<'a> {
	name: &'a str,
}

/// Starts one crawler and waits for it to return to `READY`.
///
/// The operation id is the crawler name: Glue tracks one run per crawler.
/// `READY` completes the operation whatever the run's own status was; that
/// status is reported as `LastCrawlStatus` and never checked.
pub struct GlueCrawlerClient {
	glue: AwsJsonClient,
	settings: CrawlerSettings,
}

impl GlueCrawlerClient {
	pub fn new(http: Client, endpoint: impl Into<String>, settings: CrawlerSettings) -> Self {
		Self {
			glue: AwsJsonClient::new(http, endpoint, "AWSGlue"),
			settings,
		}
	}
}

#[async_trait]
impl ActionClient for GlueCrawlerClient {
	type Target = String;

	fn action(&self) -> &'static str {
		"crawl"
	}

	fn targets(&self, properties: &ResourceProperties) -> Result<Vec<String>> {
		let name = properties
			.get("CrawlerName")
			.or_else(|| self.settings.crawler_name.clone())
			.ok_or_else(|| {
				ProvisionerError::configuration(
					"no crawler name: set the CrawlerName property or LOOM_PROVISIONER_CRAWLER_NAME",
				)
			})?;
		Ok(vec![name])
	}

	fn completion(&self) -> Result<Completion> {
		let budget = PollBudget::new(self.settings.poll_interval, self.settings.poll_deadline)?;
		Ok(Completion::Await(budget))
	}

	fn settle_delay(&self) -> Duration {
		self.settings.settle_delay
	}

	#[instrument(skip(self, _request_id))]
	async fn start(&self, crawler: &String, _request_id: &str) -> Result<Operation<String>> {
		match self
			.glue
			.call::<_, serde_json::Value>("StartCrawler", &CrawlerName { name: crawler })
			.await
		{
			Ok(_) => {
				info!(crawler = %crawler, "crawler started");
				Ok(Operation::started(crawler.clone(), crawler.clone()))
			}
			Err(err) if err.code() == Some(CRAWLER_RUNNING) => {
				info!(crawler = %crawler, "crawler already running, waiting for the current run");
				Ok(Operation::started(crawler.clone(), crawler.clone()).with_status("RUNNING"))
			}
			Err(err) => Err(ProvisionerError::ActionSubmission {
				action: self.action(),
				target: crawler.clone(),
				message: err.to_string(),
			}),
		}
	}

	async fn poll(&self, operation: &Operation<String>) -> Result<Operation<String>> {
		let response: GetCrawlerResponse = self
			.glue
			.call("GetCrawler", &CrawlerName { name: &operation.target })
			.await
			.map_err(|err| ProvisionerError::PollingTransient {
				target: operation.target.clone(),
				message: err.to_string(),
			})?;

		let crawler = response.crawler;
		let current = operation.clone();
		if crawler.state == "READY" {
			// Once idle, the outcome of the run is the interesting status.
			let status = crawler
				.last_crawl
				.and_then(|run| run.status)
				.unwrap_or(crawler.state);
			Ok(current.succeeded().with_status(status))
		} else {
			Ok(current.polling().with_status(crawler.state))
		}
	}

	fn response_data(&self, operations: &OperationSet<String>) -> BTreeMap<String, String> {
		let mut data = BTreeMap::from([(
			"Message".to_string(),
			"Crawler run finished".to_string(),
		)]);
		if let Some(op) = operations.iter().next() {
			data.insert("CrawlerName".to_string(), op.target.clone());
			if let Some(status) = &op.status {
				data.insert("LastCrawlStatus".to_string(), status.clone());
			}
		}
		data
	}
}
