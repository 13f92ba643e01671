// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AWS implementations of the provisioning seams.
//!
//! - [`GlueCrawlerClient`]: StartCrawler / GetCrawler (AWS JSON 1.1)
//! - [`BedrockIngestionClient`]: StartIngestionJob / GetIngestionJob (REST JSON)
//! - [`RedshiftGrantClient`]: ExecuteStatement (AWS JSON 1.1)
//! - [`CloudFormationReporter`]: PUT to the pre-signed response URL
//!
//! Requests are sent unsigned to the configured endpoints.

pub mod bedrock;
pub mod cfn;
pub mod error;
pub mod glue;
pub mod http;
pub mod redshift;
pub mod retry;
pub mod transport;

use std::time::Duration;

use loom_provisioner_config::ProvisionerConfig;

pub use bedrock::{BedrockIngestionClient, IngestionSettings, IngestionTarget};
pub use cfn::CloudFormationReporter;
pub use error::{ControlPlaneError, Result};
pub use glue::{CrawlerSettings, GlueCrawlerClient};
pub use redshift::{GrantSettings, GrantTarget, RedshiftGrantClient};
pub use retry::RetryConfig;

fn control_plane_http(config: &ProvisionerConfig) -> reqwest::Result<reqwest::Client> {
	http::new_client_with_timeout(Duration::from_secs(config.aws.request_timeout_secs))
}

pub fn crawler_client(config: &ProvisionerConfig) -> reqwest::Result<GlueCrawlerClient> {
	Ok(GlueCrawlerClient::new(
		control_plane_http(config)?,
		&config.aws.glue_endpoint,
		CrawlerSettings::from(&config.crawler),
	))
}

pub fn ingestion_client(config: &ProvisionerConfig) -> reqwest::Result<BedrockIngestionClient> {
	Ok(BedrockIngestionClient::new(
		control_plane_http(config)?,
		&config.aws.bedrock_agent_endpoint,
		IngestionSettings::from(&config.ingestion),
	))
}

pub fn grant_client(config: &ProvisionerConfig) -> reqwest::Result<RedshiftGrantClient> {
	Ok(RedshiftGrantClient::new(
		control_plane_http(config)?,
		&config.aws.redshift_data_endpoint,
		GrantSettings::from(&config.grant),
	))
}
