// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control-plane endpoint configuration section.
//!
//! Endpoints default to the regional public endpoints. Requests are not
//! signed here; point the endpoints at a signing proxy where one is required.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AwsConfigLayer {
	pub region: Option<String>,
	pub glue_endpoint: Option<String>,
	pub bedrock_agent_endpoint: Option<String>,
	pub redshift_data_endpoint: Option<String>,
	pub request_timeout_secs: Option<u64>,
}

impl AwsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.region.is_some() {
			self.region = other.region;
		}
		if other.glue_endpoint.is_some() {
			self.glue_endpoint = other.glue_endpoint;
		}
		if other.bedrock_agent_endpoint.is_some() {
			self.bedrock_agent_endpoint = other.bedrock_agent_endpoint;
		}
		if other.redshift_data_endpoint.is_some() {
			self.redshift_data_endpoint = other.redshift_data_endpoint;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
	}

	pub fn finalize(self) -> AwsConfig {
		let region = self.region.unwrap_or_else(|| "us-east-1".to_string());
		AwsConfig {
			glue_endpoint: self
				.glue_endpoint
				.unwrap_or_else(|| format!("https://glue.{region}.amazonaws.com")),
			bedrock_agent_endpoint: self
				.bedrock_agent_endpoint
				.unwrap_or_else(|| format!("https://bedrock-agent.{region}.amazonaws.com")),
			redshift_data_endpoint: self
				.redshift_data_endpoint
				.unwrap_or_else(|| format!("https://redshift-data.{region}.amazonaws.com")),
			request_timeout_secs: self.request_timeout_secs.unwrap_or(30),
			region,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsConfig {
	pub region: String,
	pub glue_endpoint: String,
	pub bedrock_agent_endpoint: String,
	pub redshift_data_endpoint: String,
	pub request_timeout_secs: u64,
}

impl Default for AwsConfig {
	fn default() -> Self {
		AwsConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_endpoints_follow_region() {
		let config = AwsConfigLayer {
			region: Some("eu-west-1".to_string()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.glue_endpoint, "https://glue.eu-west-1.amazonaws.com");
		assert_eq!(
			config.bedrock_agent_endpoint,
			"https://bedrock-agent.eu-west-1.amazonaws.com"
		);
		assert_eq!(
			config.redshift_data_endpoint,
			"https://redshift-data.eu-west-1.amazonaws.com"
		);
	}

	#[test]
	fn test_explicit_endpoint_wins() {
		let config = AwsConfigLayer {
			glue_endpoint: Some("http://127.0.0.1:4566".to_string()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.region, "us-east-1");
		assert_eq!(config.glue_endpoint, "http://127.0.0.1:4566");
		assert_eq!(config.request_timeout_secs, 30);
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = AwsConfigLayer {
			region: Some("us-west-2".to_string()),
			request_timeout_secs: Some(10),
			..Default::default()
		};
		base.merge(AwsConfigLayer {
			request_timeout_secs: Some(5),
			..Default::default()
		});
		assert_eq!(base.region.as_deref(), Some("us-west-2"));
		assert_eq!(base.request_timeout_secs, Some(5));
	}
}
