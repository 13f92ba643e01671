// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database grant configuration section.

use serde::{Deserialize, Serialize};

/// Database the statement connects to.
pub const DEFAULT_DATABASE: &str = "awsdatacatalog";
/// Database usage is granted on.
pub const DEFAULT_GRANT_DATABASE: &str = "awsdatacatalog";
pub const DEFAULT_ROLE_NAME: &str = "bedrock-knowledgebase-role";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GrantConfigLayer {
	pub workgroup: Option<String>,
	pub database: Option<String>,
	pub grant_database: Option<String>,
	pub role_name: Option<String>,
}

impl GrantConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.workgroup.is_some() {
			self.workgroup = other.workgroup;
		}
		if other.database.is_some() {
			self.database = other.database;
		}
		if other.grant_database.is_some() {
			self.grant_database = other.grant_database;
		}
		if other.role_name.is_some() {
			self.role_name = other.role_name;
		}
	}

	pub fn finalize(self) -> GrantConfig {
		GrantConfig {
			workgroup: self.workgroup,
			database: self.database.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
			grant_database: self
				.grant_database
				.unwrap_or_else(|| DEFAULT_GRANT_DATABASE.to_string()),
			role_name: self.role_name.unwrap_or_else(|| DEFAULT_ROLE_NAME.to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrantConfig {
	/// Serverless workgroup name or ARN. Required unless the event names one.
	pub workgroup: Option<String>,
	/// Connection database for `ExecuteStatement`.
	pub database: String,
	/// Database named in the `GRANT USAGE` statement.
	pub grant_database: String,
	/// IAM role granted usage, without the `IAMR:` prefix.
	pub role_name: String,
}

impl Default for GrantConfig {
	fn default() -> Self {
		GrantConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = GrantConfig::default();
		assert!(config.workgroup.is_none());
		assert_eq!(config.database, "awsdatacatalog");
		assert_eq!(config.grant_database, "awsdatacatalog");
		assert_eq!(config.role_name, "bedrock-knowledgebase-role");
	}

	#[test]
	fn test_connection_database_does_not_change_grant_database() {
		let mut layer = GrantConfigLayer::default();
		layer.merge(GrantConfigLayer {
			database: Some("dev".to_string()),
			..Default::default()
		});
		let config = layer.finalize();
		assert_eq!(config.database, "dev");
		assert_eq!(config.grant_database, DEFAULT_GRANT_DATABASE);
	}

	#[test]
	fn test_layer_finalize_with_values() {
		let config = GrantConfigLayer {
			workgroup: Some("analytics".to_string()),
			role_name: Some("kb-reader".to_string()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.workgroup.as_deref(), Some("analytics"));
		assert_eq!(config.database, DEFAULT_DATABASE);
		assert_eq!(config.role_name, "kb-reader");
	}
}
