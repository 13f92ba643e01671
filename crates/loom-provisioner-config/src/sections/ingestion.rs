// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Knowledge base ingestion configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestionConfigLayer {
	pub knowledge_base_ids: Option<Vec<String>>,
	pub data_source_ids: Option<Vec<String>>,
	pub poll_interval_secs: Option<u64>,
	pub poll_deadline_secs: Option<u64>,
}

impl IngestionConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.knowledge_base_ids.is_some() {
			self.knowledge_base_ids = other.knowledge_base_ids;
		}
		if other.data_source_ids.is_some() {
			self.data_source_ids = other.data_source_ids;
		}
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.poll_deadline_secs.is_some() {
			self.poll_deadline_secs = other.poll_deadline_secs;
		}
	}

	pub fn finalize(self) -> IngestionConfig {
		IngestionConfig {
			knowledge_base_ids: self.knowledge_base_ids.unwrap_or_default(),
			data_source_ids: self.data_source_ids.unwrap_or_default(),
			poll_interval_secs: self.poll_interval_secs.unwrap_or(10),
			poll_deadline_secs: self.poll_deadline_secs.unwrap_or(240),
		}
	}
}

/// Knowledge base and data source ids are paired by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionConfig {
	pub knowledge_base_ids: Vec<String>,
	pub data_source_ids: Vec<String>,
	pub poll_interval_secs: u64,
	pub poll_deadline_secs: u64,
}

impl Default for IngestionConfig {
	fn default() -> Self {
		IngestionConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = IngestionConfig::default();
		assert!(config.knowledge_base_ids.is_empty());
		assert!(config.data_source_ids.is_empty());
		assert_eq!(config.poll_interval_secs, 10);
		assert_eq!(config.poll_deadline_secs, 240);
	}

	#[test]
	fn test_merge_replaces_whole_lists() {
		let mut base = IngestionConfigLayer {
			knowledge_base_ids: Some(vec!["KB1".to_string(), "KB2".to_string()]),
			data_source_ids: Some(vec!["DS1".to_string(), "DS2".to_string()]),
			..Default::default()
		};
		base.merge(IngestionConfigLayer {
			knowledge_base_ids: Some(vec!["KB9".to_string()]),
			..Default::default()
		});
		assert_eq!(base.knowledge_base_ids, Some(vec!["KB9".to_string()]));
		assert_eq!(base.data_source_ids.map(|ids| ids.len()), Some(2));
	}
}
