// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by each source.

use serde::{Deserialize, Serialize};

use crate::sections::{
	AwsConfigLayer, CrawlerConfigLayer, GrantConfigLayer, IngestionConfigLayer, LoggingConfigLayer,
	ReporterConfigLayer,
};

/// One source's view of the configuration. Unset sections and fields defer
/// to lower-precedence sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProvisionerConfigLayer {
	pub logging: Option<LoggingConfigLayer>,
	pub aws: Option<AwsConfigLayer>,
	pub crawler: Option<CrawlerConfigLayer>,
	pub ingestion: Option<IngestionConfigLayer>,
	pub grant: Option<GrantConfigLayer>,
	pub reporter: Option<ReporterConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	let Some(other) = other else {
		return;
	};
	if let Some(existing) = base {
		merge(existing, other);
	} else {
		*base = Some(other);
	}
}

impl ProvisionerConfigLayer {
	/// Overlay `other` onto `self`, field by field.
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.aws, other.aws, AwsConfigLayer::merge);
		merge_section(&mut self.crawler, other.crawler, CrawlerConfigLayer::merge);
		merge_section(&mut self.ingestion, other.ingestion, IngestionConfigLayer::merge);
		merge_section(&mut self.grant, other.grant, GrantConfigLayer::merge);
		merge_section(&mut self.reporter, other.reporter, ReporterConfigLayer::merge);
	}
}
