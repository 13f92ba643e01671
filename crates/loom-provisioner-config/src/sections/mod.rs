// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod aws;
mod crawler;
mod grant;
mod ingestion;
mod logging;
mod reporter;

pub use aws::{AwsConfig, AwsConfigLayer};
pub use crawler::{CrawlerConfig, CrawlerConfigLayer};
pub use grant::{
	GrantConfig, GrantConfigLayer, DEFAULT_DATABASE, DEFAULT_GRANT_DATABASE, DEFAULT_ROLE_NAME,
};
pub use ingestion::{IngestionConfig, IngestionConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use reporter::{ReporterConfig, ReporterConfigLayer};
