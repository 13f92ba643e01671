// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for provisioning hooks.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Consistent environment variable naming (`LOOM_PROVISIONER_*`)
//!
//! Configuration is read once per invocation and passed down; nothing here is
//! consulted again after the action client is built.
//!
//! # Usage
//!
//! ```ignore
//! use loom_provisioner_config::load_config;
//!
//! let config = load_config()?;
//! println!("crawling {:?}", config.crawler.name);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ProvisionerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved provisioner configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionerConfig {
	pub logging: LoggingConfig,
	pub aws: AwsConfig,
	pub crawler: CrawlerConfig,
	pub ingestion: IngestionConfig,
	pub grant: GrantConfig,
	pub reporter: ReporterConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LOOM_PROVISIONER_*`)
/// 2. Config file (`/etc/loom/provisioner.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ProvisionerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ProvisionerConfig, ConfigError> {
	load_from(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ProvisionerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ProvisionerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ProvisionerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize a merged layer into resolved config.
pub fn finalize(layer: ProvisionerConfigLayer) -> Result<ProvisionerConfig, ConfigError> {
	let config = ProvisionerConfig {
		logging: layer.logging.unwrap_or_default().finalize(),
		aws: layer.aws.unwrap_or_default().finalize(),
		crawler: layer.crawler.unwrap_or_default().finalize(),
		ingestion: layer.ingestion.unwrap_or_default().finalize(),
		grant: layer.grant.unwrap_or_default().finalize(),
		reporter: layer.reporter.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		region = %config.aws.region,
		crawler_configured = config.crawler.name.is_some(),
		ingestion_pairs = config.ingestion.knowledge_base_ids.len(),
		grant_workgroup_configured = config.grant.workgroup.is_some(),
		"provisioner configuration loaded"
	);

	Ok(config)
}

/// Reject values that can never produce a usable client.
///
/// Poll budgets are validated again when an action starts so that a bad budget
/// is reported to the orchestrator rather than only logged.
fn validate_config(config: &ProvisionerConfig) -> Result<(), ConfigError> {
	if config.aws.request_timeout_secs == 0 {
		return Err(ConfigError::invalid_value(
			"aws.request_timeout_secs",
			"must be greater than zero",
		));
	}
	if config.reporter.timeout_secs == 0 {
		return Err(ConfigError::invalid_value(
			"reporter.timeout_secs",
			"must be greater than zero",
		));
	}
	Ok(())
}
