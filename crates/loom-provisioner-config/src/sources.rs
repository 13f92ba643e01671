// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use loom_provisioner_core::event::parse_id_list;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ProvisionerConfigLayer;
use crate::sections::{
	AwsConfigLayer, CrawlerConfigLayer, GrantConfigLayer, IngestionConfigLayer, LogFormat,
	LoggingConfigLayer, ReporterConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ProvisionerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/provisioner.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ProvisionerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ProvisionerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: LOOM_PROVISIONER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ProvisionerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_lookup(|name| std::env::var(name).ok())
	}
}

/// Build a layer from a variable lookup. Empty values count as unset.
pub(crate) fn layer_from_lookup(
	lookup: impl Fn(&str) -> Option<String>,
) -> Result<ProvisionerConfigLayer, ConfigError> {
	let env = Env { lookup };
	Ok(ProvisionerConfigLayer {
		logging: Some(env.logging()?),
		aws: Some(env.aws()?),
		crawler: Some(env.crawler()?),
		ingestion: Some(env.ingestion()?),
		grant: Some(env.grant()),
		reporter: Some(env.reporter()?),
	})
}

struct Env<F> {
	lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name)
			.map(|v| v.trim().to_string())
			.filter(|v| !v.is_empty())
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		match self.var(name) {
			Some(v) => v
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::invalid_value(name, format!("invalid u64 value '{v}'"))),
			None => Ok(None),
		}
	}

	fn u32(&self, name: &str) -> Result<Option<u32>, ConfigError> {
		match self.var(name) {
			Some(v) => v
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::invalid_value(name, format!("invalid u32 value '{v}'"))),
			None => Ok(None),
		}
	}

	/// `["a","b"]` or `a,b`, parsed the same way as event properties.
	fn list(&self, name: &str) -> Result<Option<Vec<String>>, ConfigError> {
		self.var(name)
			.map(|v| parse_id_list(&v).map_err(|message| ConfigError::invalid_value(name, message)))
			.transpose()
	}

	fn logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var("LOOM_PROVISIONER_LOG_FORMAT") {
			Some(v) => Some(LogFormat::parse(&v).ok_or_else(|| {
				ConfigError::invalid_value(
					"LOOM_PROVISIONER_LOG_FORMAT",
					format!("expected 'text' or 'json', got '{v}'"),
				)
			})?),
			None => None,
		};
		Ok(LoggingConfigLayer {
			level: self.var("LOOM_PROVISIONER_LOG_LEVEL"),
			format,
		})
	}

	fn aws(&self) -> Result<AwsConfigLayer, ConfigError> {
		Ok(AwsConfigLayer {
			region: self
				.var("LOOM_PROVISIONER_AWS_REGION")
				.or_else(|| self.var("AWS_REGION")),
			glue_endpoint: self.var("LOOM_PROVISIONER_GLUE_ENDPOINT"),
			bedrock_agent_endpoint: self.var("LOOM_PROVISIONER_BEDROCK_AGENT_ENDPOINT"),
			redshift_data_endpoint: self.var("LOOM_PROVISIONER_REDSHIFT_DATA_ENDPOINT"),
			request_timeout_secs: self.u64("LOOM_PROVISIONER_AWS_REQUEST_TIMEOUT_SECS")?,
		})
	}

	fn crawler(&self) -> Result<CrawlerConfigLayer, ConfigError> {
		Ok(CrawlerConfigLayer {
			name: self.var("LOOM_PROVISIONER_CRAWLER_NAME"),
			poll_interval_secs: self.u64("LOOM_PROVISIONER_CRAWLER_POLL_INTERVAL_SECS")?,
			poll_deadline_secs: self.u64("LOOM_PROVISIONER_CRAWLER_POLL_DEADLINE_SECS")?,
			settle_delay_secs: self.u64("LOOM_PROVISIONER_CRAWLER_SETTLE_DELAY_SECS")?,
		})
	}

	fn ingestion(&self) -> Result<IngestionConfigLayer, ConfigError> {
		Ok(IngestionConfigLayer {
			knowledge_base_ids: self.list("LOOM_PROVISIONER_INGESTION_KNOWLEDGE_BASE_IDS")?,
			data_source_ids: self.list("LOOM_PROVISIONER_INGESTION_DATA_SOURCE_IDS")?,
			poll_interval_secs: self.u64("LOOM_PROVISIONER_INGESTION_POLL_INTERVAL_SECS")?,
			poll_deadline_secs: self.u64("LOOM_PROVISIONER_INGESTION_POLL_DEADLINE_SECS")?,
		})
	}

	fn grant(&self) -> GrantConfigLayer {
		GrantConfigLayer {
			workgroup: self.var("LOOM_PROVISIONER_GRANT_WORKGROUP"),
			database: self.var("LOOM_PROVISIONER_GRANT_DATABASE"),
			grant_database: self.var("LOOM_PROVISIONER_GRANT_USAGE_DATABASE"),
			role_name: self.var("LOOM_PROVISIONER_GRANT_ROLE_NAME"),
		}
	}

	fn reporter(&self) -> Result<ReporterConfigLayer, ConfigError> {
		Ok(ReporterConfigLayer {
			timeout_secs: self.u64("LOOM_PROVISIONER_REPORTER_TIMEOUT_SECS")?,
			max_attempts: self.u32("LOOM_PROVISIONER_REPORTER_MAX_ATTEMPTS")?,
			base_delay_ms: self.u64("LOOM_PROVISIONER_REPORTER_BASE_DELAY_MS")?,
			max_delay_ms: self.u64("LOOM_PROVISIONER_REPORTER_MAX_DELAY_MS")?,
		})
	}
}
