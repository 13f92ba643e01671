// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning hook binary.
//!
//! Reads one lifecycle event, runs the selected action to completion and
//! delivers exactly one response to the orchestrator.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use loom_provisioner_config::{ConfigError, LogFormat, LoggingConfig, ProvisionerConfig};
use loom_provisioner_core::{
	reject, ActionClient, Handler, LifecycleEvent, Outcome, ProvisionerError, ReportError,
	ResponseBody, ResultReporter,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run one provisioning hook invocation.
#[derive(Parser, Debug)]
#[command(name = "loom-provisioner", about = "Provisioning hook for custom resources", version)]
struct Cli {
	/// Action to run for Create and Update events
	#[arg(value_enum)]
	action: Action,

	/// Lifecycle event JSON file, or `-` for stdin
	#[arg(long, default_value = "-")]
	event: String,

	/// Config file (defaults to /etc/loom/provisioner.toml)
	#[arg(long, env = "LOOM_PROVISIONER_CONFIG")]
	config: Option<PathBuf>,

	/// Print the outcome without sending it to the response URL
	#[arg(long)]
	no_report: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
	/// Start a Glue crawler and wait for it to finish
	Crawl,
	/// Start knowledge base ingestion jobs and wait for all of them
	Ingest,
	/// Grant database usage to the knowledge base role
	Grant,
}

impl Action {
	/// Name used for physical resource ids, matching the action clients.
	fn name(self) -> &'static str {
		match self {
			Action::Crawl => "crawl",
			Action::Ingest => "ingestion",
			Action::Grant => "grant",
		}
	}
}

/// Accepts every response without sending it.
struct DiscardReporter;

#[async_trait]
impl ResultReporter for DiscardReporter {
	async fn deliver(&self, _event: &LifecycleEvent, body: &ResponseBody) -> Result<(), ReportError> {
		info!(status = ?body.status, "response not sent (--no-report)");
		Ok(())
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	let config = match &cli.config {
		Some(path) => loom_provisioner_config::load_config_with_file(path.clone()),
		None => loom_provisioner_config::load_config(),
	};
	init_tracing(
		config
			.as_ref()
			.map(|c| c.logging.clone())
			.unwrap_or_default(),
	);

	match run(cli, config).await {
		Ok(outcome) => match serde_json::to_string(&outcome) {
			Ok(json) => {
				println!("{json}");
				ExitCode::SUCCESS
			}
			Err(err) => {
				error!(error = %err, "failed to encode outcome");
				ExitCode::FAILURE
			}
		},
		Err(err) => {
			error!(error = %format!("{err:#}"), "invocation failed");
			ExitCode::FAILURE
		}
	}
}

/// Logs go to stderr; stdout carries only the outcome.
fn init_tracing(logging: LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.init(),
		LogFormat::Text => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

async fn run(
	cli: Cli,
	config: Result<ProvisionerConfig, ConfigError>,
) -> anyhow::Result<Outcome> {
	let event = read_event(&cli.event)
		.with_context(|| format!("failed to read lifecycle event from {}", cli.event))?;
	info!(
		action = cli.action.name(),
		request_id = %event.request_id,
		request_type = %event.request_type,
		"handling lifecycle event"
	);

	if cli.no_report {
		return dispatch(cli.action, config, DiscardReporter, &event).await;
	}

	let reporter_config = config
		.as_ref()
		.map(|c| c.reporter.clone())
		.unwrap_or_default();
	let reporter = loom_provisioner_aws::CloudFormationReporter::from_config(&reporter_config)
		.context("failed to build response reporter")?;
	dispatch(cli.action, config, reporter, &event).await
}

async fn dispatch<R: ResultReporter>(
	action: Action,
	config: Result<ProvisionerConfig, ConfigError>,
	reporter: R,
	event: &LifecycleEvent,
) -> anyhow::Result<Outcome> {
	let config = match config {
		Ok(config) => config,
		Err(err) => {
			error!(error = %err, "configuration could not be loaded");
			let reason = ProvisionerError::configuration(err.to_string()).to_string();
			return Ok(reject(&reporter, event, action.name(), reason).await?);
		}
	};

	match action {
		Action::Crawl => {
			handle(action, loom_provisioner_aws::crawler_client(&config), reporter, event).await
		}
		Action::Ingest => {
			handle(action, loom_provisioner_aws::ingestion_client(&config), reporter, event).await
		}
		Action::Grant => {
			handle(action, loom_provisioner_aws::grant_client(&config), reporter, event).await
		}
	}
}

async fn handle<C, E, R>(
	action: Action,
	client: Result<C, E>,
	reporter: R,
	event: &LifecycleEvent,
) -> anyhow::Result<Outcome>
where
	C: ActionClient,
	E: std::fmt::Display,
	R: ResultReporter,
{
	match client {
		Ok(client) => Ok(Handler::new(client, reporter).handle(event).await?),
		Err(err) => {
			let reason = format!("failed to build HTTP client: {err}");
			Ok(reject(&reporter, event, action.name(), reason).await?)
		}
	}
}

fn read_event(source: &str) -> anyhow::Result<LifecycleEvent> {
	let raw = if source == "-" {
		let mut raw = String::new();
		std::io::stdin()
			.read_to_string(&mut raw)
			.context("failed to read stdin")?;
		raw
	} else {
		std::fs::read_to_string(Path::new(source))?
	};
	serde_json::from_str(&raw).context("lifecycle event is not valid JSON")
}
