// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lifecycle events delivered by the orchestrator.
//!
//! Events use the CloudFormation custom resource envelope. Only `RequestType`,
//! `RequestId` and `ResourceProperties` drive routing; the remaining fields are
//! echoed back when the response is delivered.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProvisionerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
	Create,
	Update,
	Delete,
}

impl RequestType {
	/// Create and Update advance provisioning; Delete never does.
	pub fn is_provisioning(self) -> bool {
		matches!(self, RequestType::Create | RequestType::Update)
	}
}

impl fmt::Display for RequestType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RequestType::Create => "Create",
			RequestType::Update => "Update",
			RequestType::Delete => "Delete",
		};
		f.write_str(name)
	}
}

/// One lifecycle notification. Immutable for the lifetime of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
	pub request_type: RequestType,
	pub request_id: String,
	#[serde(rename = "ResponseURL", default)]
	pub response_url: String,
	#[serde(default)]
	pub stack_id: String,
	#[serde(default)]
	pub logical_resource_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub physical_resource_id: Option<String>,
	#[serde(default)]
	pub resource_type: String,
	#[serde(default)]
	pub resource_properties: ResourceProperties,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub old_resource_properties: Option<ResourceProperties>,
}

impl LifecycleEvent {
	pub fn new(request_type: RequestType, request_id: impl Into<String>) -> Self {
		Self {
			request_type,
			request_id: request_id.into(),
			response_url: String::new(),
			stack_id: String::new(),
			logical_resource_id: String::new(),
			physical_resource_id: None,
			resource_type: String::new(),
			resource_properties: ResourceProperties::default(),
			old_resource_properties: None,
		}
	}

	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.resource_properties.insert(key, value);
		self
	}

	pub fn with_logical_resource_id(mut self, id: impl Into<String>) -> Self {
		self.logical_resource_id = id.into();
		self
	}

	pub fn with_physical_resource_id(mut self, id: impl Into<String>) -> Self {
		self.physical_resource_id = Some(id.into());
		self
	}

	pub fn with_response_url(mut self, url: impl Into<String>) -> Self {
		self.response_url = url.into();
		self
	}

	/// Identifier reported back as `PhysicalResourceId`.
	///
	/// An id already assigned by an earlier Create is echoed so Update and
	/// Delete never replace the resource. A fresh Create derives the id from the
	/// action and the logical id, which keeps it stable for the same target.
	pub fn physical_resource_id_for(&self, action: &str) -> String {
		if let Some(id) = self.physical_resource_id.as_deref().filter(|id| !id.is_empty()) {
			return id.to_string();
		}
		if self.logical_resource_id.is_empty() {
			format!("{action}-{}", self.request_id)
		} else {
			format!("{action}-{}", self.logical_resource_id)
		}
	}
}

/// String-keyed properties attached to the resource declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceProperties(BTreeMap<String, Value>);

impl ResourceProperties {
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.insert(key.into(), value.into());
	}

	/// Scalar property as a string. Null and blank values count as absent.
	pub fn get(&self, key: &str) -> Option<String> {
		let value = match self.0.get(key)? {
			Value::String(s) => s.trim().to_string(),
			Value::Number(n) => n.to_string(),
			Value::Bool(b) => b.to_string(),
			_ => return None,
		};
		(!value.is_empty()).then_some(value)
	}

	/// List property.
	///
	/// Accepts a JSON array, a string holding a JSON array, or a
	/// comma-separated string. Returns `None` when the key is absent.
	pub fn list(&self, key: &str) -> Result<Option<Vec<String>>> {
		let Some(value) = self.0.get(key) else {
			return Ok(None);
		};
		let items = match value {
			Value::Null => return Ok(None),
			Value::Array(items) => items
				.iter()
				.map(|item| match item {
					Value::String(s) => Ok(s.trim().to_string()),
					Value::Number(n) => Ok(n.to_string()),
					other => Err(ProvisionerError::configuration(format!(
						"property {key} contains a non-scalar item: {other}"
					))),
				})
				.collect::<Result<Vec<_>>>()?,
			Value::String(s) => parse_id_list(s).map_err(|message| {
				ProvisionerError::configuration(format!("property {key}: {message}"))
			})?,
			other => {
				return Err(ProvisionerError::configuration(format!(
					"property {key} must be a list, got {other}"
				)))
			}
		};
		Ok(Some(items))
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Parse `["a","b"]` or `a, b` into identifiers, dropping blanks.
pub fn parse_id_list(raw: &str) -> std::result::Result<Vec<String>, String> {
	let trimmed = raw.trim();
	if trimmed.starts_with('[') {
		let items: Vec<String> =
			serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON list: {e}"))?;
		return Ok(items
			.into_iter()
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect());
	}
	Ok(trimmed
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect())
}
