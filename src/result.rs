//! Result and activation payload wrappers over the variant model.

use serde_json::{json, Value};

use crate::variant::{Variant, VariantMap};

/// One search result as seen by both sides of a reply channel.
///
/// A result is a variant map; `uri` and `title` are the only fields this
/// layer ever names, everything else is scope-defined.
#[derive(Debug, Clone)]
pub struct ScopeResult {
	inner: VariantMap,
}

impl ScopeResult {
	#[must_use]
	pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
		let mut inner = VariantMap::new();
		inner.insert("uri".into(), Value::String(uri.into()));
		inner.insert("title".into(), Value::String(title.into()));
		Self { inner }
	}

	#[must_use]
	pub fn from_map(inner: VariantMap) -> Self {
		Self { inner }
	}

	pub fn set(&mut self, key: impl Into<String>, value: Variant) {
		self.inner.insert(key.into(), value);
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Variant> {
		self.inner.get(key)
	}

	#[must_use]
	pub fn uri(&self) -> &str {
		self.inner.get("uri").and_then(Value::as_str).unwrap_or("")
	}

	#[must_use]
	pub fn title(&self) -> &str {
		self.inner
			.get("title")
			.and_then(Value::as_str)
			.unwrap_or("")
	}

	#[must_use]
	pub fn serialize(&self) -> Variant {
		Value::Object(self.inner.clone())
	}

	#[must_use]
	pub fn into_map(self) -> VariantMap {
		self.inner
	}
}

/// What the shell should do after activating a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStatus {
	NotHandled,
	ShowDash,
	HideDash,
	ShowPreview,
}

impl ActivationStatus {
	fn as_str(self) -> &'static str {
		match self {
			Self::NotHandled => "not_handled",
			Self::ShowDash => "show_dash",
			Self::HideDash => "hide_dash",
			Self::ShowPreview => "show_preview",
		}
	}

	fn from_str(s: &str) -> Self {
		match s {
			"show_dash" => Self::ShowDash,
			"hide_dash" => Self::HideDash,
			"show_preview" => Self::ShowPreview,
			_ => Self::NotHandled,
		}
	}
}

/// The single payload carried back over an activation reply channel.
#[derive(Debug, Clone)]
pub struct ActivationResponse {
	status: ActivationStatus,
	scope_data: Variant,
}

impl ActivationResponse {
	#[must_use]
	pub const fn new(status: ActivationStatus) -> Self {
		Self {
			status,
			scope_data: Value::Null,
		}
	}

	#[must_use]
	pub fn with_scope_data(mut self, data: Variant) -> Self {
		self.scope_data = data;
		self
	}

	#[must_use]
	pub const fn status(&self) -> ActivationStatus {
		self.status
	}

	#[must_use]
	pub const fn scope_data(&self) -> &Variant {
		&self.scope_data
	}

	#[must_use]
	pub fn serialize(&self) -> Variant {
		json!({
			"status": self.status.as_str(),
			"scope_data": self.scope_data,
		})
	}

	#[must_use]
	pub fn deserialize(value: &Variant) -> Self {
		let status = value
			.get("status")
			.and_then(Value::as_str)
			.map_or(ActivationStatus::NotHandled, ActivationStatus::from_str);

		Self {
			status,
			scope_data: value.get("scope_data").cloned().unwrap_or(Value::Null),
		}
	}
}
