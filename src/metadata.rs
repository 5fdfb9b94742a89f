//! Query and scope metadata passed across the proxy/servant boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A query as issued by the shell or an aggregating scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannedQuery {
	scope_id: String,
	query_string: String,
	department_id: String,
}

impl CannedQuery {
	#[must_use]
	pub fn new(scope_id: impl Into<String>, query_string: impl Into<String>) -> Self {
		Self {
			scope_id: scope_id.into(),
			query_string: query_string.into(),
			department_id: String::new(),
		}
	}

	#[must_use]
	pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
		self.department_id = department_id.into();
		self
	}

	#[must_use]
	pub fn scope_id(&self) -> &str {
		&self.scope_id
	}

	#[must_use]
	pub fn query_string(&self) -> &str {
		&self.query_string
	}

	#[must_use]
	pub fn department_id(&self) -> &str {
		&self.department_id
	}
}

/// Hints accompanying a search request.
///
/// `cardinality` is an optional upper bound on the number of results the
/// caller is willing to receive; `None` means unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchMetadata {
	locale: String,
	form_factor: String,
	cardinality: Option<usize>,
}

impl SearchMetadata {
	#[must_use]
	pub fn new(locale: impl Into<String>, form_factor: impl Into<String>) -> Self {
		Self {
			locale: locale.into(),
			form_factor: form_factor.into(),
			cardinality: None,
		}
	}

	#[must_use]
	pub fn with_cardinality(mut self, cardinality: usize) -> Self {
		self.cardinality = Some(cardinality);
		self
	}

	#[must_use]
	pub fn locale(&self) -> &str {
		&self.locale
	}

	#[must_use]
	pub fn form_factor(&self) -> &str {
		&self.form_factor
	}

	#[must_use]
	pub const fn cardinality(&self) -> Option<usize> {
		self.cardinality
	}
}

/// Hints accompanying a preview or activation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionMetadata {
	locale: String,
	form_factor: String,
}

impl ActionMetadata {
	#[must_use]
	pub fn new(locale: impl Into<String>, form_factor: impl Into<String>) -> Self {
		Self {
			locale: locale.into(),
			form_factor: form_factor.into(),
		}
	}

	#[must_use]
	pub fn locale(&self) -> &str {
		&self.locale
	}

	#[must_use]
	pub fn form_factor(&self) -> &str {
		&self.form_factor
	}
}

/// Static description of a registered scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeMetadata {
	scope_id: String,
	display_name: String,
	description: String,
	author: String,
}

impl ScopeMetadata {
	#[must_use]
	pub fn new(scope_id: impl Into<String>, display_name: impl Into<String>) -> Self {
		Self {
			scope_id: scope_id.into(),
			display_name: display_name.into(),
			description: String::new(),
			author: String::new(),
		}
	}

	#[must_use]
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	#[must_use]
	pub fn with_author(mut self, author: impl Into<String>) -> Self {
		self.author = author.into();
		self
	}

	#[must_use]
	pub fn scope_id(&self) -> &str {
		&self.scope_id
	}

	#[must_use]
	pub fn display_name(&self) -> &str {
		&self.display_name
	}

	#[must_use]
	pub fn description(&self) -> &str {
		&self.description
	}

	#[must_use]
	pub fn author(&self) -> &str {
		&self.author
	}
}

/// Snapshot of all registered scopes, keyed by identity.
pub type MetadataMap = HashMap<String, ScopeMetadata>;

/// Liveness of a scope process, published over the registry's side-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
	Running,
	Stopped,
}
