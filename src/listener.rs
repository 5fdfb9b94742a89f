//! Receiver traits implemented by the caller (the shell, or an aggregating
//! scope). Exactly one `finished` is delivered per query, after all pushes.

use async_trait::async_trait;

use crate::{
	completion::{CompletionDetails, OperationInfo},
	result::{ActivationResponse, ScopeResult},
	variant::Variant,
};

/// Receives the result stream of a search query.
#[async_trait]
pub trait SearchListener: Send + Sync + 'static {
	/// One result, delivered in push order.
	async fn push(&self, result: ScopeResult);

	/// Non-fatal diagnostics, forwarded as they occur.
	async fn info(&self, info: OperationInfo) {
		let _ = info;
	}

	/// The single terminal event for this query.
	async fn finished(&self, details: CompletionDetails);
}

/// Receives the widget stream of a preview query.
#[async_trait]
pub trait PreviewListener: Send + Sync + 'static {
	async fn push_widgets(&self, widgets: Vec<Variant>);

	async fn info(&self, info: OperationInfo) {
		let _ = info;
	}

	async fn finished(&self, details: CompletionDetails);
}

/// Receives the outcome of an activation request.
#[async_trait]
pub trait ActivationListener: Send + Sync + 'static {
	async fn activated(&self, response: ActivationResponse);

	async fn info(&self, info: OperationInfo) {
		let _ = info;
	}

	async fn finished(&self, details: CompletionDetails);
}
