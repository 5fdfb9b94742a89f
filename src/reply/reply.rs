//! Servant-side reply: the handle a scope author pushes results through.
//!
//! The core wraps the upstream reply proxy plus a strong reference to the
//! owning query servant, so the query stays alive for as long as any reply
//! handle exists. Dropping the last handle without an explicit `finished()`
//! synthesizes one; the caller is never left waiting for a terminal event.

use std::sync::{
	atomic::{AtomicBool, AtomicUsize, Ordering},
	Arc,
};

use tokio::runtime::Handle;
use tracing::{trace, warn, Instrument};

use crate::{
	completion::{CompletionDetails, CompletionStatus, OperationInfo},
	middleware::ReplyProxy,
	query::QueryServant,
	result::ScopeResult,
	variant::{result_envelope, widgets_envelope, Variant, VariantMap},
};

pub(crate) struct ReplyCore {
	proxy: ReplyProxy,
	query: Arc<QueryServant>,
	finished: AtomicBool,
	pushes: AtomicUsize,
	cardinality: Option<usize>,
}

impl ReplyCore {
	pub(crate) fn new(proxy: ReplyProxy, query: Arc<QueryServant>) -> Arc<Self> {
		let cardinality = query.cardinality();

		Arc::new(Self {
			proxy,
			query,
			finished: AtomicBool::new(false),
			pushes: AtomicUsize::new(0),
			cardinality,
		})
	}

	/// Forwards one payload upstream. Returns `false` once the query was
	/// cancelled, errored, finished, or hit its cardinality bound; that is
	/// the back-pressure signal to stop producing.
	pub(crate) async fn push(&self, payload: VariantMap) -> bool {
		if !self.query.pushable() {
			return false; // Query was cancelled or had an error.
		}

		if self.finished.load(Ordering::Acquire) {
			return false;
		}

		if let Err(e) = self.proxy.push(payload).await {
			self.error(e.to_string()).await;
			return false;
		}

		// Enforce the cardinality bound. To the caller, a query that exceeds
		// it looks like one that returned the maximum number of results and
		// finished normally. The push that reaches the bound is the last
		// successful one, so it reports `false`.
		let delivered = self.pushes.fetch_add(1, Ordering::AcqRel) + 1;
		if self.cardinality == Some(delivered) {
			self.finished().await;
			return false;
		}

		true
	}

	pub(crate) async fn finished(&self) {
		if self.finished.swap(true, Ordering::AcqRel) {
			return;
		}

		self.proxy
			.finished(CompletionDetails::new(CompletionStatus::Ok))
			.await;
	}

	/// First error wins; anything after the terminal event is dropped.
	pub(crate) async fn error(&self, message: String) {
		if self.finished.swap(true, Ordering::AcqRel) {
			return;
		}

		warn!(%message, "query reported an error");

		self.proxy
			.finished(CompletionDetails::with_message(
				CompletionStatus::Error,
				message,
			))
			.await;
	}

	pub(crate) async fn info(&self, info: OperationInfo) {
		if self.finished.load(Ordering::Acquire) {
			trace!("info after finished, dropped");
			return;
		}

		self.proxy.info(info).await;
	}
}

impl Drop for ReplyCore {
	fn drop(&mut self) {
		// RAII completion guarantee: a reply that was never explicitly
		// finished still delivers exactly one terminal event. Skipped when no
		// runtime is left to carry it (process teardown).
		if !self.finished.swap(true, Ordering::AcqRel) {
			let Ok(handle) = Handle::try_current() else {
				return;
			};

			let proxy = self.proxy.clone();

			handle.spawn(
				async move {
					proxy
						.finished(CompletionDetails::new(CompletionStatus::Ok))
						.await;
				}
				.in_current_span(),
			);
		}
	}
}

/// Reply handle passed to a [`SearchQuery`](crate::query::SearchQuery).
#[derive(Clone)]
pub struct SearchReply {
	pub(crate) core: Arc<ReplyCore>,
}

impl SearchReply {
	/// Pushes one result. Returns `false` when the caller will not accept
	/// further results; the query should stop producing.
	pub async fn push(&self, result: ScopeResult) -> bool {
		self.core.push(result_envelope(result.serialize())).await
	}

	pub async fn finished(&self) {
		self.core.finished().await;
	}

	pub async fn error(&self, message: impl Into<String>) {
		self.core.error(message.into()).await;
	}

	pub async fn info(&self, info: OperationInfo) {
		self.core.info(info).await;
	}
}

/// Reply handle passed to a [`PreviewQuery`](crate::query::PreviewQuery).
#[derive(Clone)]
pub struct PreviewReply {
	pub(crate) core: Arc<ReplyCore>,
}

impl PreviewReply {
	/// Pushes one batch of preview widgets.
	pub async fn push_widgets(&self, widgets: Vec<Variant>) -> bool {
		self.core.push(widgets_envelope(widgets)).await
	}

	pub async fn finished(&self) {
		self.core.finished().await;
	}

	pub async fn error(&self, message: impl Into<String>) {
		self.core.error(message.into()).await;
	}

	pub async fn info(&self, info: OperationInfo) {
		self.core.info(info).await;
	}
}
