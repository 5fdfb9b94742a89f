//! Servant-side query object: one instance per in-flight query execution.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, Mutex, Weak,
};

use tokio::runtime::Handle;
use tracing::{error, instrument, trace, warn, Instrument};

use crate::{
	completion::{CompletionDetails, CompletionStatus},
	middleware::{InvokeInfo, QueryCtrlProxy, ReplyProxy, Request, Servant},
	object::Disconnect,
	reply::{PreviewReply, ReplyCore, SearchReply},
	variant::activation_envelope,
};

use super::base::{ActivationQuery, PreviewQuery, SearchQuery};

/// The scope-author implementation behind a query servant. Search, preview
/// and activation follow the same protocol; only the payload differs.
pub(crate) enum QueryKind {
	Search(Arc<dyn SearchQuery>),
	Preview(Arc<dyn PreviewQuery>),
	Activation(Arc<dyn ActivationQuery>),
}

impl QueryKind {
	fn cancelled(&self) {
		match self {
			Self::Search(q) => q.cancelled(),
			Self::Preview(q) => q.cancelled(),
			Self::Activation(q) => q.cancelled(),
		}
	}
}

/// One in-flight query execution on the scope side.
///
/// The `self_pin` keeps this object alive between request dispatch and the
/// `run` invocation; `run` releases it exactly once, after the servant-side
/// reply has taken a strong reference of its own. Net effect: the servant
/// lives for as long as a reply handle exists or the author's `run` is still
/// executing, whichever ends last.
pub struct QueryServant {
	kind: QueryKind,
	upstream: ReplyProxy,
	ctrl: QueryCtrlProxy,
	pushable: AtomicBool,
	cardinality: Option<usize>,
	self_pin: Mutex<Option<Arc<QueryServant>>>,
	reply: Mutex<Weak<ReplyCore>>,
	disconnect: Disconnect,
}

impl QueryServant {
	pub(crate) fn new(
		kind: QueryKind,
		cardinality: Option<usize>,
		upstream: ReplyProxy,
		ctrl: QueryCtrlProxy,
	) -> Self {
		Self {
			kind,
			upstream,
			ctrl,
			pushable: AtomicBool::new(true),
			cardinality,
			self_pin: Mutex::new(None),
			reply: Mutex::new(Weak::new()),
			disconnect: Disconnect::new(),
		}
	}

	/// Pins a strong self-reference until `run` hands ownership to the reply.
	pub(crate) fn set_self(&self, this: Arc<Self>) {
		let mut pin = self.self_pin.lock().expect("query self pin lock poisoned");
		debug_assert!(pin.is_none(), "set_self() called twice");
		*pin = Some(this);
	}

	pub(crate) fn pushable(&self) -> bool {
		self.pushable.load(Ordering::Acquire)
	}

	pub(crate) const fn cardinality(&self) -> Option<usize> {
		self.cardinality
	}

	/// Runs the author's query. Author failures are converted into a single
	/// error completion on the reply channel and never escape the dispatch.
	#[instrument(skip(self, reply), fields(identity = %info.identity))]
	async fn run(&self, reply: ReplyProxy, info: InvokeInfo) {
		// run() and cancel() arrive on different dispatch queues, so a run()
		// can be delivered after the query was already cancelled. Never
		// forward it to the author in that case.
		if !self.pushable() {
			trace!("query cancelled before run was dispatched");
			self.release_pin();
			self.disconnect.disconnect();
			return;
		}

		let Some(this) = self.release_pin() else {
			error!("run dispatched without a pinned self reference");
			return;
		};

		let core = ReplyCore::new(reply, this);
		*self.reply.lock().expect("query reply lock poisoned") = Arc::downgrade(&core);

		// The reply now holds the strong reference; the servant table entry
		// is no longer needed.
		self.disconnect.disconnect();

		match &self.kind {
			QueryKind::Search(query) => {
				let handle = SearchReply {
					core: Arc::clone(&core),
				};
				if let Err(e) = query.run(handle).await {
					self.pushable.store(false, Ordering::Release);
					core.error(format!("SearchQuery::run(): {e:#}")).await;
				}
			}

			QueryKind::Preview(query) => {
				let handle = PreviewReply {
					core: Arc::clone(&core),
				};
				if let Err(e) = query.run(handle).await {
					self.pushable.store(false, Ordering::Release);
					core.error(format!("PreviewQuery::run(): {e:#}")).await;
				}
			}

			QueryKind::Activation(query) => match query.activate().await {
				Ok(response) => {
					core.push(activation_envelope(response.serialize())).await;
					core.finished().await;
				}
				Err(e) => {
					self.pushable.store(false, Ordering::Release);
					core.error(format!("ActivationQuery::activate(): {e:#}")).await;
				}
			},
		}
	}

	/// Advisory cancellation, forwarded from the paired ctrl servant. Marks
	/// the reply path unpushable and informs the author; in-flight work is
	/// never forcibly aborted.
	#[instrument(skip(self), fields(identity = %info.identity))]
	pub(crate) async fn cancel(&self, info: InvokeInfo) {
		self.pushable.store(false, Ordering::Release);

		let reply_alive = {
			self.reply
				.lock()
				.expect("query reply lock poisoned")
				.upgrade()
				.is_some()
		};

		if reply_alive {
			// Tell the up-stream side the query is done. One-way, can't block.
			self.upstream
				.finished(CompletionDetails::new(CompletionStatus::Cancelled))
				.await;
		}

		self.kind.cancelled();
	}

	fn release_pin(&self) -> Option<Arc<Self>> {
		self.self_pin
			.lock()
			.expect("query self pin lock poisoned")
			.take()
	}
}

impl Drop for QueryServant {
	fn drop(&mut self) {
		// The paired ctrl servant has no further use once the query is gone.
		// Outside a runtime context (process teardown) there is nothing left
		// to notify.
		let Ok(handle) = Handle::try_current() else {
			return;
		};

		let ctrl = self.ctrl.clone();

		handle.spawn(
			async move {
				ctrl.destroy().await;
			}
			.in_current_span(),
		);
	}
}

#[async_trait::async_trait]
impl Servant for QueryServant {
	async fn dispatch(&self, request: Request, info: InvokeInfo) {
		match request {
			Request::Run { reply } => self.run(reply, info).await,
			other => warn!(?other, "unexpected operation on query servant"),
		}
	}

	fn disconnect_guard(&self) -> &Disconnect {
		&self.disconnect
	}
}
