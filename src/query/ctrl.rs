//! Query cancellation, both sides of the boundary.
//!
//! `QueryCtrlServant` sits beside the query servant on the scope side and
//! forwards out-of-band cancellation; `QueryCtrl` is the caller's handle.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, Mutex, Weak,
};

use tracing::{instrument, trace, warn};

use crate::{
	completion::{CompletionDetails, CompletionStatus},
	middleware::{InvokeInfo, QueryCtrlProxy, ReplyProxy, Request, Servant},
	object::Disconnect,
};

use super::object::QueryServant;

/// Paired 1:1 with a query servant. Holds a weak back-reference only; the
/// ctrl never extends the query's lifetime.
pub struct QueryCtrlServant {
	query: Mutex<Weak<QueryServant>>,
	destroyed: AtomicBool,
	disconnect: Disconnect,
}

impl QueryCtrlServant {
	#[must_use]
	pub(crate) fn new() -> Self {
		Self {
			query: Mutex::new(Weak::new()),
			destroyed: AtomicBool::new(false),
			disconnect: Disconnect::new(),
		}
	}

	pub(crate) fn set_query(&self, query: &Arc<QueryServant>) {
		*self.query.lock().expect("ctrl query lock poisoned") = Arc::downgrade(query);
	}

	/// Exactly-once: the first of `cancel`/`destroy` wins, later calls are
	/// no-ops. Cancellation racing with natural completion finds an empty
	/// weak reference and degenerates to `destroy`.
	#[instrument(skip(self), fields(identity = %info.identity))]
	async fn cancel(&self, info: InvokeInfo) {
		if self.destroyed.swap(true, Ordering::AcqRel) {
			return;
		}

		let query = {
			self.query
				.lock()
				.expect("ctrl query lock poisoned")
				.upgrade()
		};

		match query {
			Some(query) => query.cancel(info).await,
			None => trace!("query already completed, cancel is a no-op"),
		}

		self.disconnect.disconnect();
	}

	/// Detaches the ctrl from the middleware without touching the query.
	fn destroy(&self, _info: &InvokeInfo) {
		if self.destroyed.swap(true, Ordering::AcqRel) {
			return;
		}

		self.disconnect.disconnect();
	}
}

#[async_trait::async_trait]
impl Servant for QueryCtrlServant {
	async fn dispatch(&self, request: Request, info: InvokeInfo) {
		match request {
			Request::Cancel => self.cancel(info).await,
			Request::Destroy => self.destroy(&info),
			other => warn!(?other, "unexpected operation on query ctrl servant"),
		}
	}

	fn disconnect_guard(&self) -> &Disconnect {
		&self.disconnect
	}
}

#[derive(Debug)]
struct CtrlState {
	proxy: Option<QueryCtrlProxy>,
	cancelled: bool,
}

/// The caller's handle to cancel a running remote query.
///
/// `cancel()` is fire-and-forget; dropping the handle never cancels. The
/// handle starts without its remote proxy (the two-way request that creates
/// the remote ctrl is still in flight); a cancel issued during that window is
/// remembered and replayed once the proxy arrives.
#[derive(Debug, Clone)]
pub struct QueryCtrl {
	reply: ReplyProxy,
	state: Arc<Mutex<CtrlState>>,
}

impl QueryCtrl {
	pub(crate) fn new(reply: ReplyProxy) -> Self {
		Self {
			reply,
			state: Arc::new(Mutex::new(CtrlState {
				proxy: None,
				cancelled: false,
			})),
		}
	}

	/// Non-blocking cancellation hint. Also routes a cancelled completion to
	/// this query's own reply object, so the listener always observes a
	/// terminal event even if the scope never produces one.
	pub async fn cancel(&self) {
		let proxy = {
			let mut state = self.state.lock().expect("query ctrl state lock poisoned");
			match &state.proxy {
				Some(proxy) => proxy.clone(),
				None => {
					// Remember the cancel; set_proxy() replays it.
					state.cancelled = true;
					return;
				}
			}
		};

		proxy.cancel().await;

		self.reply
			.finished(CompletionDetails::new(CompletionStatus::Cancelled))
			.await;
	}

	pub(crate) async fn set_proxy(&self, proxy: QueryCtrlProxy) {
		let need_cancel = {
			let mut state = self.state.lock().expect("query ctrl state lock poisoned");
			state.proxy = Some(proxy);
			state.cancelled
		};

		if need_cancel {
			self.cancel().await;
		}
	}
}
