//! Caller-side reply servant: fans replies in to the listener and enforces
//! the at-most-one-finished guarantee.

use std::sync::{
	atomic::{AtomicBool, AtomicUsize, Ordering},
	Arc, Mutex, Weak,
};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::Value;
use tokio::{
	runtime::Handle,
	spawn,
	sync::Notify,
	time::{sleep_until, Instant},
};
use tracing::{trace, warn, Instrument};

use crate::{
	completion::{CompletionDetails, CompletionStatus, OperationInfo},
	listener::{ActivationListener, PreviewListener, SearchListener},
	middleware::{InvokeInfo, Request, Servant},
	object::Disconnect,
	result::{ActivationResponse, ScopeResult},
	variant::VariantMap,
};

/// Routes decoded payloads to the right listener flavor.
#[derive(Clone)]
enum Handler {
	Search(Arc<dyn SearchListener>),
	Preview(Arc<dyn PreviewListener>),
	Activation(Arc<dyn ActivationListener>),
}

impl Handler {
	async fn process(&self, payload: VariantMap) -> anyhow::Result<()> {
		match self {
			Self::Search(listener) => {
				let result = payload
					.get("result")
					.and_then(Value::as_object)
					.ok_or_else(|| anyhow!("result payload missing 'result' object"))?;

				listener.push(ScopeResult::from_map(result.clone())).await;
			}

			Self::Preview(listener) => {
				let widgets = payload
					.get("widgets")
					.and_then(Value::as_array)
					.ok_or_else(|| anyhow!("preview payload missing 'widgets' array"))?;

				listener.push_widgets(widgets.clone()).await;
			}

			Self::Activation(listener) => {
				let response = payload
					.get("activation")
					.ok_or_else(|| anyhow!("activation payload missing 'activation' field"))?;

				listener
					.activated(ActivationResponse::deserialize(response))
					.await;
			}
		}

		Ok(())
	}

	async fn info(&self, info: OperationInfo) {
		match self {
			Self::Search(listener) => listener.info(info).await,
			Self::Preview(listener) => listener.info(info).await,
			Self::Activation(listener) => listener.info(info).await,
		}
	}

	async fn finished(&self, details: CompletionDetails) {
		match self {
			Self::Search(listener) => listener.finished(details).await,
			Self::Preview(listener) => listener.finished(details).await,
			Self::Activation(listener) => listener.finished(details).await,
		}
	}
}

/// One reply channel's receiving end.
///
/// Pushes arriving on the dispatch queue are delivered to the listener in
/// order. `finished` is delivered exactly once, after in-flight pushes have
/// drained; pushes and info records arriving later are dropped. An optional
/// inactivity window arms a watchdog that force-finishes a stalled reply
/// with an error, so a dead scope process cannot strand its caller.
pub struct ReplyObject {
	handler: Handler,
	finished: AtomicBool,
	in_flight: AtomicUsize,
	idle: Notify,
	delivered: AtomicUsize,
	cardinality: Option<usize>,
	info_list: Mutex<Vec<OperationInfo>>,
	last_activity: Mutex<Instant>,
	reap_window: Option<Duration>,
	disconnect: Disconnect,
}

impl ReplyObject {
	#[must_use]
	pub fn for_search(
		listener: Arc<dyn SearchListener>,
		cardinality: Option<usize>,
		reap_window: Option<Duration>,
	) -> Arc<Self> {
		Self::new(Handler::Search(listener), cardinality, reap_window)
	}

	#[must_use]
	pub fn for_preview(
		listener: Arc<dyn PreviewListener>,
		reap_window: Option<Duration>,
	) -> Arc<Self> {
		Self::new(Handler::Preview(listener), None, reap_window)
	}

	#[must_use]
	pub fn for_activation(
		listener: Arc<dyn ActivationListener>,
		reap_window: Option<Duration>,
	) -> Arc<Self> {
		Self::new(Handler::Activation(listener), None, reap_window)
	}

	fn new(
		handler: Handler,
		cardinality: Option<usize>,
		reap_window: Option<Duration>,
	) -> Arc<Self> {
		Arc::new(Self {
			handler,
			finished: AtomicBool::new(false),
			in_flight: AtomicUsize::new(0),
			idle: Notify::new(),
			delivered: AtomicUsize::new(0),
			cardinality,
			info_list: Mutex::new(Vec::new()),
			last_activity: Mutex::new(Instant::now()),
			reap_window,
			disconnect: Disconnect::new(),
		})
	}

	/// Starts the inactivity watchdog, if a window was configured. Holds
	/// only a weak reference, so a dropped reply stops its watchdog.
	pub fn arm_reaper(self: &Arc<Self>) {
		let Some(window) = self.reap_window else {
			return;
		};

		let this = Arc::downgrade(self);

		spawn(Self::reap_watchdog(this, window).in_current_span());
	}

	async fn reap_watchdog(this: Weak<Self>, window: Duration) {
		loop {
			let deadline = {
				let Some(reply) = this.upgrade() else { return };
				if reply.finished.load(Ordering::Acquire) {
					return;
				}
				let last_activity = *reply
					.last_activity
					.lock()
					.expect("reply activity lock poisoned");
				last_activity + window
			};

			sleep_until(deadline).await;

			let Some(reply) = this.upgrade() else { return };
			if reply.finished.load(Ordering::Acquire) {
				return;
			}

			let idle_for = {
				reply
					.last_activity
					.lock()
					.expect("reply activity lock poisoned")
					.elapsed()
			};

			if idle_for >= window {
				warn!("no activity on reply channel, reaping");
				reply
					.finished(CompletionDetails::with_message(
						CompletionStatus::Error,
						"no activity on reply channel: reply reaped",
					))
					.await;
				return;
			}
		}
	}

	/// Delivers one payload to the listener. Replies arriving after the
	/// terminal event are dropped; a payload the handler cannot decode
	/// finishes the query with an error.
	pub async fn push(&self, payload: VariantMap) {
		// Register as in-flight before checking the terminal flag. A finished()
		// that swaps the flag first will see this push in the counter and wait
		// for it; checking the flag first would let a payload slip through
		// behind the terminal event.
		self.in_flight.fetch_add(1, Ordering::AcqRel);

		if self.finished.load(Ordering::Acquire) {
			// Ignore replies that arrive after finished().
			if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
				self.idle.notify_waiters();
			}
			return;
		}

		self.touch();

		let result = self.handler.process(payload).await;

		let bound_reached = match &result {
			Ok(()) => {
				let delivered = self.delivered.fetch_add(1, Ordering::AcqRel) + 1;
				self.cardinality == Some(delivered)
			}
			Err(_) => false,
		};

		// Drop the in-flight count before potentially finishing, because
		// finished() waits for concurrent pushes to drain.
		if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.idle.notify_waiters();
		}

		match result {
			Err(e) => {
				self.finished(CompletionDetails::with_message(
					CompletionStatus::Error,
					format!("ReplyObject::push(): {e:#}"),
				))
				.await;
			}
			Ok(()) if bound_reached => {
				// The caller asked for at most this many results; to it, the
				// query simply finished.
				self.finished(CompletionDetails::new(CompletionStatus::Ok))
					.await;
			}
			Ok(()) => {}
		}
	}

	/// Exactly one call has effect; concurrent or late calls return quietly.
	pub async fn finished(&self, mut details: CompletionDetails) {
		// Guards the race between a down-stream query finishing naturally
		// and the ctrl forwarding a cancellation to this same reply.
		if self.finished.swap(true, Ordering::AcqRel) {
			return;
		}

		// Wait until all currently executing pushes have completed.
		loop {
			let notified = self.idle.notified();
			if self.in_flight.load(Ordering::Acquire) == 0 {
				break;
			}
			notified.await;
		}

		{
			let mut info_list = self.info_list.lock().expect("reply info lock poisoned");
			for info in info_list.drain(..) {
				details.add_info(info);
			}
		}

		self.handler.finished(details).await;

		// Last, because deregistration can drop this instance.
		self.disconnect.disconnect();
	}

	pub async fn info(&self, info: OperationInfo) {
		if self.finished.load(Ordering::Acquire) {
			trace!("info after finished, dropped");
			return;
		}

		self.touch();

		self.info_list
			.lock()
			.expect("reply info lock poisoned")
			.push(info.clone());

		self.handler.info(info).await;
	}

	fn touch(&self) {
		*self
			.last_activity
			.lock()
			.expect("reply activity lock poisoned") = Instant::now();
	}
}

impl Drop for ReplyObject {
	fn drop(&mut self) {
		// A reply dropped without a terminal event still owes its listener
		// exactly one finished. Skipped when no runtime is left to carry it
		// (process teardown).
		if !self.finished.swap(true, Ordering::AcqRel) {
			let Ok(handle) = Handle::try_current() else {
				return;
			};

			let handler = self.handler.clone();

			handle.spawn(
				async move {
					handler
						.finished(CompletionDetails::new(CompletionStatus::Ok))
						.await;
				}
				.in_current_span(),
			);
		}
	}
}

#[async_trait::async_trait]
impl Servant for ReplyObject {
	async fn dispatch(&self, request: Request, info: InvokeInfo) {
		match request {
			Request::Push(payload) => self.push(payload).await,
			Request::Finished(details) => self.finished(details).await,
			Request::Info(op_info) => self.info(op_info).await,
			other => warn!(
				identity = %info.identity,
				?other,
				"unexpected operation on reply servant"
			),
		}
	}

	fn disconnect_guard(&self) -> &Disconnect {
		&self.disconnect
	}
}
