//! The scope surface: the author-facing servant that accepts incoming
//! queries, and the caller-facing handle that issues them.

use std::{sync::Arc, time::Duration};

use tokio::{spawn, sync::oneshot};
use tracing::{error, instrument, warn, Instrument};

use crate::{
	completion::{CompletionDetails, CompletionStatus},
	error::MiddlewareError,
	listener::{ActivationListener, PreviewListener, SearchListener},
	metadata::{ActionMetadata, CannedQuery, SearchMetadata},
	middleware::{
		InvokeInfo, LocalMiddleware, QueryCtrlProxy, ReplyProxy, Request, ScopeProxy, Servant,
	},
	object::Disconnect,
	query::{ActivationQuery, PreviewQuery, QueryCtrl, QueryCtrlServant, QueryKind, QueryServant,
		SearchQuery},
	reply::ReplyObject,
	result::{ActivationResponse, ActivationStatus, ScopeResult},
};

/// Implemented by scope authors: factories that instantiate one query
/// object per incoming request. Factories run on the dispatch thread and
/// should be quick; the real work happens in the query's `run`.
pub trait ScopeBase: Send + Sync + 'static {
	fn search(
		&self,
		query: &CannedQuery,
		metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>>;

	fn preview(
		&self,
		result: &ScopeResult,
		metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>>;

	/// Optional; the default responds with `NotHandled`.
	fn activate(
		&self,
		result: &ScopeResult,
		metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn ActivationQuery>> {
		let _ = (result, metadata);
		Ok(Arc::new(NotHandledActivation))
	}
}

struct NotHandledActivation;

#[async_trait::async_trait]
impl ActivationQuery for NotHandledActivation {
	async fn activate(&self) -> anyhow::Result<ActivationResponse> {
		Ok(ActivationResponse::new(ActivationStatus::NotHandled))
	}
}

/// Callee-side dispatcher: builds the per-query servant pair for every
/// incoming search/preview/activate request and starts the query through
/// the middleware, never inline.
pub struct ScopeServant {
	base: Arc<dyn ScopeBase>,
	mw: LocalMiddleware,
	disconnect: Disconnect,
}

impl ScopeServant {
	#[must_use]
	pub fn new(base: Arc<dyn ScopeBase>, mw: LocalMiddleware) -> Arc<Self> {
		Arc::new(Self {
			base,
			mw,
			disconnect: Disconnect::new(),
		})
	}

	/// Wires one ctrl/query servant pair and triggers `run` via the
	/// middleware. The self-pin keeps the query servant alive until the run
	/// dispatch arrives, however briefly the proxies here live.
	async fn start_query(
		&self,
		kind: QueryKind,
		cardinality: Option<usize>,
		reply: ReplyProxy,
	) -> Result<QueryCtrlProxy, MiddlewareError> {
		let ctrl_servant = Arc::new(QueryCtrlServant::new());
		let ctrl_proxy = self.mw.add_query_ctrl_object(Arc::clone(&ctrl_servant));

		let query_servant = Arc::new(QueryServant::new(
			kind,
			cardinality,
			reply.clone(),
			ctrl_proxy.clone(),
		));
		let query_proxy = self.mw.add_query_object(Arc::clone(&query_servant));

		// The ctrl needs to find the running query on cancel; the query
		// pins itself until its run dispatch arrives.
		ctrl_servant.set_query(&query_servant);
		query_servant.set_self(Arc::clone(&query_servant));

		query_proxy.run(reply).await?;

		Ok(ctrl_proxy)
	}

	#[instrument(skip_all, fields(identity = %info.identity, operation = info.operation))]
	async fn handle_query(
		&self,
		kind: anyhow::Result<QueryKind>,
		cardinality: Option<usize>,
		reply: ReplyProxy,
		ack: oneshot::Sender<Result<QueryCtrlProxy, MiddlewareError>>,
		info: InvokeInfo,
	) {
		let kind = match kind {
			Ok(kind) => kind,
			Err(e) => {
				// A scope whose factory fails still owes the caller a single
				// terminal event, plus a failed two-way response.
				error!(%e, "scope query factory failed");

				let message = format!("scope query factory failed: {e:#}");
				reply
					.finished(CompletionDetails::with_message(
						CompletionStatus::Error,
						message.clone(),
					))
					.await;

				let _ = ack.send(Err(MiddlewareError::Dispatch(message)));
				return;
			}
		};

		let started = self.start_query(kind, cardinality, reply.clone()).await;

		if let Err(e) = &started {
			error!(%e, "failed to start query");
			reply
				.finished(CompletionDetails::with_message(
					CompletionStatus::Error,
					e.to_string(),
				))
				.await;
		}

		let _ = ack.send(started);
	}
}

#[async_trait::async_trait]
impl Servant for ScopeServant {
	async fn dispatch(&self, request: Request, info: InvokeInfo) {
		match request {
			Request::Search {
				query,
				metadata,
				reply,
				ack,
			} => {
				let kind = self
					.base
					.search(&query, &metadata)
					.map(QueryKind::Search);
				self.handle_query(kind, metadata.cardinality(), reply, ack, info)
					.await;
			}

			Request::Preview {
				result,
				metadata,
				reply,
				ack,
			} => {
				let kind = self
					.base
					.preview(&result, &metadata)
					.map(QueryKind::Preview);
				self.handle_query(kind, None, reply, ack, info).await;
			}

			Request::Activate {
				result,
				metadata,
				reply,
				ack,
			} => {
				let kind = self
					.base
					.activate(&result, &metadata)
					.map(QueryKind::Activation);
				self.handle_query(kind, None, reply, ack, info).await;
			}

			other => warn!(?other, "unexpected operation on scope servant"),
		}
	}

	fn disconnect_guard(&self) -> &Disconnect {
		&self.disconnect
	}
}

/// Caller-side handle to a remote scope.
///
/// The search/preview/activate calls return a [`QueryCtrl`] immediately;
/// the two-way request that creates the remote query runs asynchronously,
/// and a transport failure on that path is routed to the listener as a
/// single error completion.
#[derive(Debug, Clone)]
pub struct Scope {
	proxy: ScopeProxy,
	mw: LocalMiddleware,
	reap_window: Option<Duration>,
}

impl Scope {
	#[must_use]
	pub fn new(proxy: ScopeProxy, mw: LocalMiddleware) -> Self {
		Self {
			proxy,
			mw,
			reap_window: None,
		}
	}

	/// Replies idle for longer than `window` are force-finished with an
	/// error instead of stranding the listener.
	#[must_use]
	pub fn with_reap_window(mut self, window: Option<Duration>) -> Self {
		self.reap_window = window;
		self
	}

	#[must_use]
	pub fn identity(&self) -> &str {
		self.proxy.identity()
	}

	/// Starts a search. Fails synchronously when the scope is already
	/// unreachable, before any `QueryCtrl` exists.
	pub fn search(
		&self,
		query: CannedQuery,
		metadata: SearchMetadata,
		listener: Arc<dyn SearchListener>,
	) -> Result<QueryCtrl, MiddlewareError> {
		self.ensure_reachable()?;

		let reply_object =
			ReplyObject::for_search(listener, metadata.cardinality(), self.reap_window);

		self.start(reply_object, move |proxy, reply| async move {
			proxy.search(query, metadata, reply).await
		})
	}

	/// Requests a preview for one result.
	pub fn preview(
		&self,
		result: ScopeResult,
		metadata: ActionMetadata,
		listener: Arc<dyn PreviewListener>,
	) -> Result<QueryCtrl, MiddlewareError> {
		self.ensure_reachable()?;

		let reply_object = ReplyObject::for_preview(listener, self.reap_window);

		self.start(reply_object, move |proxy, reply| async move {
			proxy.preview(result, metadata, reply).await
		})
	}

	/// Activates one result.
	pub fn activate(
		&self,
		result: ScopeResult,
		metadata: ActionMetadata,
		listener: Arc<dyn ActivationListener>,
	) -> Result<QueryCtrl, MiddlewareError> {
		self.ensure_reachable()?;

		let reply_object = ReplyObject::for_activation(listener, self.reap_window);

		self.start(reply_object, move |proxy, reply| async move {
			proxy.activate(result, metadata, reply).await
		})
	}

	fn ensure_reachable(&self) -> Result<(), MiddlewareError> {
		if self.proxy.is_gone() {
			return Err(MiddlewareError::ObjectGone(
				self.proxy.identity().to_string(),
			));
		}
		Ok(())
	}

	fn start<F, Fut>(
		&self,
		reply_object: Arc<ReplyObject>,
		invoke: F,
	) -> Result<QueryCtrl, MiddlewareError>
	where
		F: FnOnce(ScopeProxy, ReplyProxy) -> Fut + Send + 'static,
		Fut: std::future::Future<Output = Result<QueryCtrlProxy, MiddlewareError>> + Send,
	{
		let reply_proxy = self.mw.add_reply_object(Arc::clone(&reply_object));
		reply_object.arm_reaper();

		let ctrl = QueryCtrl::new(reply_proxy.clone());

		// The two-way request must not block the caller; errors on this
		// path surface to the listener as the query's terminal event.
		spawn({
			let proxy = self.proxy.clone();
			let ctrl = ctrl.clone();

			async move {
				match invoke(proxy, reply_proxy).await {
					Ok(remote_ctrl) => ctrl.set_proxy(remote_ctrl).await,
					Err(e) => {
						reply_object
							.finished(CompletionDetails::with_message(
								CompletionStatus::Error,
								e.to_string(),
							))
							.await;
					}
				}
			}
			.in_current_span()
		});

		Ok(ctrl)
	}
}
