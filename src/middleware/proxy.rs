//! Proxy handles for remote-callable objects.
//!
//! A proxy is one concrete struct: an opaque send handle into the target
//! servant's dispatch queue plus the servant's identity. Capabilities
//! (query, ctrl, reply, scope, registry) are expressed as thin newtypes over
//! it rather than an inheritance lattice.

use async_channel as chan;
use tokio::sync::oneshot;
use tracing::trace;

use crate::{
	completion::{CompletionDetails, OperationInfo},
	error::{MiddlewareError, RegistryError},
	metadata::{ActionMetadata, CannedQuery, MetadataMap, ScopeMetadata, SearchMetadata},
	result::ScopeResult,
	variant::VariantMap,
};

use super::message::Request;

/// The one concrete proxy: identity plus transport handle.
#[derive(Debug, Clone)]
pub struct ObjectProxy {
	identity: String,
	tx: chan::Sender<Request>,
}

impl ObjectProxy {
	pub(crate) fn new(identity: String, tx: chan::Sender<Request>) -> Self {
		Self { identity, tx }
	}

	#[must_use]
	pub fn identity(&self) -> &str {
		&self.identity
	}

	/// True once the target servant has been disconnected from its adapter.
	#[must_use]
	pub fn is_gone(&self) -> bool {
		self.tx.is_closed()
	}

	/// One-way send. Queue admission never blocks beyond the channel lock;
	/// delivery order per proxy target is preserved.
	pub(crate) async fn send_oneway(&self, request: Request) -> Result<(), MiddlewareError> {
		self.tx
			.send(request)
			.await
			.map_err(|_| MiddlewareError::ObjectGone(self.identity.clone()))
	}

	/// Two-way send: queues the request and waits for the servant's ack.
	pub(crate) async fn invoke<T>(
		&self,
		request: Request,
		rx: oneshot::Receiver<T>,
	) -> Result<T, MiddlewareError> {
		self.send_oneway(request).await?;
		rx.await
			.map_err(|_| MiddlewareError::InvokeDropped(self.identity.clone()))
	}
}

/// Cancellation handle for one in-flight query, servant side of the pair.
#[derive(Debug, Clone)]
pub struct QueryCtrlProxy(pub(crate) ObjectProxy);

impl QueryCtrlProxy {
	#[must_use]
	pub fn identity(&self) -> &str {
		self.0.identity()
	}

	/// One-way; a ctrl that is already gone is a benign race with completion.
	pub async fn cancel(&self) {
		if let Err(e) = self.0.send_oneway(Request::Cancel).await {
			trace!(%e, "cancel after ctrl disconnect, ignored");
		}
	}

	/// One-way; detaches the ctrl servant without touching the query.
	pub async fn destroy(&self) {
		if let Err(e) = self.0.send_oneway(Request::Destroy).await {
			trace!(%e, "destroy after ctrl disconnect, ignored");
		}
	}
}

/// Handle used by the query side to start the remote query execution.
#[derive(Debug, Clone)]
pub struct QueryProxy(pub(crate) ObjectProxy);

impl QueryProxy {
	pub(crate) async fn run(&self, reply: ReplyProxy) -> Result<(), MiddlewareError> {
		self.0.send_oneway(Request::Run { reply }).await
	}
}

/// The channel over which payloads and the terminal event flow back to the
/// original caller. All operations are one-way.
#[derive(Debug, Clone)]
pub struct ReplyProxy(pub(crate) ObjectProxy);

impl ReplyProxy {
	#[must_use]
	pub fn identity(&self) -> &str {
		self.0.identity()
	}

	/// Fails once the receiving reply object has been disconnected; the
	/// servant side treats that as the back-pressure signal to stop pushing.
	pub async fn push(&self, payload: VariantMap) -> Result<(), MiddlewareError> {
		self.0.send_oneway(Request::Push(payload)).await
	}

	pub async fn finished(&self, details: CompletionDetails) {
		if let Err(e) = self.0.send_oneway(Request::Finished(details)).await {
			trace!(%e, "finished after reply disconnect, ignored");
		}
	}

	pub async fn info(&self, info: OperationInfo) {
		if let Err(e) = self.0.send_oneway(Request::Info(info)).await {
			trace!(%e, "info after reply disconnect, ignored");
		}
	}
}

/// Remote scope handle: issues search/preview/activate as two-way requests.
#[derive(Debug, Clone)]
pub struct ScopeProxy(pub(crate) ObjectProxy);

impl ScopeProxy {
	#[must_use]
	pub fn identity(&self) -> &str {
		self.0.identity()
	}

	#[must_use]
	pub fn is_gone(&self) -> bool {
		self.0.is_gone()
	}

	pub(crate) async fn search(
		&self,
		query: CannedQuery,
		metadata: SearchMetadata,
		reply: ReplyProxy,
	) -> Result<QueryCtrlProxy, MiddlewareError> {
		let (ack, rx) = oneshot::channel();
		self.0
			.invoke(
				Request::Search {
					query,
					metadata,
					reply,
					ack,
				},
				rx,
			)
			.await?
	}

	pub(crate) async fn preview(
		&self,
		result: ScopeResult,
		metadata: ActionMetadata,
		reply: ReplyProxy,
	) -> Result<QueryCtrlProxy, MiddlewareError> {
		let (ack, rx) = oneshot::channel();
		self.0
			.invoke(
				Request::Preview {
					result,
					metadata,
					reply,
					ack,
				},
				rx,
			)
			.await?
	}

	pub(crate) async fn activate(
		&self,
		result: ScopeResult,
		metadata: ActionMetadata,
		reply: ReplyProxy,
	) -> Result<QueryCtrlProxy, MiddlewareError> {
		let (ack, rx) = oneshot::channel();
		self.0
			.invoke(
				Request::Activate {
					result,
					metadata,
					reply,
					ack,
				},
				rx,
			)
			.await?
	}
}

/// Remote registry handle.
#[derive(Debug, Clone)]
pub struct RegistryProxy(pub(crate) ObjectProxy);

impl RegistryProxy {
	pub(crate) async fn get_metadata(
		&self,
		scope_id: String,
	) -> Result<ScopeMetadata, RegistryError> {
		let (ack, rx) = oneshot::channel();
		self.0
			.invoke(Request::GetMetadata { scope_id, ack }, rx)
			.await?
	}

	pub(crate) async fn list(&self) -> Result<MetadataMap, MiddlewareError> {
		let (ack, rx) = oneshot::channel();
		self.0.invoke(Request::List { ack }, rx).await
	}

	pub(crate) async fn locate(&self, scope_id: String) -> Result<ScopeProxy, RegistryError> {
		let (ack, rx) = oneshot::channel();
		self.0.invoke(Request::Locate { scope_id, ack }, rx).await?
	}
}
