//! In-process middleware: the transport collaborator reduced to what this
//! protocol core needs. One-way and two-way requests are queued per servant
//! and dispatched in order on the runtime's worker threads; a real wire
//! transport would sit behind the same surface.

use std::sync::Arc;

use uuid::Uuid;

mod adapter;
mod message;
mod proxy;

pub(crate) use adapter::{ObjectAdapter, Servant};
pub(crate) use message::Request;
pub use proxy::{ObjectProxy, QueryCtrlProxy, QueryProxy, RegistryProxy, ReplyProxy, ScopeProxy};

use crate::{
	query::{QueryCtrlServant, QueryServant},
	registry::RegistryObject,
	reply::ReplyObject,
	scope::ScopeServant,
};

/// Context passed into every servant dispatch.
#[derive(Debug, Clone)]
pub struct InvokeInfo {
	pub identity: String,
	pub operation: &'static str,
}

/// One middleware instance. Caller and callee sides each run one (tests may
/// share a single instance, which collapses the process boundary without
/// changing any protocol semantics).
#[derive(Debug, Clone)]
pub struct LocalMiddleware {
	adapter: ObjectAdapter,
}

impl LocalMiddleware {
	#[must_use]
	pub fn new(name: &str) -> Self {
		Self {
			adapter: ObjectAdapter::new(name),
		}
	}

	fn mint_identity(kind: &str) -> String {
		format!("{kind}-{}", Uuid::new_v4())
	}

	pub(crate) fn add_query_object(&self, servant: Arc<QueryServant>) -> QueryProxy {
		QueryProxy(
			self.adapter
				.add(Self::mint_identity("query"), servant),
		)
	}

	pub(crate) fn add_query_ctrl_object(&self, servant: Arc<QueryCtrlServant>) -> QueryCtrlProxy {
		QueryCtrlProxy(
			self.adapter
				.add(Self::mint_identity("query-ctrl"), servant),
		)
	}

	/// Registers a caller-side reply object and returns the proxy handed to
	/// the remote scope.
	pub fn add_reply_object(&self, servant: Arc<ReplyObject>) -> ReplyProxy {
		ReplyProxy(
			self.adapter
				.add(Self::mint_identity("reply"), servant),
		)
	}

	pub fn add_scope_object(&self, servant: Arc<ScopeServant>) -> ScopeProxy {
		ScopeProxy(
			self.adapter
				.add(Self::mint_identity("scope"), servant),
		)
	}

	pub fn add_registry_object(&self, servant: Arc<RegistryObject>) -> RegistryProxy {
		RegistryProxy(
			self.adapter
				.add(Self::mint_identity("registry"), servant),
		)
	}

	/// Closes every servant queue; queued requests still drain.
	pub fn shutdown(&self) {
		self.adapter.shutdown();
	}
}
