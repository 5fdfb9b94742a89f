//! Scope registry: the callee-side table of known scopes plus the caller's
//! lookup handle.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::oneshot;
use tracing::{instrument, trace, warn};

use crate::{
	error::RegistryError,
	metadata::{MetadataMap, ScopeMetadata, ScopeState},
	middleware::{InvokeInfo, LocalMiddleware, RegistryProxy, Request, ScopeProxy, Servant},
	object::Disconnect,
	scope::Scope,
};

pub type ScopeStateCallback = Arc<dyn Fn(ScopeState) + Send + Sync>;
pub type ListUpdateCallback = Arc<dyn Fn() + Send + Sync>;

struct RegisteredScope {
	metadata: ScopeMetadata,
	proxy: ScopeProxy,
}

#[derive(Default)]
struct RegistryState {
	scopes: HashMap<String, RegisteredScope>,
	state_callbacks: HashMap<String, Vec<ScopeStateCallback>>,
	list_update_callback: Option<ListUpdateCallback>,
}

/// Authoritative scope table. Mutations are synchronous; lookups also arrive
/// through the middleware as dispatched requests.
pub struct RegistryObject {
	state: std::sync::Mutex<RegistryState>,
	disconnect: Disconnect,
}

impl RegistryObject {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: std::sync::Mutex::new(RegistryState::default()),
			disconnect: Disconnect::new(),
		})
	}

	/// Registers or replaces a scope. Returns `true` when the id was new,
	/// `false` when an existing entry was replaced.
	#[instrument(skip_all, fields(scope_id = tracing::field::Empty))]
	pub fn add(
		&self,
		scope_id: impl Into<String>,
		metadata: ScopeMetadata,
		proxy: ScopeProxy,
	) -> Result<bool, RegistryError> {
		let scope_id = scope_id.into();
		tracing::Span::current().record("scope_id", scope_id.as_str());

		Self::validate_id(&scope_id)?;

		let (is_new, list_update) = {
			let mut state = self.state.lock().expect("registry state lock poisoned");
			let is_new = state
				.scopes
				.insert(scope_id.clone(), RegisteredScope { metadata, proxy })
				.is_none();

			(is_new, state.list_update_callback.clone())
		};

		if is_new {
			trace!("scope registered");
		} else {
			warn!("scope replaced an existing registration");
		}

		// Fired outside the lock; a callback may call back into the registry.
		if let Some(callback) = list_update {
			callback();
		}

		Ok(is_new)
	}

	/// Removes a scope. Returns `true` when an entry existed.
	#[instrument(skip(self))]
	pub fn remove(&self, scope_id: &str) -> Result<bool, RegistryError> {
		Self::validate_id(scope_id)?;

		let (removed, list_update) = {
			let mut state = self.state.lock().expect("registry state lock poisoned");
			let removed = state.scopes.remove(scope_id).is_some();
			state.state_callbacks.remove(scope_id);

			(removed, removed.then(|| state.list_update_callback.clone()).flatten())
		};

		if let Some(callback) = list_update {
			callback();
		}

		Ok(removed)
	}

	pub fn get_metadata(&self, scope_id: &str) -> Result<ScopeMetadata, RegistryError> {
		Self::validate_id(scope_id)?;

		self.state
			.lock()
			.expect("registry state lock poisoned")
			.scopes
			.get(scope_id)
			.map(|scope| scope.metadata.clone())
			.ok_or_else(|| RegistryError::NotFound(scope_id.to_string()))
	}

	#[must_use]
	pub fn list(&self) -> MetadataMap {
		self.state
			.lock()
			.expect("registry state lock poisoned")
			.scopes
			.iter()
			.map(|(id, scope)| (id.clone(), scope.metadata.clone()))
			.collect()
	}

	pub fn locate(&self, scope_id: &str) -> Result<ScopeProxy, RegistryError> {
		Self::validate_id(scope_id)?;

		self.state
			.lock()
			.expect("registry state lock poisoned")
			.scopes
			.get(scope_id)
			.map(|scope| scope.proxy.clone())
			.ok_or_else(|| RegistryError::NotFound(scope_id.to_string()))
	}

	/// Subscribes to liveness changes for one scope id. Multiple callbacks
	/// per id are allowed and all fire.
	pub fn set_scope_state_callback(&self, scope_id: impl Into<String>, callback: ScopeStateCallback) {
		self.state
			.lock()
			.expect("registry state lock poisoned")
			.state_callbacks
			.entry(scope_id.into())
			.or_default()
			.push(callback);
	}

	/// Subscribes to additions and removals in the scope table.
	pub fn set_list_update_callback(&self, callback: ListUpdateCallback) {
		self.state
			.lock()
			.expect("registry state lock poisoned")
			.list_update_callback = Some(callback);
	}

	/// Publishes a liveness change to subscribers. Unknown ids are ignored
	/// so a late state report from a removed scope is harmless.
	#[instrument(skip(self))]
	pub fn push_state(&self, scope_id: &str, state: ScopeState) {
		let callbacks = {
			let registry = self.state.lock().expect("registry state lock poisoned");
			registry
				.state_callbacks
				.get(scope_id)
				.cloned()
				.unwrap_or_default()
		};

		trace!(?state, subscribers = callbacks.len(), "scope state change");

		for callback in callbacks {
			callback(state);
		}
	}

	fn validate_id(scope_id: &str) -> Result<(), RegistryError> {
		if scope_id.is_empty() {
			return Err(RegistryError::EmptyId);
		}
		if scope_id.contains('/') {
			return Err(RegistryError::InvalidId(scope_id.to_string()));
		}
		Ok(())
	}

	fn answer<T>(ack: oneshot::Sender<T>, value: T, info: &InvokeInfo) {
		if ack.send(value).is_err() {
			trace!(
				identity = %info.identity,
				operation = info.operation,
				"registry caller went away before the response"
			);
		}
	}
}

#[async_trait::async_trait]
impl Servant for RegistryObject {
	async fn dispatch(&self, request: Request, info: InvokeInfo) {
		match request {
			Request::GetMetadata { scope_id, ack } => {
				Self::answer(ack, self.get_metadata(&scope_id), &info);
			}
			Request::List { ack } => {
				Self::answer(ack, self.list(), &info);
			}
			Request::Locate { scope_id, ack } => {
				Self::answer(ack, self.locate(&scope_id), &info);
			}
			other => warn!(?other, "unexpected operation on registry servant"),
		}
	}

	fn disconnect_guard(&self) -> &Disconnect {
		&self.disconnect
	}
}

/// Caller-side handle to the registry.
#[derive(Clone)]
pub struct Registry {
	proxy: RegistryProxy,
	mw: LocalMiddleware,
	reap_window: Option<Duration>,
}

impl Registry {
	#[must_use]
	pub fn new(proxy: RegistryProxy, mw: LocalMiddleware) -> Self {
		Self {
			proxy,
			mw,
			reap_window: None,
		}
	}

	/// Reap window applied to every [`Scope`] handle this registry hands out.
	#[must_use]
	pub fn with_reap_window(mut self, window: Option<Duration>) -> Self {
		self.reap_window = window;
		self
	}

	/// Resolves a scope id to a usable [`Scope`] handle.
	pub async fn find(&self, scope_id: &str) -> Result<Scope, RegistryError> {
		let proxy = self.proxy.locate(scope_id.to_string()).await?;

		Ok(Scope::new(proxy, self.mw.clone()).with_reap_window(self.reap_window))
	}

	pub async fn get_metadata(&self, scope_id: &str) -> Result<ScopeMetadata, RegistryError> {
		self.proxy.get_metadata(scope_id.to_string()).await
	}

	pub async fn list(&self) -> Result<MetadataMap, RegistryError> {
		Ok(self.proxy.list().await?)
	}
}
