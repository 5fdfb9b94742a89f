//! Process-level runtime: owns the middleware instance and the registry,
//! and wires scope implementations into both.

use std::{sync::Arc, time::Duration};

use tracing::{instrument, trace};

use crate::{
	error::RegistryError,
	metadata::{ScopeMetadata, ScopeState},
	middleware::{LocalMiddleware, RegistryProxy, ScopeProxy},
	registry::{Registry, RegistryObject},
	scope::{ScopeBase, ScopeServant},
};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
	/// Name of the object adapter all servants attach to.
	pub adapter_name: String,
	/// Inactivity window after which caller-side replies are force-finished.
	/// `None` disables the watchdog.
	pub reply_reap_window: Option<Duration>,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			adapter_name: "scopes".to_string(),
			reply_reap_window: None,
		}
	}
}

/// One runtime per process. Registered scopes share the runtime's middleware,
/// so callers obtained from [`Runtime::registry`] can reach them directly.
pub struct Runtime {
	mw: LocalMiddleware,
	config: RuntimeConfig,
	registry_object: Arc<RegistryObject>,
	registry_proxy: RegistryProxy,
}

impl Runtime {
	#[must_use]
	pub fn new() -> Self {
		Self::with_config(RuntimeConfig::default())
	}

	#[must_use]
	pub fn with_config(config: RuntimeConfig) -> Self {
		let mw = LocalMiddleware::new(&config.adapter_name);

		let registry_object = RegistryObject::new();
		let registry_proxy = mw.add_registry_object(Arc::clone(&registry_object));

		Self {
			mw,
			config,
			registry_object,
			registry_proxy,
		}
	}

	#[must_use]
	pub fn middleware(&self) -> &LocalMiddleware {
		&self.mw
	}

	/// Caller-side registry handle.
	#[must_use]
	pub fn registry(&self) -> Registry {
		Registry::new(self.registry_proxy.clone(), self.mw.clone())
			.with_reap_window(self.config.reply_reap_window)
	}

	/// Direct access to the registry servant, for subscriptions and state
	/// publication that stay on this side of the boundary.
	#[must_use]
	pub fn registry_object(&self) -> &Arc<RegistryObject> {
		&self.registry_object
	}

	/// Attaches a scope implementation to the middleware and records it in
	/// the registry as running.
	#[instrument(skip(self, metadata, base), fields(scope_id = metadata.scope_id()))]
	pub fn register_scope(
		&self,
		metadata: ScopeMetadata,
		base: Arc<dyn ScopeBase>,
	) -> Result<ScopeProxy, RegistryError> {
		let scope_id = metadata.scope_id().to_string();

		let servant = ScopeServant::new(base, self.mw.clone());
		let proxy = self.mw.add_scope_object(servant);

		self.registry_object
			.add(scope_id.clone(), metadata, proxy.clone())?;
		self.registry_object
			.push_state(&scope_id, ScopeState::Running);

		trace!("scope attached");

		Ok(proxy)
	}

	/// Removes a scope from the registry. In-flight queries keep running;
	/// only new lookups stop resolving.
	pub fn unregister_scope(&self, scope_id: &str) -> Result<bool, RegistryError> {
		self.registry_object
			.push_state(scope_id, ScopeState::Stopped);
		self.registry_object.remove(scope_id)
	}

	/// Closes every servant queue. Queued requests drain; new sends fail with
	/// an unreachable-object error.
	pub fn shutdown(&self) {
		self.mw.shutdown();
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}
