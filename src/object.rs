//! Per-servant disconnect contract.
//!
//! Every remote-callable object is handed a disconnect hook by the adapter
//! that registered it. `disconnect()` fires the hook exactly once; racing
//! callers (a cancel path and the reaper, say) all return quietly.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Mutex,
};

use tracing::trace;

type Hook = Box<dyn FnOnce() + Send>;

/// Exactly-once deregistration guard shared by all servants.
#[derive(Default)]
pub struct Disconnect {
	fired: AtomicBool,
	hook: Mutex<Option<Hook>>,
}

impl Disconnect {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Installed by the adapter when the servant is registered.
	pub(crate) fn arm(&self, hook: Hook) {
		let mut guard = self.hook.lock().expect("disconnect hook lock poisoned");
		debug_assert!(guard.is_none(), "disconnect hook armed twice");
		*guard = Some(hook);
	}

	/// Deregisters the servant from its adapter. Only the first call has any
	/// effect; a call racing with the adapter's own removal is benign.
	pub fn disconnect(&self) {
		if self.fired.swap(true, Ordering::AcqRel) {
			return;
		}

		let hook = self
			.hook
			.lock()
			.expect("disconnect hook lock poisoned")
			.take();

		match hook {
			Some(hook) => hook(),
			None => trace!("disconnect() called on a servant that was never registered"),
		}
	}
}

impl std::fmt::Debug for Disconnect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Disconnect")
			.field("fired", &self.fired.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}
