use std::{
	collections::HashMap,
	pin::pin,
	sync::{Arc, Mutex},
};

use async_channel as chan;
use futures::StreamExt;
use tokio::spawn;
use tracing::{instrument, trace, warn, Instrument};

use super::{message::Request, proxy::ObjectProxy, InvokeInfo};
use crate::object::Disconnect;

/// A servant is the callee-side object behind a proxy. The adapter drives it
/// with every request queued against its identity, in queue order; distinct
/// servants dispatch concurrently on the runtime's worker threads.
#[async_trait::async_trait]
pub(crate) trait Servant: Send + Sync + 'static {
	async fn dispatch(&self, request: Request, info: InvokeInfo);

	/// The servant's disconnect guard, armed by the adapter on registration.
	fn disconnect_guard(&self) -> &Disconnect;
}

/// Servant table plus the per-servant dispatch queues.
///
/// `add` wires three things together: the table entry, a spawned dispatch
/// loop that consumes the servant's queue in order, and the servant's
/// [`Disconnect`] hook, which removes the table entry and closes the queue.
/// Requests already queued at disconnect time still drain, matching the
/// at-most-once delivery the transport guarantees per accepted request.
#[derive(Debug, Clone)]
pub(crate) struct ObjectAdapter {
	name: Arc<str>,
	servants: Arc<Mutex<HashMap<String, chan::Sender<Request>>>>,
}

impl ObjectAdapter {
	pub(crate) fn new(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			servants: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	#[instrument(skip(self, servant), fields(adapter = %self.name))]
	pub(crate) fn add(&self, identity: String, servant: Arc<dyn Servant>) -> ObjectProxy {
		let (tx, rx) = chan::unbounded();

		self.servants
			.lock()
			.expect("servant table lock poisoned")
			.insert(identity.clone(), tx.clone());

		servant.disconnect_guard().arm(Box::new({
			let servants = Arc::clone(&self.servants);
			let identity = identity.clone();
			let tx = tx.clone();

			move || {
				if servants
					.lock()
					.expect("servant table lock poisoned")
					.remove(&identity)
					.is_none()
				{
					// Benign race with adapter shutdown or a concurrent reap.
					trace!(%identity, "servant already removed from table");
				}
				tx.close();
			}
		}));

		spawn(
			Self::dispatch_loop(identity.clone(), servant, rx).in_current_span(),
		);

		ObjectProxy::new(identity, tx)
	}

	async fn dispatch_loop(
		identity: String,
		servant: Arc<dyn Servant>,
		rx: chan::Receiver<Request>,
	) {
		trace!(%identity, "servant dispatch loop starting");

		let mut requests = pin!(rx);
		while let Some(request) = requests.next().await {
			let operation = request.operation();
			servant
				.dispatch(
					request,
					InvokeInfo {
						identity: identity.clone(),
						operation,
					},
				)
				.await;
		}

		trace!(%identity, "servant dispatch loop drained");
	}

	/// Closes every servant queue. Queued requests still drain.
	pub(crate) fn shutdown(&self) {
		let senders = {
			let mut guard = self.servants.lock().expect("servant table lock poisoned");
			guard.drain().collect::<Vec<_>>()
		};

		if !senders.is_empty() {
			warn!(
				adapter = %self.name,
				servants = senders.len(),
				"adapter shutting down with live servants"
			);
		}

		for (_identity, tx) in senders {
			tx.close();
		}
	}
}
