//! Recording listeners: capture everything a query delivers so tests can
//! assert on ordering, payloads, and the single terminal event.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scopes_rpc::{
	ActivationListener, ActivationResponse, CompletionDetails, OperationInfo, PreviewListener,
	ScopeResult, SearchListener, Variant,
};
use tokio::sync::Notify;

pub struct SearchRecorder {
	results: Mutex<Vec<ScopeResult>>,
	infos: Mutex<Vec<OperationInfo>>,
	finishes: Mutex<Vec<CompletionDetails>>,
	done: Notify,
}

impl SearchRecorder {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			results: Mutex::new(Vec::new()),
			infos: Mutex::new(Vec::new()),
			finishes: Mutex::new(Vec::new()),
			done: Notify::new(),
		})
	}

	pub fn titles(&self) -> Vec<String> {
		self.results
			.lock()
			.unwrap()
			.iter()
			.map(|result| result.title().to_string())
			.collect()
	}

	pub fn result_count(&self) -> usize {
		self.results.lock().unwrap().len()
	}

	pub fn infos(&self) -> Vec<OperationInfo> {
		self.infos.lock().unwrap().clone()
	}

	pub fn finish_count(&self) -> usize {
		self.finishes.lock().unwrap().len()
	}

	/// Blocks until the terminal event arrives, then returns it.
	pub async fn wait_finished(&self) -> CompletionDetails {
		loop {
			let notified = self.done.notified();
			if let Some(details) = self.finishes.lock().unwrap().first().cloned() {
				return details;
			}
			notified.await;
		}
	}
}

#[async_trait]
impl SearchListener for SearchRecorder {
	async fn push(&self, result: ScopeResult) {
		self.results.lock().unwrap().push(result);
	}

	async fn info(&self, info: OperationInfo) {
		self.infos.lock().unwrap().push(info);
	}

	async fn finished(&self, details: CompletionDetails) {
		self.finishes.lock().unwrap().push(details);
		self.done.notify_waiters();
	}
}

/// What a reply channel delivered, in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyEvent {
	Push,
	Finished,
}

/// Flat ordered log of everything the listener saw, for interleaving checks.
pub struct EventLogListener {
	events: Mutex<Vec<ReplyEvent>>,
}

impl EventLogListener {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			events: Mutex::new(Vec::new()),
		})
	}

	pub fn events(&self) -> Vec<ReplyEvent> {
		self.events.lock().unwrap().clone()
	}
}

#[async_trait]
impl SearchListener for EventLogListener {
	async fn push(&self, _result: ScopeResult) {
		self.events.lock().unwrap().push(ReplyEvent::Push);
	}

	async fn finished(&self, _details: CompletionDetails) {
		self.events.lock().unwrap().push(ReplyEvent::Finished);
	}
}

pub struct PreviewRecorder {
	widgets: Mutex<Vec<Vec<Variant>>>,
	finishes: Mutex<Vec<CompletionDetails>>,
	done: Notify,
}

impl PreviewRecorder {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			widgets: Mutex::new(Vec::new()),
			finishes: Mutex::new(Vec::new()),
			done: Notify::new(),
		})
	}

	pub fn widget_batches(&self) -> Vec<Vec<Variant>> {
		self.widgets.lock().unwrap().clone()
	}

	pub fn finish_count(&self) -> usize {
		self.finishes.lock().unwrap().len()
	}

	pub async fn wait_finished(&self) -> CompletionDetails {
		loop {
			let notified = self.done.notified();
			if let Some(details) = self.finishes.lock().unwrap().first().cloned() {
				return details;
			}
			notified.await;
		}
	}
}

#[async_trait]
impl PreviewListener for PreviewRecorder {
	async fn push_widgets(&self, widgets: Vec<Variant>) {
		self.widgets.lock().unwrap().push(widgets);
	}

	async fn finished(&self, details: CompletionDetails) {
		self.finishes.lock().unwrap().push(details);
		self.done.notify_waiters();
	}
}

pub struct ActivationRecorder {
	responses: Mutex<Vec<ActivationResponse>>,
	finishes: Mutex<Vec<CompletionDetails>>,
	done: Notify,
}

impl ActivationRecorder {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(Vec::new()),
			finishes: Mutex::new(Vec::new()),
			done: Notify::new(),
		})
	}

	pub fn responses(&self) -> Vec<ActivationResponse> {
		self.responses.lock().unwrap().clone()
	}

	pub fn finish_count(&self) -> usize {
		self.finishes.lock().unwrap().len()
	}

	pub async fn wait_finished(&self) -> CompletionDetails {
		loop {
			let notified = self.done.notified();
			if let Some(details) = self.finishes.lock().unwrap().first().cloned() {
				return details;
			}
			notified.await;
		}
	}
}

#[async_trait]
impl ActivationListener for ActivationRecorder {
	async fn activated(&self, response: ActivationResponse) {
		self.responses.lock().unwrap().push(response);
	}

	async fn finished(&self, details: CompletionDetails) {
		self.finishes.lock().unwrap().push(details);
		self.done.notify_waiters();
	}
}
