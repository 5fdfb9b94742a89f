//! Sample scope implementations exercising the different protocol paths.

use std::sync::{
	atomic::{AtomicBool, AtomicUsize, Ordering},
	Arc,
};

use async_trait::async_trait;
use scopes_rpc::{
	ActionMetadata, ActivationQuery, ActivationResponse, ActivationStatus, CannedQuery, InfoCode,
	OperationInfo, PreviewQuery, PreviewReply, ScopeBase, ScopeResult, SearchMetadata,
	SearchQuery, SearchReply,
};
use serde_json::json;
use tokio::sync::Notify;
use tracing::info;

/// Produces `total` results and returns, relying on the implicit finish.
/// `pushed` counts the pushes the reply channel accepted.
pub struct StreamScope {
	pub total: usize,
	pub pushed: Arc<AtomicUsize>,
}

impl StreamScope {
	pub fn new(total: usize) -> Self {
		Self {
			total,
			pushed: Arc::default(),
		}
	}
}

impl ScopeBase for StreamScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		Ok(Arc::new(StreamQuery {
			total: self.total,
			pushed: Arc::clone(&self.pushed),
		}))
	}

	fn preview(
		&self,
		result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		Ok(Arc::new(HeaderPreview {
			title: result.title().to_string(),
		}))
	}
}

struct StreamQuery {
	total: usize,
	pushed: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchQuery for StreamQuery {
	async fn run(&self, reply: SearchReply) -> anyhow::Result<()> {
		for i in 0..self.total {
			if !reply
				.push(ScopeResult::new(format!("test:///{i}"), format!("result {i}")))
				.await
			{
				info!(pushed = i, "reply channel closed, stopping");
				break;
			}
			self.pushed.fetch_add(1, Ordering::AcqRel);
		}
		Ok(())
	}
}

struct HeaderPreview {
	title: String,
}

#[async_trait]
impl PreviewQuery for HeaderPreview {
	async fn run(&self, reply: PreviewReply) -> anyhow::Result<()> {
		reply
			.push_widgets(vec![json!({ "type": "header", "title": self.title })])
			.await;
		Ok(())
	}
}

/// Pushes results at a fixed interval, slow enough that a short inactivity
/// watchdog would notice any stall.
pub struct SlowScope {
	pub total: usize,
	pub interval: std::time::Duration,
}

impl ScopeBase for SlowScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		Ok(Arc::new(SlowQuery {
			total: self.total,
			interval: self.interval,
		}))
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("slow scope has no previews")
	}
}

struct SlowQuery {
	total: usize,
	interval: std::time::Duration,
}

#[async_trait]
impl SearchQuery for SlowQuery {
	async fn run(&self, reply: SearchReply) -> anyhow::Result<()> {
		for i in 0..self.total {
			tokio::time::sleep(self.interval).await;
			if !reply
				.push(ScopeResult::new(format!("test:///{i}"), format!("result {i}")))
				.await
			{
				break;
			}
		}
		Ok(())
	}
}

/// Never finishes on its own; tests poke `release` or cancel. Observed
/// cancellations are recorded in `cancelled`.
pub struct HangingScope {
	pub cancelled: Arc<AtomicBool>,
	pub release: Arc<Notify>,
}

impl HangingScope {
	pub fn new() -> Self {
		Self {
			cancelled: Arc::default(),
			release: Arc::new(Notify::new()),
		}
	}
}

impl ScopeBase for HangingScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		Ok(Arc::new(HangingQuery {
			cancelled: Arc::clone(&self.cancelled),
			release: Arc::clone(&self.release),
		}))
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("hanging scope has no previews")
	}
}

struct HangingQuery {
	cancelled: Arc<AtomicBool>,
	release: Arc<Notify>,
}

#[async_trait]
impl SearchQuery for HangingQuery {
	async fn run(&self, _reply: SearchReply) -> anyhow::Result<()> {
		let released = self.release.notified();
		tokio::pin!(released);

		// Register with the notifier before checking the flag, so a
		// notify_waiters racing with this setup cannot be missed.
		released.as_mut().enable();
		if self.cancelled.load(Ordering::Acquire) {
			return Ok(());
		}
		released.await;
		Ok(())
	}

	fn cancelled(&self) {
		info!("hanging query observed its cancellation");
		self.cancelled.store(true, Ordering::Release);
		self.release.notify_waiters();
	}
}

/// Factories that always fail.
pub struct FaultyScope;

impl ScopeBase for FaultyScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		anyhow::bail!("search backend unavailable")
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("preview backend unavailable")
	}
}

/// Factory succeeds, `run` fails.
pub struct ErroringScope;

impl ScopeBase for ErroringScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		Ok(Arc::new(ErroringQuery))
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("erroring scope has no previews")
	}
}

struct ErroringQuery;

#[async_trait]
impl SearchQuery for ErroringQuery {
	async fn run(&self, reply: SearchReply) -> anyhow::Result<()> {
		reply
			.push(ScopeResult::new("test:///before-error", "before error"))
			.await;
		anyhow::bail!("index corrupted")
	}
}

/// Reports a diagnostic before its single result.
pub struct InfoScope;

impl ScopeBase for InfoScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		Ok(Arc::new(InfoQuery))
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("info scope has no previews")
	}
}

struct InfoQuery;

#[async_trait]
impl SearchQuery for InfoQuery {
	async fn run(&self, reply: SearchReply) -> anyhow::Result<()> {
		reply
			.info(OperationInfo::new(InfoCode::NoInternet, "operating offline"))
			.await;
		reply
			.push(ScopeResult::new("test:///cached", "cached result"))
			.await;
		Ok(())
	}
}

/// Finishes explicitly mid-run, then keeps pushing; the extra pushes must be
/// rejected. `rejected` records that the channel reported back-pressure.
pub struct EagerFinishScope {
	pub rejected: Arc<AtomicBool>,
}

impl EagerFinishScope {
	pub fn new() -> Self {
		Self {
			rejected: Arc::default(),
		}
	}
}

impl ScopeBase for EagerFinishScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		Ok(Arc::new(EagerFinishQuery {
			rejected: Arc::clone(&self.rejected),
		}))
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("eager finish scope has no previews")
	}
}

struct EagerFinishQuery {
	rejected: Arc<AtomicBool>,
}

#[async_trait]
impl SearchQuery for EagerFinishQuery {
	async fn run(&self, reply: SearchReply) -> anyhow::Result<()> {
		reply
			.push(ScopeResult::new("test:///only", "the only result"))
			.await;

		reply.finished().await;

		if !reply
			.push(ScopeResult::new("test:///late", "too late"))
			.await
		{
			self.rejected.store(true, Ordering::Release);
		}

		Ok(())
	}
}

/// Overrides activation with a real response.
pub struct ActivatingScope;

impl ScopeBase for ActivatingScope {
	fn search(
		&self,
		_query: &CannedQuery,
		_metadata: &SearchMetadata,
	) -> anyhow::Result<Arc<dyn SearchQuery>> {
		anyhow::bail!("activating scope has no searches")
	}

	fn preview(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn PreviewQuery>> {
		anyhow::bail!("activating scope has no previews")
	}

	fn activate(
		&self,
		_result: &ScopeResult,
		_metadata: &ActionMetadata,
	) -> anyhow::Result<Arc<dyn ActivationQuery>> {
		Ok(Arc::new(ShowPreviewActivation))
	}
}

struct ShowPreviewActivation;

#[async_trait]
impl ActivationQuery for ShowPreviewActivation {
	async fn activate(&self) -> anyhow::Result<ActivationResponse> {
		Ok(ActivationResponse::new(ActivationStatus::ShowPreview)
			.with_scope_data(json!({ "token": 42 })))
	}
}
