//! Traits implemented by scope authors.
//!
//! `run` (or `activate`) executes on a middleware dispatch thread. Returning
//! an `Err` never crosses the dispatch boundary: the servant converts it into
//! a single `finished` with error status on the reply channel.

use async_trait::async_trait;

use crate::{
	reply::{PreviewReply, SearchReply},
	result::ActivationResponse,
};

/// One search query execution.
#[async_trait]
pub trait SearchQuery: Send + Sync + 'static {
	/// Produce results through `reply`. Replies may still be outstanding
	/// after this returns if the implementation cloned the reply handle.
	async fn run(&self, reply: SearchReply) -> anyhow::Result<()>;

	/// Called at most once when the caller cancels this query. A hint only;
	/// the query is free to keep running, but its pushes will be discarded.
	fn cancelled(&self) {}
}

/// One preview query execution.
#[async_trait]
pub trait PreviewQuery: Send + Sync + 'static {
	async fn run(&self, reply: PreviewReply) -> anyhow::Result<()>;

	fn cancelled(&self) {}
}

/// One activation request.
#[async_trait]
pub trait ActivationQuery: Send + Sync + 'static {
	async fn activate(&self) -> anyhow::Result<ActivationResponse>;

	fn cancelled(&self) {}
}
