//!
//! # Scopes RPC
//!
//! An in-process rendition of the asynchronous query/reply protocol used
//! between a shell and its search scopes. A scope implements [`ScopeBase`]
//! and hands out query objects; callers resolve scopes through a
//! [`Registry`], issue searches, previews, and activations, and receive
//! results through listener traits while holding a [`QueryCtrl`] to cancel.
//!
//! Every operation crosses a proxy/servant boundary backed by per-servant
//! dispatch queues, so the protocol behaves as it would over a real
//! transport: replies arrive in order, cancellation is advisory and races
//! with completion, and each query delivers exactly one terminal
//! `finished` event no matter which side fails.
//!
//! ## Basic example
//!
//! ```
//! use std::sync::Arc;
//!
//! use scopes_rpc::{
//!     CannedQuery, CompletionDetails, Runtime, ScopeBase, ScopeMetadata, ScopeResult,
//!     SearchListener, SearchMetadata, SearchQuery, SearchReply,
//! };
//!
//! struct EchoScope;
//!
//! impl ScopeBase for EchoScope {
//!     fn search(
//!         &self,
//!         query: &CannedQuery,
//!         _metadata: &SearchMetadata,
//!     ) -> anyhow::Result<Arc<dyn SearchQuery>> {
//!         Ok(Arc::new(EchoQuery(query.query_string().to_string())))
//!     }
//!
//!     fn preview(
//!         &self,
//!         _result: &ScopeResult,
//!         _metadata: &scopes_rpc::ActionMetadata,
//!     ) -> anyhow::Result<Arc<dyn scopes_rpc::PreviewQuery>> {
//!         anyhow::bail!("no previews here")
//!     }
//! }
//!
//! struct EchoQuery(String);
//!
//! #[async_trait::async_trait]
//! impl SearchQuery for EchoQuery {
//!     async fn run(&self, reply: SearchReply) -> anyhow::Result<()> {
//!         reply.push(ScopeResult::new("echo:///", &self.0)).await;
//!         Ok(())
//!     }
//! }
//!
//! struct PrintListener;
//!
//! #[async_trait::async_trait]
//! impl SearchListener for PrintListener {
//!     async fn push(&self, result: ScopeResult) {
//!         println!("{}", result.title());
//!     }
//!
//!     async fn finished(&self, details: CompletionDetails) {
//!         println!("done: {}", details.status());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::new();
//!     runtime.register_scope(ScopeMetadata::new("echo", "Echo"), Arc::new(EchoScope))?;
//!
//!     let scope = runtime.registry().find("echo").await?;
//!     let _ctrl = scope.search(
//!         CannedQuery::new("echo", "hello"),
//!         SearchMetadata::default(),
//!         Arc::new(PrintListener),
//!     )?;
//!
//!     Ok(())
//! }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod completion;
mod error;
mod listener;
mod metadata;
mod middleware;
mod object;
mod query;
mod registry;
mod reply;
mod result;
mod runtime;
mod scope;
mod variant;

pub use completion::{CompletionDetails, CompletionStatus, InfoCode, OperationInfo};
pub use error::{MiddlewareError, RegistryError};
pub use listener::{ActivationListener, PreviewListener, SearchListener};
pub use metadata::{
	ActionMetadata, CannedQuery, MetadataMap, ScopeMetadata, ScopeState, SearchMetadata,
};
pub use middleware::{
	LocalMiddleware, ObjectProxy, QueryCtrlProxy, QueryProxy, RegistryProxy, ReplyProxy,
	ScopeProxy,
};
pub use query::{ActivationQuery, PreviewQuery, QueryCtrl, SearchQuery};
pub use registry::{ListUpdateCallback, Registry, RegistryObject, ScopeStateCallback};
pub use reply::{PreviewReply, ReplyObject, SearchReply};
pub use result::{ActivationResponse, ActivationStatus, ScopeResult};
pub use runtime::{Runtime, RuntimeConfig};
pub use scope::{Scope, ScopeBase, ScopeServant};
pub use variant::{Variant, VariantMap};
