use tokio::sync::oneshot;

use crate::{
	completion::{CompletionDetails, OperationInfo},
	error::{MiddlewareError, RegistryError},
	metadata::{ActionMetadata, CannedQuery, MetadataMap, ScopeMetadata, SearchMetadata},
	result::ScopeResult,
	variant::VariantMap,
};

use super::proxy::{QueryCtrlProxy, ReplyProxy, ScopeProxy};

/// One remote operation, queued on the target servant's dispatch channel.
///
/// One-way operations carry no ack; two-way operations carry a `oneshot`
/// sender whose drop signals the invoking side that the call was lost.
pub(crate) enum Request {
	// Query servant
	Run {
		reply: ReplyProxy,
	},

	// Query ctrl servant
	Cancel,
	Destroy,

	// Reply servant
	Push(VariantMap),
	Finished(CompletionDetails),
	Info(OperationInfo),

	// Scope servant (two-way)
	Search {
		query: CannedQuery,
		metadata: SearchMetadata,
		reply: ReplyProxy,
		ack: oneshot::Sender<Result<QueryCtrlProxy, MiddlewareError>>,
	},
	Preview {
		result: ScopeResult,
		metadata: ActionMetadata,
		reply: ReplyProxy,
		ack: oneshot::Sender<Result<QueryCtrlProxy, MiddlewareError>>,
	},
	Activate {
		result: ScopeResult,
		metadata: ActionMetadata,
		reply: ReplyProxy,
		ack: oneshot::Sender<Result<QueryCtrlProxy, MiddlewareError>>,
	},

	// Registry servant (two-way)
	GetMetadata {
		scope_id: String,
		ack: oneshot::Sender<Result<ScopeMetadata, RegistryError>>,
	},
	List {
		ack: oneshot::Sender<MetadataMap>,
	},
	Locate {
		scope_id: String,
		ack: oneshot::Sender<Result<ScopeProxy, RegistryError>>,
	},
}

impl Request {
	pub(crate) const fn operation(&self) -> &'static str {
		match self {
			Self::Run { .. } => "run",
			Self::Cancel => "cancel",
			Self::Destroy => "destroy",
			Self::Push(_) => "push",
			Self::Finished(_) => "finished",
			Self::Info(_) => "info",
			Self::Search { .. } => "search",
			Self::Preview { .. } => "preview",
			Self::Activate { .. } => "activate",
			Self::GetMetadata { .. } => "get_metadata",
			Self::List { .. } => "list",
			Self::Locate { .. } => "locate",
		}
	}
}

impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Request::{}", self.operation())
	}
}
