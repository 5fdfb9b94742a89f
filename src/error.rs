use thiserror::Error;

/// Transport-layer failures surfaced to the immediate caller of a proxy
/// operation. Expected races (double finish, double cancel, disconnect after
/// reap) are absorbed inside the protocol and never appear here.
#[derive(Debug, Error)]
pub enum MiddlewareError {
	#[error("servant unreachable <identity='{0}'>")]
	ObjectGone(String),

	#[error("two-way invocation dropped without a response <identity='{0}'>")]
	InvokeDropped(String),

	#[error("request dispatch failed: {0}")]
	Dispatch(String),
}

/// Failures surfaced synchronously from registry lookups and mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("scope id cannot be empty")]
	EmptyId,

	#[error("scope id cannot contain '/' <id='{0}'>")]
	InvalidId(String),

	#[error("no such scope <id='{0}'>")]
	NotFound(String),

	#[error(transparent)]
	Middleware(#[from] MiddlewareError),
}
