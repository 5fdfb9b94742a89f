//! Completion status reported to a listener when a query reaches a terminal
//! state, plus the diagnostic info records that may accumulate along the way.

use std::fmt;

/// Terminal outcome of a query, delivered exactly once per reply channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
	/// The query completed normally (including hitting a cardinality bound).
	Ok,
	/// The query observed a cancellation before completing.
	Cancelled,
	/// The query failed; the details carry a message.
	Error,
}

impl fmt::Display for CompletionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ok => write!(f, "ok"),
			Self::Cancelled => write!(f, "cancelled"),
			Self::Error => write!(f, "error"),
		}
	}
}

/// Codes for non-fatal conditions a scope can report while a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoCode {
	Unknown,
	NoInternet,
	PoorInternet,
	NoLocationData,
	InaccurateLocationData,
	ResultsIncomplete,
	DefaultSettingsUsed,
	SettingsProblem,
}

/// A single diagnostic record, forwarded to the listener as it occurs and
/// folded into the final [`CompletionDetails`].
#[derive(Debug, Clone)]
pub struct OperationInfo {
	code: InfoCode,
	details: String,
}

impl OperationInfo {
	#[must_use]
	pub fn new(code: InfoCode, details: impl Into<String>) -> Self {
		Self {
			code,
			details: details.into(),
		}
	}

	#[must_use]
	pub const fn code(&self) -> InfoCode {
		self.code
	}

	#[must_use]
	pub fn details(&self) -> &str {
		&self.details
	}
}

/// Everything a listener learns from the single terminal event of a query.
#[derive(Debug, Clone)]
pub struct CompletionDetails {
	status: CompletionStatus,
	message: String,
	info: Vec<OperationInfo>,
}

impl CompletionDetails {
	#[must_use]
	pub const fn new(status: CompletionStatus) -> Self {
		Self {
			status,
			message: String::new(),
			info: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_message(status: CompletionStatus, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
			info: Vec::new(),
		}
	}

	pub fn add_info(&mut self, info: OperationInfo) {
		self.info.push(info);
	}

	#[must_use]
	pub const fn status(&self) -> CompletionStatus {
		self.status
	}

	#[must_use]
	pub fn message(&self) -> &str {
		&self.message
	}

	#[must_use]
	pub fn info(&self) -> &[OperationInfo] {
		&self.info
	}
}
