//! Observability helpers shared by every catalog flow.
//!
//! - Spans are named `catalog_mcp.flow` and carry the `flow` (operation) and `stage` (call
//!   site) fields.
//! - Enable the `metrics` feature to increment the `catalog_mcp_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.
//! - [`init_logging`] installs the global subscriber used by the binary.

mod counter;
mod logging;
mod span;

pub use counter::*;
pub use logging::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Operations observed by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client Credentials exchange against the token endpoint.
	TokenExchange,
	/// Authenticated catalog read.
	CatalogRequest,
	/// MCP `tools/call` invocation.
	ToolCall,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::CatalogRequest => "catalog_request",
			FlowKind::ToolCall => "tool_call",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
