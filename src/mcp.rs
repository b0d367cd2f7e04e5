//! JSON-RPC 2.0 message handling for the MCP surface.
//!
//! [`McpHandler`] is transport-agnostic: it takes one decoded JSON document (a single message
//! or a batch) and returns the response document, or `None` when nothing needs to be sent
//! back (notifications and client responses).

// self
use crate::{
	_prelude::*,
	tools::{self, CatalogTools, ToolError, ToolOutput},
};

/// Protocol versions this server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];
/// Name advertised in `serverInfo`.
pub const SERVER_NAME: &str = "catalog-mcp";

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC error object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
	/// Numeric error code.
	pub code: i64,
	/// Short description.
	pub message: String,
}
impl RpcError {
	/// Invalid JSON was received.
	pub const PARSE_ERROR: i64 = -32700;
	/// The JSON sent is not a valid request object.
	pub const INVALID_REQUEST: i64 = -32600;
	/// The method does not exist.
	pub const METHOD_NOT_FOUND: i64 = -32601;
	/// Invalid method parameters.
	pub const INVALID_PARAMS: i64 = -32602;

	/// Creates a `-32700` error.
	pub fn parse_error(message: impl Into<String>) -> Self {
		Self { code: Self::PARSE_ERROR, message: message.into() }
	}

	/// Creates a `-32600` error.
	pub fn invalid_request(message: impl Into<String>) -> Self {
		Self { code: Self::INVALID_REQUEST, message: message.into() }
	}

	/// Creates a `-32601` error.
	pub fn method_not_found(method: &str) -> Self {
		Self { code: Self::METHOD_NOT_FOUND, message: format!("Method not found: {method}") }
	}

	/// Creates a `-32602` error.
	pub fn invalid_params(message: impl Into<String>) -> Self {
		Self { code: Self::INVALID_PARAMS, message: message.into() }
	}
}
impl From<ToolError> for RpcError {
	fn from(e: ToolError) -> Self {
		Self::invalid_params(e.to_string())
	}
}

/// Builds a success response.
pub fn success_response(id: Value, result: Value) -> Value {
	json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result })
}

/// Builds an error response.
pub fn error_response(id: Value, error: RpcError) -> Value {
	json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error })
}

/// Dispatches MCP methods to the catalog tools.
#[derive(Clone, Debug)]
pub struct McpHandler {
	tools: CatalogTools,
}
impl McpHandler {
	/// Creates a handler backed by `tools`.
	pub fn new(tools: CatalogTools) -> Self {
		Self { tools }
	}

	/// Handles a decoded single message or batch.
	///
	/// Batches are answered with an array holding one entry per request; a batch made only of
	/// notifications yields `None`, as does a single notification.
	pub async fn handle_message(&self, incoming: Value) -> Option<Value> {
		match incoming {
			Value::Array(batch) if batch.is_empty() => Some(error_response(
				Value::Null,
				RpcError::invalid_request("Batch request must not be empty"),
			)),
			Value::Array(batch) => {
				let mut responses = Vec::with_capacity(batch.len());

				for item in batch {
					if let Some(response) = self.handle_single(item).await {
						responses.push(response);
					}
				}

				if responses.is_empty() { None } else { Some(Value::Array(responses)) }
			},
			single => self.handle_single(single).await,
		}
	}

	async fn handle_single(&self, incoming: Value) -> Option<Value> {
		let Value::Object(mut message) = incoming else {
			return Some(error_response(
				Value::Null,
				RpcError::invalid_request("Request must be a JSON object"),
			));
		};
		let id = message.remove("id");

		if let Some(id) = &id
			&& !matches!(id, Value::String(_) | Value::Number(_) | Value::Null)
		{
			return Some(error_response(
				Value::Null,
				RpcError::invalid_request("id must be a string, a number, or null"),
			));
		}
		if message.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
			return Some(error_response(
				id.unwrap_or(Value::Null),
				RpcError::invalid_request("jsonrpc must be '2.0'"),
			));
		}

		let Some(method) = message.get("method").and_then(Value::as_str) else {
			// Responses to server-initiated requests; this server never sends any.
			if message.contains_key("result") || message.contains_key("error") {
				return None;
			}

			return Some(error_response(
				id.unwrap_or(Value::Null),
				RpcError::invalid_request("method must be a string"),
			));
		};
		let params = message.get("params").cloned().unwrap_or(Value::Null);

		match id {
			Some(id) => {
				tracing::debug!(method, "handling request");

				Some(match self.handle_request(method, params).await {
					Ok(result) => success_response(id, result),
					Err(e) => {
						tracing::debug!(
							method,
							code = e.code,
							detail = %e.message,
							"request failed"
						);

						error_response(id, e)
					},
				})
			},
			None => {
				tracing::debug!(method, "notification received");

				None
			},
		}
	}

	async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
		match method {
			"initialize" => Ok(initialize_payload(&params)),
			"ping" => Ok(json!({})),
			"tools/list" => Ok(json!({ "tools": tools::definitions() })),
			"tools/call" => self.handle_tools_call(params).await,
			_ => Err(RpcError::method_not_found(method)),
		}
	}

	async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
		let Value::Object(mut params) = params else {
			return Err(RpcError::invalid_params("tools/call params must be an object"));
		};
		let name = match params.remove("name") {
			Some(Value::String(name)) => name,
			_ => return Err(RpcError::invalid_params("tools/call requires string field 'name'")),
		};
		let args = match params.remove("arguments") {
			Some(Value::Object(args)) => args,
			Some(Value::Null) | None => Map::new(),
			Some(_) =>
				return Err(RpcError::invalid_params("tools/call 'arguments' must be an object")),
		};
		let output = self.tools.call(&name, args).await?;

		Ok(tool_call_result(&output))
	}
}

/// Negotiates the protocol version: the client's when supported, else the newest.
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
	requested
		.and_then(|requested| {
			SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|supported| *supported == requested)
		})
		.unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

fn initialize_payload(params: &Value) -> Value {
	let requested = params.get("protocolVersion").and_then(Value::as_str);

	json!({
		"protocolVersion": negotiate_protocol_version(requested),
		"capabilities": { "tools": { "listChanged": false } },
		"serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
	})
}

fn tool_call_result(output: &ToolOutput) -> Value {
	json!({
		"content": [{ "type": "text", "text": output.text }],
		"isError": output.is_error
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn protocol_version_is_echoed_when_supported() {
		assert_eq!(negotiate_protocol_version(Some("2024-11-05")), "2024-11-05");
		assert_eq!(negotiate_protocol_version(Some("1999-01-01")), SUPPORTED_PROTOCOL_VERSIONS[0]);
		assert_eq!(negotiate_protocol_version(None), SUPPORTED_PROTOCOL_VERSIONS[0]);
	}

	#[test]
	fn error_responses_follow_jsonrpc_shape() {
		assert_eq!(
			error_response(json!(7), RpcError::method_not_found("resources/list")),
			json!({
				"jsonrpc": "2.0",
				"id": 7,
				"error": { "code": -32601, "message": "Method not found: resources/list" }
			})
		);
	}

	#[test]
	fn tool_errors_map_to_invalid_params() {
		let rpc: RpcError = ToolError::UnknownTool { name: "play".into() }.into();

		assert_eq!(rpc.code, RpcError::INVALID_PARAMS);
		assert!(rpc.message.contains("play"));
	}

	#[test]
	fn tool_results_carry_text_and_error_flag() {
		let result = tool_call_result(&ToolOutput {
			text: r#"{"error":"Query cannot be empty"}"#.into(),
			is_error: true,
		});

		assert_eq!(result["content"][0]["type"], "text");
		assert_eq!(result["content"][0]["text"], r#"{"error":"Query cannot be empty"}"#);
		assert_eq!(result["isError"], true);
	}
}
