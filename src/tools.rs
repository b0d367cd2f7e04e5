//! Catalog tools exposed over MCP.
//!
//! Each tool validates its arguments, issues exactly one dispatcher call, and returns a JSON
//! string. Failures never escape: they are rendered as `{"error": …}` objects inside the same
//! text channel, with [`ToolOutput::is_error`] set so the transport can flag them.

pub mod shape;

// self
use self::shape::ShapeError;
use crate::{
	_prelude::*,
	dispatch::{Dispatcher, FailureKind, UpstreamFailure, UpstreamRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Default number of results for search tools.
pub const DEFAULT_LIMIT: i64 = 10;
/// Upper bound accepted by the catalog search endpoint.
pub const MAX_LIMIT: i64 = 50;
/// Market used when `get_artist_top_tracks` is called without one.
pub const DEFAULT_MARKET: &str = "US";

/// Clamps a requested result count into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: i64) -> i64 {
	limit.clamp(1, MAX_LIMIT)
}

/// Static description of one tool, as listed by `tools/list`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
	/// Tool name used by `tools/call`.
	pub name: &'static str,
	/// Human-readable description.
	pub description: &'static str,
	/// JSON Schema of the arguments object.
	#[serde(rename = "inputSchema")]
	pub input_schema: Value,
}

/// Returns the definitions of every tool, in a stable order.
pub fn definitions() -> Vec<ToolDefinition> {
	let limit = json!({
		"type": "integer",
		"description": "Number of results to return (default: 10, max: 50)",
		"default": DEFAULT_LIMIT,
		"minimum": 1,
		"maximum": MAX_LIMIT
	});

	vec![
		ToolDefinition {
			name: "search_tracks",
			description: "Search for tracks in the music catalog.",
			input_schema: json!({
				"type": "object",
				"properties": {
					"query": {
						"type": "string",
						"description": "Search query (song name, artist, lyrics, etc.)"
					},
					"limit": limit
				},
				"required": ["query"]
			}),
		},
		ToolDefinition {
			name: "search_artists",
			description: "Search for artists in the music catalog.",
			input_schema: json!({
				"type": "object",
				"properties": {
					"query": {
						"type": "string",
						"description": "Search query (artist name, genre, etc.)"
					},
					"limit": limit
				},
				"required": ["query"]
			}),
		},
		ToolDefinition {
			name: "get_artist_top_tracks",
			description: "Get the top tracks for a specific artist.",
			input_schema: json!({
				"type": "object",
				"properties": {
					"artist_id": { "type": "string", "description": "Catalog artist ID" },
					"market": {
						"type": "string",
						"description": "Market code (default: \"US\")",
						"default": DEFAULT_MARKET
					}
				},
				"required": ["artist_id"]
			}),
		},
	]
}

/// Failures that prevent a tool from running at all.
///
/// These map to JSON-RPC errors rather than tool payloads.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ToolError {
	/// No tool with this name is registered.
	#[error("Unknown tool `{name}`.")]
	UnknownTool {
		/// Requested tool name.
		name: String,
	},
	/// Arguments do not match the tool's schema.
	#[error("Invalid arguments for `{tool}`: {detail}.")]
	InvalidArguments {
		/// Tool name.
		tool: &'static str,
		/// Deserializer message including the offending path.
		detail: String,
	},
}

/// JSON text returned by a tool, plus whether it describes a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
	/// JSON document serialized as a string.
	pub text: String,
	/// `true` when `text` is an `{"error": …}` object.
	pub is_error: bool,
}
impl ToolOutput {
	fn success<T>(payload: &T) -> Self
	where
		T: Serialize,
	{
		match serde_json::to_string(payload) {
			Ok(text) => Self { text, is_error: false },
			Err(e) => Self::error(json!({ "error": format!("Unexpected error: {e}") })),
		}
	}

	fn error(payload: Value) -> Self {
		Self { text: payload.to_string(), is_error: true }
	}

	fn invalid(message: &str) -> Self {
		Self::error(json!({ "error": message }))
	}

	fn upstream(failure: &UpstreamFailure) -> Self {
		let mut payload = json!({
			"error": failure.describe(),
			"kind": failure.kind,
			"status": failure.status,
		});

		if let Some(retry_after) = failure.retry_after {
			payload["retry_after_secs"] = json!(retry_after.whole_seconds());
		}

		Self::error(payload)
	}

	fn shaped<T>(results: Result<T, ShapeError>) -> Self
	where
		T: Serialize,
	{
		match results {
			Ok(results) => Self::success(&results),
			Err(e) => Self::upstream(&UpstreamFailure::new(FailureKind::Protocol, e.to_string())),
		}
	}

	/// Parses `text` back into a JSON value.
	pub fn json(&self) -> Result<Value, serde_json::Error> {
		serde_json::from_str(&self.text)
	}
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
	query: String,
	#[serde(default = "default_limit")]
	limit: i64,
}

#[derive(Debug, Deserialize)]
struct TopTracksArgs {
	artist_id: String,
	#[serde(default)]
	market: Option<String>,
}

fn default_limit() -> i64 {
	DEFAULT_LIMIT
}

fn parse_args<T>(tool: &'static str, args: Map<String, Value>) -> Result<T, ToolError>
where
	T: for<'de> Deserialize<'de>,
{
	serde_path_to_error::deserialize(Value::Object(args)).map_err(|e| {
		ToolError::InvalidArguments { tool, detail: format!("`{}`: {}", e.path(), e.inner()) }
	})
}

/// Tool implementations backed by a shared [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct CatalogTools {
	dispatcher: Dispatcher,
}
impl CatalogTools {
	/// Creates the tool set.
	pub fn new(dispatcher: Dispatcher) -> Self {
		Self { dispatcher }
	}

	/// Invokes the tool `name` with raw JSON arguments.
	pub async fn call(
		&self,
		name: &str,
		args: Map<String, Value>,
	) -> Result<ToolOutput, ToolError> {
		const KIND: FlowKind = FlowKind::ToolCall;

		let span = FlowSpan::new(KIND, "call");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match name {
					"search_tracks" => {
						let args = parse_args::<SearchArgs>("search_tracks", args)?;

						Ok(self.search_tracks(&args.query, args.limit).await)
					},
					"search_artists" => {
						let args = parse_args::<SearchArgs>("search_artists", args)?;

						Ok(self.search_artists(&args.query, args.limit).await)
					},
					"get_artist_top_tracks" => {
						let args = parse_args::<TopTracksArgs>("get_artist_top_tracks", args)?;
						let market = args.market.as_deref();

						Ok(self.get_artist_top_tracks(&args.artist_id, market).await)
					},
					_ => Err(ToolError::UnknownTool { name: name.to_owned() }),
				}
			})
			.await;

		match &result {
			Ok(output) if !output.is_error => {
				tracing::info!(tool = name, "tool call succeeded");
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Ok(_) => {
				tracing::info!(tool = name, "tool call returned an error payload");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
			Err(e) => {
				tracing::warn!(tool = name, error = %e, "tool call rejected");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Searches tracks matching `query`, returning at most `limit` (clamped to `[1, 50]`).
	pub async fn search_tracks(&self, query: &str, limit: i64) -> ToolOutput {
		if query.trim().is_empty() {
			return ToolOutput::invalid("Query cannot be empty");
		}

		let request = search_request(query, "track", limit);

		match self.dispatcher.dispatch(request).await.into_result() {
			Ok(payload) => ToolOutput::shaped(shape::track_results(payload)),
			Err(failure) => ToolOutput::upstream(&failure),
		}
	}

	/// Searches artists matching `query`, returning at most `limit` (clamped to `[1, 50]`).
	pub async fn search_artists(&self, query: &str, limit: i64) -> ToolOutput {
		if query.trim().is_empty() {
			return ToolOutput::invalid("Query cannot be empty");
		}

		let request = search_request(query, "artist", limit);

		match self.dispatcher.dispatch(request).await.into_result() {
			Ok(payload) => ToolOutput::shaped(shape::artist_results(payload)),
			Err(failure) => ToolOutput::upstream(&failure),
		}
	}

	/// Fetches an artist's top tracks in `market` (`"US"` when absent or blank).
	pub async fn get_artist_top_tracks(&self, artist_id: &str, market: Option<&str>) -> ToolOutput {
		let artist_id = artist_id.trim();

		if artist_id.is_empty() {
			return ToolOutput::invalid("Artist ID cannot be empty");
		}
		if artist_id.contains('/') {
			return ToolOutput::invalid("Artist ID must not contain '/'");
		}

		let market =
			market.map(str::trim).filter(|market| !market.is_empty()).unwrap_or(DEFAULT_MARKET);
		let request = UpstreamRequest::new(format!("/artists/{artist_id}/top-tracks"))
			.param("market", market);

		match self.dispatcher.dispatch(request).await.into_result() {
			Ok(payload) => ToolOutput::shaped(shape::top_track_results(payload)),
			Err(failure) => ToolOutput::upstream(&failure),
		}
	}
}

fn search_request(query: &str, kind: &str, limit: i64) -> UpstreamRequest {
	UpstreamRequest::new("/search")
		.param("q", query)
		.param("type", kind)
		.param("limit", clamp_limit(limit))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn limits_are_clamped_into_range() {
		assert_eq!(clamp_limit(1000), 50);
		assert_eq!(clamp_limit(0), 1);
		assert_eq!(clamp_limit(-7), 1);
		assert_eq!(clamp_limit(3), 3);
	}

	#[test]
	fn search_request_carries_type_and_clamped_limit() {
		let request = search_request("Bohemian Rhapsody", "track", 1000);

		assert_eq!(request.endpoint, "/search");
		assert_eq!(request.query_params["q"], "Bohemian Rhapsody");
		assert_eq!(request.query_params["type"], "track");
		assert_eq!(request.query_params["limit"], "50");
	}

	#[test]
	fn definitions_list_every_tool_with_required_arguments() {
		let definitions = definitions();
		let names = definitions.iter().map(|definition| definition.name).collect::<Vec<_>>();

		assert_eq!(names, ["search_tracks", "search_artists", "get_artist_top_tracks"]);
		assert_eq!(definitions[2].input_schema["required"], json!(["artist_id"]));
		assert_eq!(
			serde_json::to_value(&definitions[0]).expect("Definition should serialize.")
				["inputSchema"]["properties"]["limit"]["maximum"],
			50
		);
	}

	#[test]
	fn arguments_report_their_path_on_mismatch() {
		let mut args = Map::new();

		args.insert("query".into(), json!("queen"));
		args.insert("limit".into(), json!("ten"));

		let err = parse_args::<SearchArgs>("search_tracks", args)
			.expect_err("String limits must be rejected.");

		assert!(matches!(
			err,
			ToolError::InvalidArguments { tool: "search_tracks", ref detail }
				if detail.contains("limit")
		));
	}

	#[test]
	fn upstream_failures_render_error_envelopes() {
		let failure = UpstreamFailure {
			kind: FailureKind::HttpStatus,
			message: "429 - rate limited".into(),
			status: Some(429),
			retry_after: None,
		};
		let output = ToolOutput::upstream(&failure);

		assert!(output.is_error);
		assert_eq!(
			output.json().expect("Error payload should be JSON."),
			json!({
				"error": "Catalog API error: 429 - rate limited",
				"kind": "http_status",
				"status": 429
			})
		);
	}

	#[test]
	fn retry_hints_reach_the_error_envelope() {
		let failure = UpstreamFailure {
			kind: FailureKind::HttpStatus,
			message: "429 - rate limited".into(),
			status: Some(429),
			retry_after: Some(Duration::seconds(7)),
		};
		let payload = ToolOutput::upstream(&failure).json().expect("Error payload should be JSON.");

		assert_eq!(payload["retry_after_secs"], 7);
		assert_eq!(payload["kind"], "http_status");
	}

	#[test]
	fn shape_failures_report_protocol_kind() {
		let output = ToolOutput::shaped(shape::track_results(json!({
			"tracks": { "items": [{ "popularity": "high" }] }
		})));
		let payload = output.json().expect("Error payload should be JSON.");

		assert!(output.is_error);
		assert_eq!(payload["kind"], "protocol");
		assert_eq!(payload["status"], Value::Null);
		let message = payload["error"].as_str().expect("Error message should be a string.");

		assert!(message.starts_with("Catalog API returned an unexpected payload at `tracks.items"));
		assert!(message.contains("popularity"));
	}
}
