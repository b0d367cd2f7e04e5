//! Authenticated catalog request dispatcher.
//!
//! [`Dispatcher::request`] is the single place where catalog failures are caught: it obtains
//! a bearer token, performs exactly one GET under a hard timeout, and folds every outcome into
//! an [`UpstreamResult`]. Nothing escapes as an error or a panic, so the transport's
//! request-handling loop always receives a structured value.

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenCache},
	http::{HttpResponse, ReqwestHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::CatalogDescriptor,
};

/// Classification of a failed catalog call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	/// No valid bearer token could be obtained.
	Auth,
	/// Connection refused, DNS failure, timeout, TLS error, or body read failure.
	Transport,
	/// Upstream answered with a non-success status.
	HttpStatus,
	/// Upstream answered with a body that is not valid JSON.
	Protocol,
	/// Anything else, e.g. a request that could not be constructed.
	Unexpected,
}
impl FailureKind {
	/// Returns a stable label suitable for log fields and error envelopes.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureKind::Auth => "auth",
			FailureKind::Transport => "transport",
			FailureKind::HttpStatus => "http_status",
			FailureKind::Protocol => "protocol",
			FailureKind::Unexpected => "unexpected",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failure half of an [`UpstreamResult`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamFailure {
	/// Failure classification.
	pub kind: FailureKind,
	/// Diagnostic message. For [`FailureKind::HttpStatus`] this is `"<code> - <body>"` with the
	/// upstream body preserved verbatim.
	pub message: String,
	/// Upstream HTTP status, when a response was received.
	pub status: Option<u16>,
	/// Retry-After hint from upstream, when supplied.
	pub retry_after: Option<Duration>,
}
impl UpstreamFailure {
	/// Creates a failure without status metadata.
	pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into(), status: None, retry_after: None }
	}

	/// Renders the failure the way tool payloads report it.
	pub fn describe(&self) -> String {
		match self.kind {
			FailureKind::Auth =>
				format!("Unable to authenticate with the catalog API: {}", self.message),
			FailureKind::Transport => format!("Request failed: {}", self.message),
			FailureKind::HttpStatus => format!("Catalog API error: {}", self.message),
			FailureKind::Protocol => format!("Catalog API returned an {}", self.message),
			FailureKind::Unexpected => format!("Unexpected error: {}", self.message),
		}
	}
}
impl Display for UpstreamFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.kind, self.message)
	}
}

/// Tagged outcome of one catalog call.
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamResult {
	/// Parsed JSON payload.
	Success(Value),
	/// Normalized failure.
	Failure(UpstreamFailure),
}
impl UpstreamResult {
	/// Returns `true` for [`UpstreamResult::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}

	/// Converts into a standard [`Result`].
	pub fn into_result(self) -> Result<Value, UpstreamFailure> {
		match self {
			Self::Success(value) => Ok(value),
			Self::Failure(failure) => Err(failure),
		}
	}

	fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
		Self::Failure(UpstreamFailure::new(kind, message))
	}
}

/// Transient description of one catalog call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamRequest {
	/// Path relative to the API base, e.g. `/search`.
	pub endpoint: String,
	/// Flat query parameters.
	pub query_params: BTreeMap<String, String>,
}
impl UpstreamRequest {
	/// Creates a request for `endpoint` without query parameters.
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self { endpoint: endpoint.into(), query_params: BTreeMap::new() }
	}

	/// Adds or replaces a query parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query_params.insert(key.into(), value.to_string());

		self
	}

	/// Resolves the endpoint against `base`, keeping the base path and percent-encoding each
	/// endpoint segment.
	pub fn url(&self, base: &Url) -> Result<Url, UpstreamFailure> {
		let mut url = base.clone();

		{
			let mut segments = url.path_segments_mut().map_err(|_| {
				UpstreamFailure::new(
					FailureKind::Unexpected,
					format!("Catalog API base `{base}` cannot carry a path"),
				)
			})?;

			segments.pop_if_empty();
			segments.extend(self.endpoint.split('/').filter(|segment| !segment.is_empty()));
		}

		Ok(url)
	}
}

/// Issues authenticated catalog reads.
#[derive(Clone, Debug)]
pub struct Dispatcher {
	http_client: ReqwestHttpClient,
	descriptor: Arc<CatalogDescriptor>,
	tokens: TokenCache,
}
impl Dispatcher {
	/// Creates a dispatcher that shares `tokens` with every other clone.
	pub fn new(
		http_client: ReqwestHttpClient,
		descriptor: impl Into<Arc<CatalogDescriptor>>,
		tokens: TokenCache,
	) -> Self {
		Self { http_client, descriptor: descriptor.into(), tokens }
	}

	/// Returns the token cache backing this dispatcher.
	pub fn tokens(&self) -> &TokenCache {
		&self.tokens
	}

	/// Performs `GET {api_base}{endpoint}?{params}` with a bearer token.
	pub async fn request(
		&self,
		endpoint: &str,
		params: &BTreeMap<String, String>,
	) -> UpstreamResult {
		self.dispatch(UpstreamRequest {
			endpoint: endpoint.to_owned(),
			query_params: params.clone(),
		})
		.await
	}

	/// Performs the call described by `request`.
	pub async fn dispatch(&self, request: UpstreamRequest) -> UpstreamResult {
		const KIND: FlowKind = FlowKind::CatalogRequest;

		let span = FlowSpan::new(KIND, "dispatch");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch_inner(&request)).await;

		match &result {
			UpstreamResult::Success(_) => {
				tracing::debug!(endpoint = %request.endpoint, "catalog request succeeded");
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			UpstreamResult::Failure(failure) => {
				tracing::warn!(
					endpoint = %request.endpoint,
					kind = failure.kind.as_str(),
					status = failure.status,
					detail = %failure.message,
					"catalog request failed"
				);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn dispatch_inner(&self, request: &UpstreamRequest) -> UpstreamResult {
		let token = match self.tokens.acquire_token().await {
			Ok(token) => token,
			Err(e) => return UpstreamResult::failure(FailureKind::Auth, e.to_string()),
		};
		let url = match request.url(&self.descriptor.endpoints.api_base) {
			Ok(url) => url,
			Err(failure) => return UpstreamResult::Failure(failure),
		};

		tracing::debug!(%url, params = ?request.query_params, "dispatching catalog request");

		let built = self
			.http_client
			.get(url)
			.bearer_auth(token.expose())
			.query(&request.query_params)
			.timeout(self.descriptor.timeouts.request)
			.build();
		let built = match built {
			Ok(built) => built,
			Err(e) => return UpstreamResult::failure(FailureKind::Unexpected, e.to_string()),
		};

		match self.http_client.fetch(built).await {
			Ok(response) => self.classify_response(response, &token),
			Err(e) => classify_send_error(e, self.descriptor.timeouts.request),
		}
	}

	fn classify_response(&self, response: HttpResponse, token: &Secret) -> UpstreamResult {
		if !response.is_success() {
			if response.status == 401 {
				// Only the rejected token is dropped; a concurrent refresh may already be cached.
				self.tokens.invalidate_if(token);
			}

			return UpstreamResult::Failure(UpstreamFailure {
				kind: FailureKind::HttpStatus,
				message: format!("{} - {}", response.status, response.text()),
				status: Some(response.status),
				retry_after: response.retry_after,
			});
		}

		match serde_json::from_slice::<Value>(&response.body) {
			Ok(value) => UpstreamResult::Success(value),
			Err(e) => {
				tracing::warn!(error = %e, status = response.status, "catalog body is not JSON");

				UpstreamResult::Failure(UpstreamFailure {
					kind: FailureKind::Protocol,
					message: "invalid response body".into(),
					status: Some(response.status),
					retry_after: None,
				})
			},
		}
	}
}

fn classify_send_error(err: ReqwestError, timeout: StdDuration) -> UpstreamResult {
	if err.is_builder() || err.is_redirect() {
		return UpstreamResult::failure(FailureKind::Unexpected, err.to_string());
	}

	let message = if err.is_timeout() {
		format!("catalog API did not respond within {}ms", timeout.as_millis())
	} else {
		err.to_string()
	};

	UpstreamResult::failure(FailureKind::Transport, message)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse API base fixture.")
	}

	#[test]
	fn endpoint_resolution_keeps_base_path() {
		let request = UpstreamRequest::new("/search");

		for api_base in ["https://api.example.com/v1", "https://api.example.com/v1/"] {
			let url = request.url(&base(api_base)).expect("URL should resolve.");

			assert_eq!(url.as_str(), "https://api.example.com/v1/search");
		}
	}

	#[test]
	fn endpoint_segments_are_percent_encoded() {
		let request = UpstreamRequest::new("/artists/a b?c/top-tracks");
		let url = request.url(&base("https://api.example.com/v1")).expect("URL should resolve.");

		assert_eq!(url.path(), "/v1/artists/a%20b%3Fc/top-tracks");
		assert_eq!(url.query(), None);
	}

	#[test]
	fn failure_descriptions_prefix_by_kind() {
		let failure = UpstreamFailure::new(FailureKind::HttpStatus, "429 - rate limited");

		assert_eq!(failure.describe(), "Catalog API error: 429 - rate limited");
		assert_eq!(failure.to_string(), "http_status: 429 - rate limited");
		assert_eq!(
			UpstreamFailure::new(FailureKind::Protocol, "invalid response body").describe(),
			"Catalog API returned an invalid response body"
		);
	}

	#[test]
	fn upstream_result_converts_into_result() {
		let ok = UpstreamResult::Success(json!({ "ok": true }));

		assert!(ok.is_success());
		assert_eq!(ok.into_result(), Ok(json!({ "ok": true })));

		let failed = UpstreamResult::failure(FailureKind::Transport, "connection refused");

		assert!(!failed.is_success());
		assert_eq!(
			failed.into_result().map_err(|failure| failure.kind),
			Err(FailureKind::Transport)
		);
	}
}
