//! Client Credentials token exchange against the upstream token endpoint.
//!
//! One call performs exactly one form-encoded POST
//! (`grant_type=client_credentials&client_id=…&client_secret=…`) under a hard timeout and
//! turns the response into a [`Credential`]. Retry policy belongs to callers.

// self
use crate::{
	_prelude::*,
	auth::{credential::Credential, secret::Secret},
	error::AuthError,
	http::{HttpResponse, ReqwestHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Statically configured client identifier and secret.
///
/// Blank values are treated as absent so an exported-but-empty environment variable behaves
/// the same as an unset one.
#[derive(Clone, Default)]
pub struct ClientCredentials {
	client_id: Option<String>,
	client_secret: Option<Secret>,
}
impl ClientCredentials {
	/// Creates a credential pair, discarding blank values.
	pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
		let client_id = client_id.filter(|value| !value.trim().is_empty());
		let client_secret = client_secret.map(Secret::new).filter(|secret| !secret.is_blank());

		Self { client_id, client_secret }
	}

	/// Returns `true` when both the identifier and the secret are present.
	pub fn is_configured(&self) -> bool {
		self.pair().is_some()
	}

	fn pair(&self) -> Option<(&str, &Secret)> {
		Some((self.client_id.as_deref()?, self.client_secret.as_ref()?))
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish()
	}
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<u64>,
}

/// Performs `client_credentials` grants against a single token endpoint.
#[derive(Clone, Debug)]
pub struct TokenExchange {
	/// HTTP client wrapper shared with the catalog dispatcher.
	pub http_client: ReqwestHttpClient,
	/// Absolute token endpoint URL.
	pub token_endpoint: Url,
	/// Ceiling for one exchange, covering connect, send, and body read.
	pub timeout: StdDuration,
	credentials: ClientCredentials,
}
impl TokenExchange {
	/// Largest `expires_in` accepted from the token endpoint (one year).
	pub const MAX_EXPIRES_IN: u64 = 365 * 24 * 60 * 60;

	/// Creates an exchange for the provided endpoint and credentials.
	pub fn new(
		http_client: ReqwestHttpClient,
		token_endpoint: Url,
		timeout: StdDuration,
		credentials: ClientCredentials,
	) -> Self {
		Self { http_client, token_endpoint, timeout, credentials }
	}

	/// Exchanges the configured client credentials for a fresh [`Credential`].
	///
	/// Fails with [`AuthError::MissingCredentials`] before touching the network when either
	/// half of the credential pair is absent.
	pub async fn exchange(&self) -> Result<Credential, AuthError> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let Some((client_id, client_secret)) = self.credentials.pair() else {
			tracing::error!("client identifier or secret is not configured");

			return Err(AuthError::MissingCredentials);
		};
		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let form = [
					("grant_type", "client_credentials"),
					("client_id", client_id),
					("client_secret", client_secret.expose()),
				];
				let request = self
					.http_client
					.post(self.token_endpoint.clone())
					.form(&form[..])
					.timeout(self.timeout)
					.build()
					.map_err(|e| AuthError::exchange(format!("Token request is invalid: {e}")))?;
				let response =
					self.http_client.fetch(request).await.map_err(|e| self.map_send_error(e))?;

				parse_token_response(response, OffsetDateTime::now_utc())
			})
			.await;

		match &result {
			Ok(credential) => {
				tracing::info!(expires_at = %credential.expires_at, "token exchange succeeded");
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(e) => {
				tracing::warn!(error = %e, status = e.status(), "token exchange failed");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	fn map_send_error(&self, err: ReqwestError) -> AuthError {
		let status = err.status().map(|code| code.as_u16());
		let detail = if err.is_timeout() {
			format!("Token endpoint did not respond within {}ms", self.timeout.as_millis())
		} else {
			format!("Request to the token endpoint failed: {err}")
		};

		AuthError::ExchangeFailed { detail, status }
	}
}

fn parse_token_response(
	response: HttpResponse,
	issued_at: OffsetDateTime,
) -> Result<Credential, AuthError> {
	if !response.is_success() {
		return Err(AuthError::ExchangeFailed {
			detail: format!("{} - {}", response.status, response.text()),
			status: Some(response.status),
		});
	}

	let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);
	let parsed: TokenResponse =
		serde_path_to_error::deserialize(deserializer).map_err(|e| AuthError::ExchangeFailed {
			detail: format!(
				"Token endpoint returned malformed JSON at `{}`: {}",
				e.path(),
				e.inner()
			),
			status: Some(response.status),
		})?;

	if parsed.access_token.trim().is_empty() {
		return Err(AuthError::ExchangeFailed {
			detail: "Token endpoint returned an empty access_token".into(),
			status: Some(response.status),
		});
	}

	let expires_in = match parsed.expires_in {
		Some(secs) if secs > TokenExchange::MAX_EXPIRES_IN =>
			return Err(AuthError::ExchangeFailed {
				detail: format!("The expires_in value {secs} exceeds the supported range"),
				status: Some(response.status),
			}),
		Some(secs) => Some(Duration::seconds(secs as i64)),
		None => None,
	};

	Ok(Credential::from_exchange(parsed.access_token, issued_at, expires_in))
}
