//! Crate-level error types shared by the token cache, descriptor, and server start-up paths.
//!
//! Catalog calls never surface these directly: the dispatcher folds them into
//! [`UpstreamResult`](crate::dispatch::UpstreamResult) so a tool invocation always completes.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public start-up and wiring APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Bearer token could not be obtained.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Catalog descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::DescriptorError),
	/// Listener or socket failure.
	#[error("I/O error occurred while serving: {0}.")]
	Io(#[from] std::io::Error),
}

/// Configuration and validation failures raised while wiring the server.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Logging filter directive could not be parsed.
	#[error("Log filter `{directive}` is invalid.")]
	InvalidLogFilter {
		/// Directive supplied by the operator.
		directive: String,
	},
	/// Global tracing subscriber was already installed.
	#[error("Tracing subscriber is already installed.")]
	SubscriberInstalled,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised by [`TokenCache::acquire_token`](crate::auth::TokenCache::acquire_token).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthError {
	/// Client identifier or secret is not configured; no exchange was attempted.
	#[error("Client identifier or client secret is not configured.")]
	MissingCredentials,
	/// Token exchange failed (network, timeout, non-success status, or malformed body).
	#[error("Token exchange failed: {detail}.")]
	ExchangeFailed {
		/// Human-readable failure summary; upstream bodies are preserved verbatim.
		detail: String,
		/// HTTP status returned by the token endpoint, when one was received.
		status: Option<u16>,
	},
}
impl AuthError {
	/// Builds an [`AuthError::ExchangeFailed`] without an HTTP status.
	pub fn exchange(detail: impl Into<String>) -> Self {
		Self::ExchangeFailed { detail: detail.into(), status: None }
	}

	/// Returns the token endpoint status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::MissingCredentials => None,
			Self::ExchangeFailed { status, .. } => *status,
		}
	}
}
