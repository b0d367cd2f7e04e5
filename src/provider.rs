//! Catalog descriptor: validated token endpoint, API base, and per-call timeouts.
//!
//! The descriptor is plain data. Flows read it to build requests; nothing in here performs
//! I/O. HTTPS is mandatory except for loopback hosts, which keeps local mock servers usable.

// std
use std::net::IpAddr;
// self
use crate::_prelude::*;

/// Default token endpoint (Spotify accounts service).
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Default catalog API base (Spotify Web API v1).
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Catalog API base is mandatory.
	#[error("Missing catalog API base.")]
	MissingApiBase,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The API base cannot carry path segments (e.g. `mailto:` URLs).
	#[error("The catalog API base is not a base URL: {url}.")]
	InvalidApiBase {
		/// URL that failed validation.
		url: String,
	},
	/// Timeouts must be non-zero; an unbounded call is never allowed.
	#[error("The {timeout} timeout must be greater than zero.")]
	ZeroTimeout {
		/// Which timeout failed validation.
		timeout: &'static str,
	},
}

/// Endpoint set declared by a descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEndpoints {
	/// Token endpoint used for client-credentials exchanges.
	pub token: Url,
	/// Base URL that catalog endpoint paths are appended to.
	pub api_base: Url,
}

/// Hard ceilings applied to each outbound call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallTimeouts {
	/// Ceiling for one token exchange.
	pub token: StdDuration,
	/// Ceiling for one catalog request.
	pub request: StdDuration,
}
impl Default for CallTimeouts {
	fn default() -> Self {
		Self { token: StdDuration::from_secs(10), request: StdDuration::from_secs(15) }
	}
}

/// Immutable descriptor consumed by the token cache and the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogDescriptor {
	/// Endpoint definitions.
	pub endpoints: CatalogEndpoints,
	/// Per-call timeouts.
	pub timeouts: CallTimeouts,
}
impl CatalogDescriptor {
	/// Creates a new builder.
	pub fn builder() -> CatalogDescriptorBuilder {
		CatalogDescriptorBuilder::default()
	}

	/// Descriptor for the public Spotify Web API with default timeouts.
	pub fn spotify() -> Result<Self, DescriptorError> {
		let token =
			Url::parse(DEFAULT_TOKEN_URL).map_err(|_| DescriptorError::MissingTokenEndpoint)?;
		let api_base = Url::parse(DEFAULT_API_BASE).map_err(|_| DescriptorError::MissingApiBase)?;

		Self::builder().token_endpoint(token).api_base(api_base).build()
	}

	fn validate(&self) -> Result<(), DescriptorError> {
		if self.endpoints.api_base.cannot_be_a_base() {
			return Err(DescriptorError::InvalidApiBase {
				url: self.endpoints.api_base.to_string(),
			});
		}

		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("catalog", &self.endpoints.api_base)?;

		if self.timeouts.token.is_zero() {
			return Err(DescriptorError::ZeroTimeout { timeout: "token" });
		}
		if self.timeouts.request.is_zero() {
			return Err(DescriptorError::ZeroTimeout { timeout: "request" });
		}

		Ok(())
	}
}

/// Builder for [`CatalogDescriptor`] values.
#[derive(Debug, Default)]
pub struct CatalogDescriptorBuilder {
	/// Token endpoint used for exchanges.
	pub token_endpoint: Option<Url>,
	/// Catalog API base.
	pub api_base: Option<Url>,
	/// Per-call timeouts.
	pub timeouts: CallTimeouts,
}
impl CatalogDescriptorBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the catalog API base.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the token exchange timeout.
	pub fn token_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeouts.token = timeout;

		self
	}

	/// Overrides the catalog request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeouts.request = timeout;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<CatalogDescriptor, DescriptorError> {
		let token = self.token_endpoint.ok_or(DescriptorError::MissingTokenEndpoint)?;
		let api_base = self.api_base.ok_or(DescriptorError::MissingApiBase)?;
		let descriptor = CatalogDescriptor {
			endpoints: CatalogEndpoints { token, api_base },
			timeouts: self.timeouts,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(DescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.map(|ip| ip.is_loopback())
			.unwrap_or(false),
		None => false,
	}
}
