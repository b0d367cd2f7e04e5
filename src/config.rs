//! Command-line and environment configuration.

// std
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::ClientCredentials,
	obs::LogFormat,
	provider::{CatalogDescriptor, DEFAULT_API_BASE, DEFAULT_TOKEN_URL, DescriptorError},
};

/// Server configuration; every flag can also be supplied through its environment variable.
#[derive(Clone, Parser)]
#[command(name = "catalog-mcp", version, about)]
pub struct Config {
	/// Client identifier used for the client-credentials grant.
	#[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
	pub client_id: Option<String>,
	/// Client secret used for the client-credentials grant.
	#[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<String>,
	/// Address to bind.
	#[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub host: IpAddr,
	/// Port to bind.
	#[arg(long, env = "PORT", default_value_t = 8000)]
	pub port: u16,
	/// Token endpoint for the client-credentials grant.
	#[arg(long, env = "CATALOG_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
	pub token_url: Url,
	/// Base URL of the catalog API.
	#[arg(long, env = "CATALOG_API_BASE", default_value = DEFAULT_API_BASE)]
	pub api_base: Url,
	/// Ceiling for one token exchange, in seconds.
	#[arg(long, env = "TOKEN_TIMEOUT_SECS", default_value_t = 10)]
	pub token_timeout_secs: u64,
	/// Ceiling for one catalog request, in seconds.
	#[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15)]
	pub request_timeout_secs: u64,
	/// Log filter directive, e.g. `info` or `catalog_mcp=debug`. Empty defers to `RUST_LOG`.
	#[arg(long, env = "LOG_LEVEL", default_value = "info")]
	pub log_level: String,
	/// Log output format.
	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
	pub log_format: LogFormat,
}
impl Config {
	/// Returns the socket address to bind.
	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	/// Returns the configured client credentials; blank values count as absent.
	pub fn credentials(&self) -> ClientCredentials {
		ClientCredentials::new(self.client_id.clone(), self.client_secret.clone())
	}

	/// Builds and validates the catalog descriptor.
	pub fn descriptor(&self) -> Result<CatalogDescriptor, DescriptorError> {
		CatalogDescriptor::builder()
			.token_endpoint(self.token_url.clone())
			.api_base(self.api_base.clone())
			.token_timeout(StdDuration::from_secs(self.token_timeout_secs))
			.request_timeout(StdDuration::from_secs(self.request_timeout_secs))
			.build()
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("listen_addr", &self.listen_addr())
			.field("token_url", &self.token_url.as_str())
			.field("api_base", &self.api_base.as_str())
			.field("token_timeout_secs", &self.token_timeout_secs)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("log_level", &self.log_level)
			.field("log_format", &self.log_format)
			.finish()
	}
}
