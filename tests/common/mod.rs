//! Builders shared by the integration tests.

#![allow(dead_code)]

// std
use std::time::Duration;
// crates.io
use httpmock::{Mock, prelude::*};
use serde_json::{Value, json};
// self
use catalog_mcp::{
	auth::{ClientCredentials, TokenCache, TokenExchange},
	dispatch::Dispatcher,
	http::ReqwestHttpClient,
	provider::CatalogDescriptor,
	server::AppState,
	tools::CatalogTools,
	url::Url,
};

pub const CLIENT_ID: &str = "catalog-client";
pub const CLIENT_SECRET: &str = "catalog-secret";

pub fn credentials() -> ClientCredentials {
	ClientCredentials::new(Some(CLIENT_ID.into()), Some(CLIENT_SECRET.into()))
}

pub fn descriptor(server: &MockServer) -> CatalogDescriptor {
	descriptor_with_timeout(server, Duration::from_secs(5))
}

pub fn descriptor_with_timeout(server: &MockServer, timeout: Duration) -> CatalogDescriptor {
	CatalogDescriptor::builder()
		.token_endpoint(
			Url::parse(&server.url("/api/token")).expect("Mock token endpoint should parse."),
		)
		.api_base(Url::parse(&server.url("/v1")).expect("Mock API base should parse."))
		.token_timeout(timeout)
		.request_timeout(timeout)
		.build()
		.expect("Mock descriptor should build.")
}

pub fn token_cache(descriptor: &CatalogDescriptor, credentials: ClientCredentials) -> TokenCache {
	TokenCache::new(TokenExchange::new(
		ReqwestHttpClient::default(),
		descriptor.endpoints.token.clone(),
		descriptor.timeouts.token,
		credentials,
	))
}

pub fn dispatcher(descriptor: CatalogDescriptor, credentials: ClientCredentials) -> Dispatcher {
	let tokens = token_cache(&descriptor, credentials);

	Dispatcher::new(ReqwestHttpClient::default(), descriptor, tokens)
}

pub fn tools(server: &MockServer) -> CatalogTools {
	CatalogTools::new(dispatcher(descriptor(server), credentials()))
}

pub fn app_state(server: &MockServer, credentials: ClientCredentials) -> AppState {
	AppState::new(ReqwestHttpClient::default(), descriptor(server), credentials)
}

pub async fn mock_token<'a>(server: &'a MockServer, token: &str, expires_in: u64) -> Mock<'a> {
	let body = json!({ "access_token": token, "token_type": "Bearer", "expires_in": expires_in });

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token")
				.form_urlencoded_tuple("grant_type", "client_credentials")
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple("client_secret", CLIENT_SECRET);
			then.status(200).header("content-type", "application/json").json_body(body);
		})
		.await
}

pub fn track(id: &str, name: &str, artist: &str) -> Value {
	json!({
		"id": id,
		"name": name,
		"artists": [{ "id": format!("{id}-artist"), "name": artist }],
		"album": { "id": format!("{id}-album"), "name": "A Night at the Opera" },
		"duration_ms": 354_320,
		"popularity": 82,
		"preview_url": null,
		"external_urls": { "spotify": format!("https://open.spotify.com/track/{id}") }
	})
}
