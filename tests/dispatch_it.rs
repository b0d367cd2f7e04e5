mod common;

// std
use std::{collections::BTreeMap, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use catalog_mcp::{
	auth::ClientCredentials,
	dispatch::{FailureKind, UpstreamRequest, UpstreamResult},
	provider::CatalogDescriptor,
	url::Url,
};
use common::*;

#[tokio::test]
async fn success_returns_parsed_json_with_bearer_token() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "abc", 3600).await;
	let search = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/search")
				.header("authorization", "Bearer abc")
				.query_param("q", "queen")
				.query_param("type", "artist");
			then.status(200).json_body(json!({ "artists": { "items": [], "total": 0 } }));
		})
		.await;
	let dispatcher = dispatcher(descriptor(&server), credentials());
	let params = BTreeMap::from([
		("q".to_owned(), "queen".to_owned()),
		("type".to_owned(), "artist".to_owned()),
	]);
	let result = dispatcher.request("/search", &params).await;

	assert_eq!(result, UpstreamResult::Success(json!({ "artists": { "items": [], "total": 0 } })));

	// A second call reuses the cached token.
	assert!(dispatcher.request("/search", &params).await.is_success());

	token.assert_calls_async(1).await;
	search.assert_calls_async(2).await;
}

#[tokio::test]
async fn rate_limit_is_normalized_with_retry_hint() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "abc", 3600).await;
	let _search = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search");
			then.status(429).header("retry-after", "7").body("rate limited");
		})
		.await;
	let dispatcher = dispatcher(descriptor(&server), credentials());
	let failure = dispatcher
		.dispatch(UpstreamRequest::new("/search").param("q", "x"))
		.await
		.into_result()
		.expect_err("429 must be a failure.");

	assert_eq!(failure.kind, FailureKind::HttpStatus);
	assert_eq!(failure.message, "429 - rate limited");
	assert_eq!(failure.status, Some(429));
	assert_eq!(failure.retry_after, Some(time::Duration::seconds(7)));
}

#[tokio::test]
async fn auth_failure_skips_catalog_call() {
	let server = MockServer::start_async().await;
	let search = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search");
			then.status(200).json_body(json!({}));
		})
		.await;
	let dispatcher = dispatcher(descriptor(&server), ClientCredentials::default());
	let failure = dispatcher
		.dispatch(UpstreamRequest::new("/search"))
		.await
		.into_result()
		.expect_err("Missing credentials must fail.");

	assert_eq!(failure.kind, FailureKind::Auth);
	assert!(failure.describe().starts_with("Unable to authenticate with the catalog API"));

	search.assert_calls_async(0).await;
}

#[tokio::test]
async fn non_json_body_is_a_protocol_failure() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "abc", 3600).await;
	let _search = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search");
			then.status(200).body("<html>maintenance</html>");
		})
		.await;
	let dispatcher = dispatcher(descriptor(&server), credentials());
	let failure = dispatcher
		.dispatch(UpstreamRequest::new("/search"))
		.await
		.into_result()
		.expect_err("HTML bodies must fail.");

	assert_eq!(failure.kind, FailureKind::Protocol);
	assert_eq!(failure.message, "invalid response body");
}

#[tokio::test]
async fn unreachable_catalog_is_a_transport_failure() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "abc", 3600).await;
	let descriptor = CatalogDescriptor::builder()
		.token_endpoint(Url::parse(&server.url("/api/token")).expect("Token URL should parse."))
		.api_base(Url::parse("http://127.0.0.1:1/v1").expect("Unreachable URL should parse."))
		.request_timeout(Duration::from_secs(2))
		.build()
		.expect("Descriptor should build.");
	let dispatcher = dispatcher(descriptor, credentials());
	let failure = dispatcher
		.dispatch(UpstreamRequest::new("/search"))
		.await
		.into_result()
		.expect_err("Connection refused must fail.");

	assert_eq!(failure.kind, FailureKind::Transport);
	assert!(failure.describe().starts_with("Request failed: "));
	assert_eq!(failure.status, None);
}

#[tokio::test]
async fn slow_catalog_is_a_transport_timeout() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "abc", 3600).await;
	let _search = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search");
			then.status(200).json_body(json!({})).delay(Duration::from_secs(2));
		})
		.await;
	let dispatcher =
		dispatcher(descriptor_with_timeout(&server, Duration::from_millis(300)), credentials());
	let failure = dispatcher
		.dispatch(UpstreamRequest::new("/search"))
		.await
		.into_result()
		.expect_err("Slow upstream must time out.");

	assert_eq!(failure.kind, FailureKind::Transport);
	assert_eq!(failure.message, "catalog API did not respond within 300ms");
}

#[tokio::test]
async fn unauthorized_response_invalidates_cached_token() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "revoked", 3600).await;
	let _search = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search");
			then.status(401).body(r#"{"error":{"status":401,"message":"Invalid access token"}}"#);
		})
		.await;
	let dispatcher = dispatcher(descriptor(&server), credentials());
	let failure = dispatcher
		.dispatch(UpstreamRequest::new("/search"))
		.await
		.into_result()
		.expect_err("401 must be a failure.");

	assert_eq!(failure.status, Some(401));
	assert!(dispatcher.tokens().current().is_none());

	dispatcher.dispatch(UpstreamRequest::new("/search")).await;

	token.assert_calls_async(2).await;
}
