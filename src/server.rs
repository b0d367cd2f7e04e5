//! HTTP surface: stateless MCP endpoint, health probe, and graceful shutdown.

// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::State,
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenCache, TokenExchange},
	config::Config,
	dispatch::Dispatcher,
	http::ReqwestHttpClient,
	mcp::{self, McpHandler, RpcError},
	provider::CatalogDescriptor,
	tools::CatalogTools,
};

/// State shared by every request handler.
#[derive(Clone, Debug)]
pub struct AppState {
	handler: McpHandler,
	credentials_configured: bool,
}
impl AppState {
	/// Wires the token cache, dispatcher, tools, and MCP handler for `descriptor`.
	pub fn new(
		http_client: ReqwestHttpClient,
		descriptor: CatalogDescriptor,
		credentials: ClientCredentials,
	) -> Self {
		let credentials_configured = credentials.is_configured();
		let exchange = TokenExchange::new(
			http_client.clone(),
			descriptor.endpoints.token.clone(),
			descriptor.timeouts.token,
			credentials,
		);
		let dispatcher = Dispatcher::new(http_client, descriptor, TokenCache::new(exchange));
		let handler = McpHandler::new(CatalogTools::new(dispatcher));

		Self { handler, credentials_configured }
	}

	/// Builds the state described by `config`.
	pub fn from_config(config: &Config) -> Result<Self> {
		let descriptor = config.descriptor()?;
		let http_client = ReqwestHttpClient::try_new()?;

		Ok(Self::new(http_client, descriptor, config.credentials()))
	}
}

/// Builds the router: `POST /mcp`, `GET /`, and `GET /health`.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(health_handler))
		.route("/health", get(health_handler))
		.route("/mcp", get(mcp_get_handler).post(mcp_post_handler))
		.with_state(state)
}

/// Binds the configured address and serves until SIGINT or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
	let state = AppState::from_config(&config)?;

	if !state.credentials_configured {
		tracing::warn!(
			"SPOTIFY_CLIENT_ID or SPOTIFY_CLIENT_SECRET is not set; tool calls will report \
			 authentication errors"
		);
	}

	let listener = TcpListener::bind(config.listen_addr()).await?;

	tracing::info!(addr = %local_addr(&listener), "catalog MCP server listening");

	serve_with_shutdown(listener, router(state), shutdown_signal()).await?;

	tracing::info!("shutdown complete");

	Ok(())
}

/// Serves `app` on `listener` until `signal` resolves, then drains in-flight requests.
pub async fn serve_with_shutdown<F>(listener: TcpListener, app: Router, signal: F) -> Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	axum::serve(listener, app).with_graceful_shutdown(signal).await?;

	Ok(())
}

fn local_addr(listener: &TcpListener) -> String {
	listener.local_addr().map(|addr| addr.to_string()).unwrap_or_else(|e| e.to_string())
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"server": mcp::SERVER_NAME,
		"version": env!("CARGO_PKG_VERSION"),
		"credentials_configured": state.credentials_configured,
	}))
}

async fn mcp_get_handler() -> Response {
	(StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")]).into_response()
}

async fn mcp_post_handler(State(state): State<AppState>, body: Bytes) -> Response {
	let incoming = match serde_json::from_slice::<Value>(&body) {
		Ok(incoming) => incoming,
		Err(e) => {
			tracing::debug!(error = %e, "rejecting unparsable MCP payload");

			return (
				StatusCode::BAD_REQUEST,
				Json(mcp::error_response(Value::Null, RpcError::parse_error(e.to_string()))),
			)
				.into_response();
		},
	};

	match state.handler.handle_message(incoming).await {
		Some(response) => (StatusCode::OK, Json(response)).into_response(),
		None => StatusCode::ACCEPTED.into_response(),
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
		_ = terminate => tracing::info!("received SIGTERM, shutting down"),
	}
}
