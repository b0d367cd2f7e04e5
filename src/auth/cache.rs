//! Shared bearer-token cache with a single-flight refresh guard.
//!
//! [`TokenCache::acquire_token`] answers from the cached [`Credential`] while it is valid and
//! only calls the token endpoint when the credential is missing or expired. Concurrent misses
//! queue behind one async guard and re-check the cache after acquiring it, so a burst of
//! callers piggy-backs on a single exchange instead of stampeding the token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{credential::Credential, exchange::TokenExchange, secret::Secret},
	error::AuthError,
};

/// Cloneable handle to the process-wide credential.
///
/// Every clone shares the same credential slot and refresh guard. The slot is replaced as a
/// whole value under a write lock, so token and expiry always change together.
#[derive(Clone)]
pub struct TokenCache {
	exchange: Arc<TokenExchange>,
	current: Arc<RwLock<Option<Credential>>>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl TokenCache {
	/// Creates an empty cache that refreshes through `exchange`.
	pub fn new(exchange: TokenExchange) -> Self {
		Self {
			exchange: Arc::new(exchange),
			current: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Returns a valid bearer token, exchanging client credentials when needed.
	///
	/// The fast path performs no network call and never awaits. Failures are returned to the
	/// caller untouched; the cache never retries on its own.
	pub async fn acquire_token(&self) -> Result<Secret, AuthError> {
		if let Some(token) = self.valid_token_at(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Another caller may have refreshed while this one waited for the guard.
		if let Some(token) = self.valid_token_at(OffsetDateTime::now_utc()) {
			tracing::debug!("reusing credential refreshed by a concurrent caller");

			return Ok(token);
		}

		let credential = self.exchange.exchange().await?;
		let token = credential.token.clone();

		self.store(credential);

		Ok(token)
	}

	/// Returns a snapshot of the current credential, valid or not.
	pub fn current(&self) -> Option<Credential> {
		self.current.read().clone()
	}

	/// Replaces the current credential.
	pub fn store(&self, credential: Credential) {
		*self.current.write() = Some(credential);
	}

	/// Drops the current credential if it still carries `rejected`, so the next call performs a
	/// fresh exchange. A credential stored by a concurrent refresh is left in place.
	///
	/// Returns `true` when the slot was cleared.
	pub fn invalidate_if(&self, rejected: &Secret) -> bool {
		let mut current = self.current.write();

		if current.as_ref().is_some_and(|credential| &credential.token == rejected) {
			*current = None;

			tracing::debug!("cached credential invalidated");

			return true;
		}

		false
	}

	fn valid_token_at(&self, instant: OffsetDateTime) -> Option<Secret> {
		self.current
			.read()
			.as_ref()
			.filter(|credential| credential.is_valid_at(instant))
			.map(|credential| credential.token.clone())
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("exchange", &self.exchange)
			.field("current", &*self.current.read())
			.finish()
	}
}
