//! Immutable bearer credential and its expiry arithmetic.

// self
use crate::{_prelude::*, auth::secret::Secret};

/// Bearer token paired with the instant after which it must not be reused.
///
/// The token and its expiry are only ever replaced together: the cache swaps whole
/// `Credential` values, so readers never observe a fresh token with a stale expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	/// Access token secret; callers must avoid logging it.
	pub token: Secret,
	/// Instant the exchange response was received.
	pub issued_at: OffsetDateTime,
	/// Local expiry, already shortened by [`Credential::EXPIRY_MARGIN`].
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Lifetime assumed when the token endpoint omits `expires_in`.
	pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(3_600);
	/// Safety margin subtracted from the upstream-declared lifetime.
	pub const EXPIRY_MARGIN: Duration = Duration::seconds(60);

	/// Builds a credential from an exchange response received at `issued_at`.
	///
	/// `expires_in` falls back to [`Credential::DEFAULT_EXPIRES_IN`]. The local expiry is
	/// `issued_at + expires_in - EXPIRY_MARGIN`, so lifetimes of 60 seconds or less yield a
	/// credential that is already invalid and will be re-exchanged on the next call.
	pub fn from_exchange(
		token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Option<Duration>,
	) -> Self {
		let lifetime = expires_in.unwrap_or(Self::DEFAULT_EXPIRES_IN);

		Self {
			token: Secret::new(token),
			issued_at,
			expires_at: issued_at + lifetime - Self::EXPIRY_MARGIN,
		}
	}

	/// Returns `true` while `instant` is strictly before the local expiry.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Convenience helper that checks validity against the current UTC instant.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
