//! Client-credentials token lifecycle: secrets, the cached credential, the exchange, and the
//! shared cache handle.

pub mod cache;
pub mod credential;
pub mod exchange;
pub mod secret;

pub use cache::*;
pub use credential::*;
pub use exchange::*;
pub use secret::*;
