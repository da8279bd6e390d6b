//! Client-side session management
//!
//! Holds the two client credential stores (in-memory access token, durable
//! refresh token file), the typed HTTP calls against the token service, the
//! single-flight renewal coordinator, and the request interceptor that
//! transparently retries a request once after a renewal.
//!
//! Credential flow:
//! 1. `AuthClient::login()` stores the access token in memory and the
//!    refresh token on disk
//! 2. `AuthClient::send()` attaches the access token to each request
//! 3. On 401, the interceptor asks the `RenewalCoordinator` for a fresh
//!    token; concurrent 401s collapse into one rotation call
//! 4. On renewal success the original request is replayed exactly once;
//!    on renewal failure both stores are cleared and the caller must log
//!    in again

pub mod api;
pub mod error;
pub mod interceptor;
pub mod renewal;
pub mod store;

pub use api::{ApiClient, RenewalApi};
pub use error::{Error, Result};
pub use interceptor::AuthClient;
pub use renewal::RenewalCoordinator;
pub use store::{AccessTokenCell, RefreshTokenFile};
