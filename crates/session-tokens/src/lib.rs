//! Signed session token library
//!
//! Provides the token codec (issue/verify of short-lived access tokens and
//! long-lived refresh tokens), the fingerprint function used to validate a
//! presented refresh token against the server-stored hash, and the shared
//! wire types for the auth endpoints. This crate is a standalone library
//! with no dependency on the service binary — it can be tested and used
//! independently by both the server and the client.
//!
//! Token flow:
//! 1. Service builds two `Profile`s at startup (access + refresh secrets)
//! 2. `login` issues a pair via `Profile::issue` and stores
//!    `fingerprint(refresh_token)` on the principal record
//! 3. `rotate` verifies the presented refresh token via `Profile::verify`,
//!    checks the fingerprint, then issues a fresh pair
//! 4. The client holds the access token in memory and the refresh token in
//!    durable storage

pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod wire;

pub use codec::{Claims, Profile, TokenKind};
pub use error::{Error, Result};
pub use fingerprint::fingerprint;
pub use wire::{
    LoginRequest, LoginResponse, PrincipalSummary, RegisterRequest, TokenPair,
};
