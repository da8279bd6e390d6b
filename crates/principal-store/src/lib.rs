//! Principal storage abstraction
//!
//! Defines the `PrincipalStore` trait that decouples the token issuance
//! logic from the storage backend, plus the password hashing seam. The
//! in-memory implementation (`MemoryStore`) is the default backend; a
//! database-backed implementation satisfies the same trait.
//!
//! The renewal fingerprint is the only per-principal mutable state the
//! issuance path touches. `swap_renewal_fingerprint` is an atomic
//! compare-and-set so two parallel rotations presenting the same stale
//! refresh token produce exactly one winner.

pub mod error;
pub mod memory;
pub mod password;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use password::{Argon2Hasher, PasswordHasher};

use std::future::Future;
use std::pin::Pin;

/// A stored user record.
///
/// `renewal_fingerprint` holds at most one valid fingerprint at any time;
/// setting a new one implicitly invalidates the previous refresh token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub renewal_fingerprint: Option<String>,
}

/// Abstraction over principal storage backends.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn PrincipalStore>`).
pub trait PrincipalStore: Send + Sync {
    /// Load a principal by id. Fails with `NotFound` if absent.
    fn load_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Principal>> + Send + 'a>>;

    /// Load a principal by email. Fails with `NotFound` if absent.
    fn load_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Principal>> + Send + 'a>>;

    /// Create a principal with a pre-hashed password.
    /// Fails with `Conflict` if the email is already registered.
    fn create<'a>(
        &'a self,
        email: &'a str,
        password_hash: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Principal>> + Send + 'a>>;

    /// Unconditionally set or clear the renewal fingerprint.
    ///
    /// Used by login (overwrite with the new pair's fingerprint) and
    /// logout (clear). Idempotent for `None`.
    fn set_renewal_fingerprint<'a>(
        &'a self,
        id: &'a str,
        fingerprint: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Atomically replace the fingerprint with `new` only if the stored
    /// value is `Some(expected)`. Returns whether the swap happened.
    ///
    /// This is the rotation-on-use primitive: under concurrent rotations
    /// presenting the same refresh token, exactly one call observes the
    /// expected value and wins; the rest return `false`.
    fn swap_renewal_fingerprint<'a>(
        &'a self,
        id: &'a str,
        expected: &'a str,
        new: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}
