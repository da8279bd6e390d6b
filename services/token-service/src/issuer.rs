//! Token issuance service
//!
//! Server-side orchestration of login, rotation, and invalidation. The
//! rotation invariant: at most one valid renewal fingerprint exists per
//! principal, and every successful login or rotation overwrites it, so a
//! refresh token is single-use against the store even though it remains
//! cryptographically valid until its own expiry.
//!
//! Concurrency: the only shared mutable state per principal is the
//! fingerprint, and the store's compare-and-set serializes racing
//! rotations — one winner, the rest get `AccessDenied`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use principal_store::{PasswordHasher, PrincipalStore};
use session_tokens::codec::{Claims, Profile};
use session_tokens::{PrincipalSummary, TokenPair, fingerprint};

/// Issuance errors, mapped one-to-one onto HTTP statuses by the handlers.
///
/// `InvalidCredentials` and `AccessDenied` deliberately carry no detail —
/// the caller learns only that authorization failed, not why.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("access denied")]
    AccessDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for issuance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The server-side state machine over codec, store, and password hasher.
pub struct Issuer {
    store: Arc<dyn PrincipalStore>,
    hasher: Arc<dyn PasswordHasher>,
    access_profile: Profile,
    refresh_profile: Profile,
}

impl Issuer {
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        hasher: Arc<dyn PasswordHasher>,
        access_profile: Profile,
        refresh_profile: Profile,
    ) -> Self {
        Self {
            store,
            hasher,
            access_profile,
            refresh_profile,
        }
    }

    /// Create a principal. Fails with `Conflict` for a duplicate email.
    pub async fn register(&self, email: &str, password: &str) -> Result<PrincipalSummary> {
        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| Error::Internal(e.to_string()))?;

        let principal = self
            .store
            .create(email, &password_hash)
            .await
            .map_err(store_error)?;

        info!(principal_id = %principal.id, "principal registered");
        Ok(PrincipalSummary {
            id: principal.id,
            email: principal.email,
        })
    }

    /// Authenticate and issue a fresh pair.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller. On success the new pair's fingerprint overwrites any prior
    /// one — logging in from a new context silently invalidates a
    /// previous refresh token for the same principal.
    pub async fn login(&self, email: &str, password: &str) -> Result<(PrincipalSummary, TokenPair)> {
        let principal = match self.store.load_by_email(email).await {
            Ok(p) => p,
            Err(principal_store::Error::NotFound(_)) => {
                debug!("login attempt for unknown email");
                return Err(Error::InvalidCredentials);
            }
            Err(e) => return Err(Error::Internal(e.to_string())),
        };

        if !self.hasher.verify(password, &principal.password_hash) {
            debug!(principal_id = %principal.id, "login rejected: password mismatch");
            return Err(Error::InvalidCredentials);
        }

        let pair = self.issue_pair(&principal.id, &principal.email)?;
        self.store
            .set_renewal_fingerprint(&principal.id, Some(fingerprint(&pair.refresh_token)))
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!(principal_id = %principal.id, "login succeeded");
        Ok((
            PrincipalSummary {
                id: principal.id,
                email: principal.email,
            },
            pair,
        ))
    }

    /// Rotate: exchange a presented refresh token for a fresh pair.
    ///
    /// The presented token's fingerprint must match the stored one — a
    /// stale or forged token is rejected even if its signature and expiry
    /// are otherwise valid. The match and the overwrite are one atomic
    /// compare-and-set, so replaying an already-rotated token always
    /// yields `AccessDenied`, including under concurrent rotation.
    pub async fn rotate(&self, principal_id: &str, presented_refresh: &str) -> Result<TokenPair> {
        let principal = match self.store.load_by_id(principal_id).await {
            Ok(p) => p,
            Err(principal_store::Error::NotFound(_)) => {
                warn!(principal_id, "rotation attempt for unknown principal");
                return Err(Error::AccessDenied);
            }
            Err(e) => return Err(Error::Internal(e.to_string())),
        };

        if principal.renewal_fingerprint.is_none() {
            warn!(principal_id, "rotation attempt with no stored fingerprint");
            return Err(Error::AccessDenied);
        }

        let pair = self.issue_pair(&principal.id, &principal.email)?;
        let swapped = self
            .store
            .swap_renewal_fingerprint(
                &principal.id,
                &fingerprint(presented_refresh),
                &fingerprint(&pair.refresh_token),
            )
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        if !swapped {
            // Reuse/theft detector: the presented token was already
            // rotated away, or lost the race to a parallel rotation
            warn!(principal_id, "rotation rejected: fingerprint mismatch");
            return Err(Error::AccessDenied);
        }

        info!(principal_id, "rotation succeeded");
        Ok(pair)
    }

    /// Clear the stored fingerprint. Idempotent; a vanished principal is
    /// treated as already invalidated.
    pub async fn invalidate(&self, principal_id: &str) -> Result<()> {
        match self.store.set_renewal_fingerprint(principal_id, None).await {
            Ok(()) => {
                info!(principal_id, "session invalidated");
                Ok(())
            }
            Err(principal_store::Error::NotFound(_)) => Ok(()),
            Err(e) => Err(Error::Internal(e.to_string())),
        }
    }

    /// Load a principal summary by id (for `/user/me`).
    pub async fn principal(&self, principal_id: &str) -> Result<PrincipalSummary> {
        let principal = self
            .store
            .load_by_id(principal_id)
            .await
            .map_err(store_error)?;
        Ok(PrincipalSummary {
            id: principal.id,
            email: principal.email,
        })
    }

    /// Verify a presented access token. Codec failures surface as
    /// `AccessDenied` — no partial trust.
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        self.access_profile
            .verify(token)
            .map_err(|_| Error::AccessDenied)
    }

    /// Verify a presented refresh token's signature and expiry. The
    /// fingerprint check happens separately in [`Issuer::rotate`].
    pub fn verify_refresh(&self, token: &str) -> Result<Claims> {
        self.refresh_profile
            .verify(token)
            .map_err(|_| Error::AccessDenied)
    }

    /// Issue an access+refresh pair for a principal.
    fn issue_pair(&self, principal_id: &str, email: &str) -> Result<TokenPair> {
        let access_token = self
            .access_profile
            .issue(principal_id, email)
            .map_err(|e| Error::Internal(e.to_string()))?;
        let refresh_token = self
            .refresh_profile
            .issue(principal_id, email)
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

fn store_error(e: principal_store::Error) -> Error {
    match e {
        principal_store::Error::NotFound(msg) => Error::NotFound(msg),
        principal_store::Error::Conflict(msg) => Error::Conflict(msg),
        other => Error::Internal(other.to_string()),
    }
}
