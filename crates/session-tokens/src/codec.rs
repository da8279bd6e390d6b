//! Token issue and verify against a secret+lifetime profile
//!
//! Two profiles exist concurrently with distinct secrets and lifetimes:
//! `Access` (minutes) and `Refresh` (days). A token carries its kind as a
//! claim, so even if the two profiles were misconfigured with the same
//! secret, verifying a token with the wrong profile still fails — the
//! profiles are never interchangeable.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::Secret;

use crate::error::{Error, Result};

/// Which of the two token profiles a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived: authorizes ordinary requests
    Access,
    /// Long-lived: authorizes renewal only, single-use against the store
    Refresh,
}

impl TokenKind {
    /// Kind label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claims carried by every signed token.
///
/// `exp` and `iat` are unix timestamps in seconds. `kind` binds the token
/// to the profile that issued it. `jti` makes every issued token unique:
/// two pairs issued within the same second must still produce distinct
/// fingerprints, or rotation-on-use could not tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: String,
    pub email: String,
    pub kind: TokenKind,
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

/// A named secret+lifetime profile for issuing and verifying tokens.
///
/// Construction fails with `Error::Config` if the secret is empty or the
/// lifetime is zero — both checks happen once at startup, never per call.
pub struct Profile {
    kind: TokenKind,
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl Profile {
    pub fn new(kind: TokenKind, secret: &Secret<String>, lifetime: Duration) -> Result<Self> {
        let raw = secret.expose();
        if raw.is_empty() {
            return Err(Error::Config(format!(
                "{} token secret is empty",
                kind.label()
            )));
        }
        if lifetime.is_zero() {
            return Err(Error::Config(format!(
                "{} token lifetime must be greater than 0",
                kind.label()
            )));
        }
        Ok(Self {
            kind,
            encoding: EncodingKey::from_secret(raw.as_bytes()),
            decoding: DecodingKey::from_secret(raw.as_bytes()),
            lifetime,
        })
    }

    /// Issue a signed token for the given principal.
    ///
    /// Expiry is computed from the profile lifetime at call time.
    pub fn issue(&self, subject: &str, email: &str) -> Result<String> {
        let now = unix_now();
        let claims = Claims {
            sub: subject.to_owned(),
            email: email.to_owned(),
            kind: self.kind,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.lifetime.as_secs(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Signing(e.to_string()))
    }

    /// Verify a token's signature, expiry, and kind.
    ///
    /// A token of the other kind fails even under this profile's secret.
    /// Malformed tokens and wrong-kind tokens both surface as
    /// `InvalidSignature` — callers get no detail about why trust failed.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::Expired,
                _ => Error::InvalidSignature,
            }
        })?;
        if data.claims.kind != self.kind {
            return Err(Error::InvalidSignature);
        }
        Ok(data.claims)
    }
}

/// Current unix time in seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
