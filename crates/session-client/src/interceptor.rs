//! Authenticated request interceptor
//!
//! Wraps outbound calls: attaches the live access token, detects a 401,
//! asks the coordinator for a renewal, and replays the original request
//! exactly once with the new token. A second 401 after the replay
//! surfaces as `Error::Unauthorized` with no further renewal attempt, so
//! a server that consistently rejects the principal costs exactly two
//! attempts, never a loop.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{debug, warn};

use session_tokens::PrincipalSummary;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::renewal::RenewalCoordinator;
use crate::store::{AccessTokenCell, RefreshTokenFile};

/// Authenticated HTTP client for a single principal session.
///
/// Owns the credential stores and the renewal coordinator. Requests built
/// through [`AuthClient::request`] and sent with [`AuthClient::send`] get
/// the interceptor behavior; login/logout manage the session lifecycle.
pub struct AuthClient {
    http: reqwest::Client,
    api: Arc<ApiClient>,
    access: Arc<AccessTokenCell>,
    refresh: Arc<RefreshTokenFile>,
    coordinator: Arc<RenewalCoordinator>,
}

impl AuthClient {
    /// Create a client session against `base_url`, loading any refresh
    /// token persisted at `refresh_token_path` from a previous run.
    pub async fn connect(base_url: impl Into<String>, refresh_token_path: PathBuf) -> Result<Self> {
        let http = reqwest::Client::new();
        let api = Arc::new(ApiClient::new(http.clone(), base_url));
        let access = Arc::new(AccessTokenCell::new());
        let refresh = Arc::new(RefreshTokenFile::load(refresh_token_path).await?);
        let coordinator = Arc::new(RenewalCoordinator::new(
            api.clone(),
            access.clone(),
            refresh.clone(),
        ));
        Ok(Self {
            http,
            api,
            access,
            refresh,
            coordinator,
        })
    }

    /// Whether a refresh token is available, either from this session's
    /// login or persisted by a previous run.
    pub async fn has_session(&self) -> bool {
        self.refresh.get().await.is_some()
    }

    /// Log in and store the issued pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<PrincipalSummary> {
        let response = self.api.login(email, password).await?;
        self.refresh.set(&response.tokens.refresh_token).await?;
        self.access.set(response.tokens.access_token).await;
        debug!(principal_id = %response.principal.id, "logged in");
        Ok(response.principal)
    }

    /// Register a new principal. Does not log in.
    pub async fn register(&self, email: &str, password: &str) -> Result<PrincipalSummary> {
        self.api.register(email, password).await
    }

    /// Log out: best-effort server-side invalidation, then clear both
    /// local stores unconditionally.
    pub async fn logout(&self) -> Result<()> {
        if let Some(token) = self.access.get().await {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "server-side logout failed, clearing local session anyway");
            }
        }
        self.access.clear().await;
        self.refresh.clear().await?;
        Ok(())
    }

    /// Start building a request against a service path.
    pub fn request(&self, method: reqwest::Method, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.http.request(method, url)
    }

    /// Send a request with the interceptor behavior.
    ///
    /// Requests with streaming bodies cannot be cloned and therefore
    /// cannot be replayed; a 401 on such a request surfaces immediately.
    pub async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let replay = request.try_clone();
        let mut request = request;

        if let Some(token) = self.access.get().await {
            request
                .headers_mut()
                .insert(AUTHORIZATION, bearer(&token)?);
        }

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| Error::Http(format!("request failed: {e}")))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(mut replay) = replay else {
            return Err(Error::Unauthorized);
        };

        // On coordinator failure the stores are already cleared; surface
        // the unauthenticated state without replaying.
        let token = self.coordinator.clone().renew().await?;
        debug!("replaying request after renewal");

        replay.headers_mut().insert(AUTHORIZATION, bearer(&token)?);
        let response = self
            .http
            .execute(replay)
            .await
            .map_err(|e| Error::Http(format!("replayed request failed: {e}")))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Retry budget spent: renewal succeeded but the server still
            // rejects the principal
            return Err(Error::Unauthorized);
        }
        Ok(response)
    }
}

fn bearer(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| Error::Http(format!("invalid bearer token: {e}")))
}
