//! Typed HTTP calls against the token service
//!
//! One function per wire operation. Authorization failures surface as
//! `Error::Unauthorized`; other non-success statuses become `Error::Http`
//! with the status and body for diagnostics.

use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use serde_json::json;

use session_tokens::{LoginResponse, PrincipalSummary, TokenPair};

use crate::error::{Error, Result};

/// HTTP client for the auth endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// POST /auth/login — authenticate with email + password.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<LoginResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("invalid login response: {e}")))
    }

    /// POST /user/register — create a principal.
    pub async fn register(&self, email: &str, password: &str) -> Result<PrincipalSummary> {
        let response = self
            .http
            .post(format!("{}/user/register", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("register request failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<PrincipalSummary>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("invalid register response: {e}")))
    }

    /// POST /auth/refresh — present the refresh token as a bearer
    /// credential, receive a fresh pair. The presented token is
    /// single-use: a successful call invalidates it server-side.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair> {
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .bearer_auth(refresh_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<TokenPair>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("invalid refresh response: {e}")))
    }

    /// POST /auth/logout — authorized by the access token. Clears the
    /// server-side fingerprint.
    pub async fn logout(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

        check_status(response).await?;
        Ok(())
    }
}

/// Map non-success statuses to errors, consuming the body for context.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Err(Error::Http(format!("token service returned {status}: {body}")))
}

/// The single operation the renewal coordinator needs from the network.
///
/// Split out as a trait so the coordinator can be driven by a fake in
/// tests. Uses `Pin<Box<dyn Future>>` for dyn-compatibility
/// (`Arc<dyn RenewalApi>`).
pub trait RenewalApi: Send + Sync {
    fn rotate<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair>> + Send + 'a>>;
}

impl RenewalApi for ApiClient {
    fn rotate<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair>> + Send + 'a>> {
        Box::pin(ApiClient::rotate(self, refresh_token))
    }
}
