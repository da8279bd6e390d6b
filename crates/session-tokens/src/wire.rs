//! Wire types for the auth endpoints
//!
//! Shared between the service handlers and the client library so both sides
//! agree on the schema. Request bodies reject unknown fields — the shape is
//! validated at the boundary rather than trusted at runtime.

use serde::{Deserialize, Serialize};

/// Request body for `POST /auth/login`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /user/register`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Principal summary returned by login, register, and `/user/me`.
///
/// Never carries the password hash or the renewal fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSummary {
    pub id: String,
    pub email: String,
}

/// A freshly issued access+refresh token pair.
///
/// Pairs are issued together and never individually reissued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response body for `POST /auth/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub principal: PrincipalSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_flattens_tokens() {
        let response = LoginResponse {
            principal: PrincipalSummary {
                id: "user-1".into(),
                email: "a@x.com".into(),
            },
            tokens: TokenPair {
                access_token: "at_abc".into(),
                refresh_token: "rt_def".into(),
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["principal"]["id"], "user-1");
        assert_eq!(json["access_token"], "at_abc");
        assert_eq!(json["refresh_token"], "rt_def");
    }

    #[test]
    fn login_request_rejects_unknown_fields() {
        let json = r#"{"email":"a@x.com","password":"pw","role":"admin"}"#;
        let result: Result<LoginRequest, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields must be rejected");
    }

    #[test]
    fn login_request_rejects_missing_fields() {
        let json = r#"{"email":"a@x.com"}"#;
        let result: Result<LoginRequest, _> = serde_json::from_str(json);
        assert!(result.is_err(), "missing password must be rejected");
    }

    #[test]
    fn token_pair_round_trips() {
        let json = r#"{"access_token":"at_abc","refresh_token":"rt_def"}"#;
        let pair: TokenPair = serde_json::from_str(json).unwrap();
        assert_eq!(pair.access_token, "at_abc");
        assert_eq!(pair.refresh_token, "rt_def");
    }
}
