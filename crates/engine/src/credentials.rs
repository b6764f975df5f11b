//! Push-gateway credential exchange.
//!
//! Signs an RS256 service-account assertion and trades it for a short-lived
//! bearer token scoped to the messaging capability. A fresh token is fetched
//! on every dispatch invocation; nothing is cached across invocations.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use courier_common::error::AppError;
use courier_common::types::AccessToken;

/// OAuth scope granting send access to the push gateway.
pub const PUSH_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Grant type for the signed-assertion exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Service account credentials, as exported by the gateway console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccount {
    /// Load and parse the service account JSON file.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read service account file {path}: {e}"))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("malformed service account file {path}: {e}")))
    }
}

/// Source of short-lived bearer tokens for the push gateway.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, AppError>;
}

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Exchanges a Google service-account key for an OAuth2 access token.
pub struct GoogleTokenProvider {
    account: ServiceAccount,
    http: reqwest::Client,
}

impl GoogleTokenProvider {
    pub fn new(account: ServiceAccount) -> Self {
        Self {
            account,
            http: reqwest::Client::new(),
        }
    }

    fn signed_assertion(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: self.account.client_email.clone(),
            scope: PUSH_SCOPE.to_string(),
            aud: self.account.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| AppError::Auth(format!("invalid service account key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AppError::Auth(format!("failed to sign assertion: {e}")))
    }
}

#[async_trait]
impl AccessTokenProvider for GoogleTokenProvider {
    async fn fetch_token(&self) -> Result<AccessToken, AppError> {
        let assertion = self.signed_assertion()?;
        let params = [
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("token endpoint unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Auth(format!(
                "token exchange rejected with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("malformed token response: {e}")))?;

        tracing::debug!(
            expires_in = token.expires_in,
            "Obtained push gateway access token"
        );

        Ok(AccessToken::new(token.access_token))
    }
}
