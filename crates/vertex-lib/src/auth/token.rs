//! OAuth2 access tokens via the JWT-bearer grant
//!
//! A signed RS256 assertion is posted to the key's `token_uri` and the
//! returned bearer token is cached until shortly before it expires.

use super::Credential;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Lifetime requested for each assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 60;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Bearer token with its expiry
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token can still be used at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Build the signed assertion exchanged for an access token
    pub fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id().map(str::to_string);

        let claims = Claims {
            iss: self.account(),
            scope: self.scopes().join(" "),
            aud: self.token_uri().as_str(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, self.signing_key())
            .map_err(|e| Error::Credential(format!("failed to sign token assertion: {}", e)))
    }
}

/// Exchange a signed assertion for an access token
pub async fn exchange(http: &Client, credential: &Credential) -> Result<AccessToken> {
    let now = Utc::now();
    let assertion = credential.signed_assertion(now)?;

    let response = http
        .post(credential.token_uri().clone())
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| Error::Credential(format!("token request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Credential(format!("failed to read token response: {}", e)))?;

    if !status.is_success() {
        let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => body,
        };
        return Err(Error::Credential(format!(
            "token exchange rejected ({}): {}",
            status, detail
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| Error::Credential(format!("malformed token response: {}", e)))?;

    // Tokens never outlive the assertion that minted them
    let lifetime = token
        .expires_in
        .unwrap_or(ASSERTION_LIFETIME_SECS)
        .clamp(0, ASSERTION_LIFETIME_SECS);
    let expires_at = now + Duration::seconds(lifetime);
    info!(account = %credential.account(), %expires_at, "Obtained access token");

    Ok(AccessToken {
        secret: token.access_token,
        expires_at,
    })
}

/// Caches access tokens per service account
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a fresh bearer token, exchanging a new one if needed
    pub async fn bearer(&self, http: &Client, credential: &Credential) -> Result<String> {
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = tokens.get(credential.account()) {
            if token.is_fresh(Utc::now()) {
                return Ok(token.secret().to_string());
            }
            debug!(account = %credential.account(), "Cached access token is about to expire, refreshing");
        }

        let token = exchange(http, credential).await?;
        let secret = token.secret().to_string();
        tokens.insert(credential.account().to_string(), token);
        Ok(secret)
    }
}
