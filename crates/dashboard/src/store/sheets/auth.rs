//! Google service-account authentication.
//!
//! Signs a short-lived RS256 assertion with the service account's private key
//! and exchanges it at the account's token endpoint for an OAuth access
//! token.

use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::store::StoreError;

/// OAuth scopes requested for the access token.
const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";

/// Grant type for the JWT bearer exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Token endpoint used when the key file does not name one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for each assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A parsed service-account key.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct ServiceAccountKey {
    /// Service account email (the assertion issuer).
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: SecretString,
    /// OAuth token endpoint.
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize)]
struct RawKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse the JSON key file Google issues for a service account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Credentials` if required fields are missing.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let raw: RawKey = serde_json::from_str(json)
            .map_err(|e| StoreError::Credentials(format!("service account key: {e}")))?;
        if raw.client_email.trim().is_empty() || raw.private_key.trim().is_empty() {
            return Err(StoreError::Credentials(
                "service account key has an empty client_email or private_key".to_string(),
            ));
        }
        Ok(Self {
            client_email: raw.client_email,
            private_key: SecretString::from(raw.private_key),
            token_uri: raw
                .token_uri
                .filter(|uri| !uri.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }
}

/// An OAuth access token with its local expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: SecretString,
    expires_at: Instant,
}

impl AccessToken {
    /// Wrap a token that expires `lifetime` from now.
    #[must_use]
    pub fn new(value: SecretString, lifetime: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + lifetime,
        }
    }

    /// Whether the token is still usable with the refresh margin applied.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }

    /// The bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Sign the assertion for `key`, issued at `now` (Unix seconds).
///
/// # Errors
///
/// Returns `StoreError::Credentials` if the private key is not valid PEM.
pub fn build_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, StoreError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
        .map_err(|e| StoreError::Credentials(format!("private key: {e}")))?;
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| StoreError::Credentials(format!("signing assertion: {e}")))
}

/// Exchange a fresh assertion for an access token.
///
/// # Errors
///
/// Returns `StoreError::Authentication` if the token endpoint rejects the
/// assertion.
#[instrument(skip(client, key), fields(account = %key.client_email))]
pub async fn exchange(
    client: &reqwest::Client,
    key: &ServiceAccountKey,
) -> Result<AccessToken, StoreError> {
    let assertion = build_assertion(key, chrono::Utc::now().timestamp())?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "Service account token exchange rejected");
        return Err(StoreError::Authentication(format!(
            "token endpoint returned {status}: {}",
            super::excerpt(&body)
        )));
    }

    let token: TokenResponse = response.json().await?;
    tracing::debug!(expires_in = token.expires_in, "Obtained access token");
    Ok(AccessToken::new(
        SecretString::from(token.access_token),
        Duration::from_secs(token.expires_in),
    ))
}
