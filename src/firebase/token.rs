use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use super::credentials::ServiceAccountKey;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: u64 = 60 * 60;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("sign token assertion: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token exchange: {0}")]
    Exchange(#[source] reqwest::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// OAuth2 bearer tokens for a service account (JWT bearer grant).
pub struct AccessTokenSource {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    key_id: String,
    encoding: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenSource {
    pub fn new(http: reqwest::Client, key: &ServiceAccountKey) -> Result<Self, TokenError> {
        let encoding =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(TokenError::Sign)?;
        Ok(Self {
            http,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            key_id: key.private_key_id.clone(),
            encoding,
            cached: Mutex::new(None),
        })
    }

    /// Current access token, exchanging a fresh assertion when the cached
    /// one is missing or about to expire.
    pub async fn token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.refresh_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn assertion(&self) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        encode(&header, &claims, &self.encoding).map_err(TokenError::Sign)
    }

    async fn exchange(&self) -> Result<CachedToken, TokenError> {
        let assertion = self.assertion()?;
        let res: TokenResponse = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(TokenError::Exchange)?
            .json()
            .await
            .map_err(TokenError::Exchange)?;

        let lifetime = Duration::from_secs(res.expires_in).saturating_sub(REFRESH_MARGIN);
        debug!(expires_in = res.expires_in, "service account token issued");
        Ok(CachedToken {
            value: res.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}
