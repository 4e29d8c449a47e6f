use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use super::claims::IdTokenClaims;

const MAX_UID_LEN: usize = 128;
const LEEWAY_SECS: u64 = 60;
const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(60 * 60);

/// Stable identifier of a verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("empty credential")]
    EmptyCredential,
    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("unsupported token algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("token header has no kid")]
    MissingKeyId,
    #[error("no signing key with kid {0}")]
    UnknownKey(String),
    #[error("token rejected: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("invalid '{0}' claim")]
    InvalidClaim(&'static str),
    #[error("fetch signing keys: {0}")]
    KeyFetch(#[source] reqwest::Error),
}

/// Resolves an opaque credential to the user it belongs to.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<UserId, AuthError>;
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

/// Verifies Firebase ID tokens against Google's published signing keys.
pub struct FirebaseVerifier {
    http: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(http: reqwest::Client, jwks_url: impl Into<String>, project_id: &str) -> Self {
        Self {
            http,
            jwks_url: jwks_url.into(),
            validation: id_token_validation(project_id),
            cache: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_keys(project_id: &str, keys: JwkSet) -> Self {
        let verifier = Self::new(reqwest::Client::new(), "http://127.0.0.1:9/unused", project_id);
        *verifier.cache.try_write().expect("fresh lock") = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + Duration::from_secs(24 * 60 * 60),
        });
        verifier
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.expires_at > Instant::now()) {
                return key_for(&cached.keys, kid);
            }
        }

        let mut cache = self.cache.write().await;
        // another request may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref().filter(|c| c.expires_at > Instant::now()) {
            return key_for(&cached.keys, kid);
        }
        let fresh = self.fetch_keys().await?;
        let key = key_for(&fresh.keys, kid);
        *cache = Some(fresh);
        key
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AuthError> {
        let res = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AuthError::KeyFetch)?;
        let ttl = max_age(res.headers()).unwrap_or(DEFAULT_KEYS_TTL);
        let keys: JwkSet = res.json().await.map_err(AuthError::KeyFetch)?;
        debug!(count = keys.keys.len(), ttl_secs = ttl.as_secs(), "fetched id token signing keys");
        Ok(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

fn id_token_validation(project_id: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[project_id]);
    validation.set_issuer(&[format!("https://securetoken.google.com/{project_id}")]);
    validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
    validation.leeway = LEEWAY_SECS;
    validation
}

fn key_for(keys: &JwkSet, kid: &str) -> Result<DecodingKey, AuthError> {
    let jwk = keys
        .find(kid)
        .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))?;
    DecodingKey::from_jwk(jwk).map_err(AuthError::InvalidToken)
}

fn max_age(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, credential: &str) -> Result<UserId, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::EmptyCredential);
        }

        let header = decode_header(credential).map_err(AuthError::Malformed)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.decoding_key(&kid).await?;

        let claims = decode::<IdTokenClaims>(credential, &key, &self.validation)
            .map_err(AuthError::InvalidToken)?
            .claims;

        let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
        if claims.iat > now + LEEWAY_SECS {
            return Err(AuthError::InvalidClaim("iat"));
        }
        if claims.auth_time.is_some_and(|t| t > now + LEEWAY_SECS) {
            return Err(AuthError::InvalidClaim("auth_time"));
        }
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(AuthError::InvalidClaim("sub"));
        }

        debug!(uid = %claims.sub, "id token verified");
        Ok(UserId(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{
        id_token_claims, sign_hs256, sign_id_token, test_jwks, test_jwks_json, TEST_KID,
        TEST_PROJECT,
    };
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn verifier() -> FirebaseVerifier {
        FirebaseVerifier::with_keys(TEST_PROJECT, test_jwks())
    }

    #[tokio::test]
    async fn verify_accepts_valid_token() {
        let token = sign_id_token(TEST_KID, &id_token_claims("u123"));
        let uid = verifier().verify(&token).await.expect("valid token");
        assert_eq!(uid, UserId::new("u123"));
    }

    #[tokio::test]
    async fn verify_rejects_empty_credential() {
        let err = verifier().verify("").await.unwrap_err();
        assert!(matches!(err, AuthError::EmptyCredential));
    }

    #[tokio::test]
    async fn verify_rejects_garbage() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[tokio::test]
    async fn verify_does_not_strip_bearer_prefix() {
        let token = sign_id_token(TEST_KID, &id_token_claims("u123"));
        let err = verifier()
            .verify(&format!("Bearer {token}"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_audience() {
        let mut claims = id_token_claims("u123");
        claims.aud = "some-other-project".into();
        let token = sign_id_token(TEST_KID, &claims);
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_issuer() {
        let mut claims = id_token_claims("u123");
        claims.iss = "https://accounts.example.com".into();
        let token = sign_id_token(TEST_KID, &claims);
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn verify_rejects_expired_token() {
        let mut claims = id_token_claims("u123");
        claims.iat -= 3 * 60 * 60;
        claims.exp = claims.iat + 60 * 60;
        let token = sign_id_token(TEST_KID, &claims);
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn verify_rejects_token_issued_in_future() {
        let mut claims = id_token_claims("u123");
        claims.iat += 10 * 60;
        let token = sign_id_token(TEST_KID, &claims);
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim("iat")));
    }

    #[tokio::test]
    async fn verify_rejects_empty_or_oversized_subject() {
        let token = sign_id_token(TEST_KID, &id_token_claims(""));
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim("sub")));

        let token = sign_id_token(TEST_KID, &id_token_claims(&"x".repeat(129)));
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim("sub")));
    }

    #[tokio::test]
    async fn verify_rejects_unknown_kid() {
        let token = sign_id_token("rotated-away", &id_token_claims("u123"));
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownKey(kid) if kid == "rotated-away"));
    }

    #[tokio::test]
    async fn verify_rejects_symmetric_algorithm() {
        let token = sign_hs256(&id_token_claims("u123"));
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedAlgorithm(Algorithm::HS256)));
    }

    #[tokio::test]
    async fn signing_keys_are_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=3600, must-revalidate")
                    .set_body_raw(test_jwks_json(), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let verifier = FirebaseVerifier::new(
            reqwest::Client::new(),
            format!("{}/jwks", server.uri()),
            TEST_PROJECT,
        );
        for uid in ["a", "b", "c"] {
            let token = sign_id_token(TEST_KID, &id_token_claims(uid));
            assert_eq!(verifier.verify(&token).await.unwrap(), UserId::new(uid));
        }
    }

    #[tokio::test]
    async fn stale_signing_keys_are_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=0")
                    .set_body_raw(test_jwks_json(), "application/json"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let verifier = FirebaseVerifier::new(
            reqwest::Client::new(),
            format!("{}/jwks", server.uri()),
            TEST_PROJECT,
        );
        for uid in ["a", "b"] {
            let token = sign_id_token(TEST_KID, &id_token_claims(uid));
            assert_eq!(verifier.verify(&token).await.unwrap(), UserId::new(uid));
        }
    }

    #[tokio::test]
    async fn key_endpoint_failure_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let verifier = FirebaseVerifier::new(
            reqwest::Client::new(),
            format!("{}/jwks", server.uri()),
            TEST_PROJECT,
        );
        let token = sign_id_token(TEST_KID, &id_token_claims("u123"));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyFetch(_)));
    }

    #[test]
    fn max_age_reads_cache_control() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            "public, max-age=19302, must-revalidate, no-transform".parse().unwrap(),
        );
        assert_eq!(max_age(&headers), Some(Duration::from_secs(19302)));
        assert_eq!(max_age(&reqwest::header::HeaderMap::new()), None);
    }
}
