//! Fixed RSA key and token builders shared by the test modules.

use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use time::OffsetDateTime;

use super::claims::IdTokenClaims;

pub const TEST_PROJECT: &str = "templecals-test";
pub const TEST_KID: &str = "test-key-1";

const TEST_PRIVATE_KEY: &[u8] = include_bytes!("testdata/rsa_test_key.pem");
const TEST_JWKS: &str = include_str!("testdata/jwks.json");

pub fn test_jwks() -> JwkSet {
    serde_json::from_str(TEST_JWKS).expect("jwks fixture parses")
}

pub fn test_jwks_json() -> &'static str {
    TEST_JWKS
}

pub fn id_token_claims(uid: &str) -> IdTokenClaims {
    let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
    IdTokenClaims {
        sub: uid.into(),
        aud: TEST_PROJECT.into(),
        iss: format!("https://securetoken.google.com/{TEST_PROJECT}"),
        iat: now,
        exp: now + 60 * 60,
        auth_time: Some(now),
        email: None,
    }
}

pub fn sign_id_token(kid: &str, claims: &IdTokenClaims) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.into());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("test key parses");
    encode(&header, claims, &key).expect("sign test token")
}

pub fn sign_hs256(claims: &IdTokenClaims) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.into());
    encode(&header, claims, &EncodingKey::from_secret(b"not-google")).expect("sign hs256")
}

pub fn private_key_pem() -> String {
    String::from_utf8(TEST_PRIVATE_KEY.to_vec()).expect("pem is utf-8")
}
