use serde::{Deserialize, Serialize};

/// Payload of a Firebase ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,     // firebase uid
    pub aud: String,     // project id
    pub iss: String,     // https://securetoken.google.com/<project id>
    pub iat: u64,        // issued at (unix timestamp)
    pub exp: u64,        // expires at (unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
