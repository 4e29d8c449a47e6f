use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Which document store backs the meal log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub credentials_path: PathBuf,
    /// Overrides the project id found in the service-account key.
    pub project_id: Option<String>,
    pub jwks_url: String,
    pub firestore_url: String,
    /// `host:port` of a local Firestore emulator.
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub store: StoreBackend,
    pub firebase: FirebaseConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let addr: SocketAddr = format!(
            "{}:{}",
            std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
        )
        .parse()
        .context("APP_HOST/APP_PORT do not form a socket address")?;

        let store = match std::env::var("STORE_BACKEND") {
            Ok(v) => parse_store_backend(&v)?,
            Err(_) => StoreBackend::Firestore,
        };

        let firebase = FirebaseConfig {
            credentials_path: std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
                .unwrap_or_else(|_| "serviceAccountKey.json".into())
                .into(),
            project_id: non_empty_var("FIREBASE_PROJECT_ID"),
            jwks_url: std::env::var("FIREBASE_JWKS_URL")
                .unwrap_or_else(|_| DEFAULT_JWKS_URL.into()),
            firestore_url: std::env::var("FIRESTORE_URL")
                .unwrap_or_else(|_| DEFAULT_FIRESTORE_URL.into()),
            emulator_host: non_empty_var("FIRESTORE_EMULATOR_HOST"),
        };

        Ok(Self {
            addr,
            store,
            firebase,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_store_backend(raw: &str) -> anyhow::Result<StoreBackend> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "firestore" | "" => Ok(StoreBackend::Firestore),
        "memory" => Ok(StoreBackend::Memory),
        other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
    }
}
