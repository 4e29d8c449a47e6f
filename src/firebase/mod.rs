use std::sync::Arc;

use anyhow::Context;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

pub mod credentials;
pub mod token;

use crate::auth::{FirebaseVerifier, IdentityVerifier};
use crate::config::{AppConfig, StoreBackend};
use crate::storage::{DocumentStore, FirestoreStore, MemoryStore};
use credentials::ServiceAccountKey;
use token::AccessTokenSource;

static FIREBASE: OnceCell<FirebaseApp> = OnceCell::new();

/// Process-wide identity and store clients.
pub struct FirebaseApp {
    pub project_id: String,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub store: Arc<dyn DocumentStore>,
}

impl FirebaseApp {
    /// Builds the clients on first call; later calls return the same
    /// instance and ignore `config`.
    pub fn initialize(config: &AppConfig) -> anyhow::Result<&'static FirebaseApp> {
        if let Some(app) = FIREBASE.get() {
            debug!(project_id = %app.project_id, "firebase already initialized");
            return Ok(app);
        }
        FIREBASE.get_or_try_init(|| Self::build(config))
    }

    fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let fb = &config.firebase;
        let keyless_ok = fb.project_id.is_some()
            && (config.store == StoreBackend::Memory || fb.emulator_host.is_some());

        let key = match ServiceAccountKey::from_file(&fb.credentials_path) {
            Ok(key) => Some(key),
            Err(e) if keyless_ok => {
                warn!(error = %e, "no service account key; continuing without one");
                None
            }
            Err(e) => return Err(e),
        };

        let project_id = fb
            .project_id
            .clone()
            .or_else(|| key.as_ref().map(|k| k.project_id.clone()))
            .context("no project id: set FIREBASE_PROJECT_ID or provide a key file")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("templecals/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;

        let verifier: Arc<dyn IdentityVerifier> =
            Arc::new(FirebaseVerifier::new(http.clone(), &fb.jwks_url, &project_id));

        let store: Arc<dyn DocumentStore> = match (config.store, &fb.emulator_host) {
            (StoreBackend::Memory, _) => Arc::new(MemoryStore::new()),
            (StoreBackend::Firestore, Some(host)) => {
                Arc::new(FirestoreStore::emulator(http, host, &project_id))
            }
            (StoreBackend::Firestore, None) => {
                let key = key
                    .as_ref()
                    .context("service account key is required for Firestore")?;
                let tokens = Arc::new(
                    AccessTokenSource::new(http.clone(), key)
                        .context("load service account private key")?,
                );
                Arc::new(FirestoreStore::new(http, &fb.firestore_url, &project_id, tokens))
            }
        };

        info!(
            %project_id,
            store = ?config.store,
            emulator = fb.emulator_host.is_some(),
            "firebase initialized"
        );
        Ok(Self {
            project_id,
            verifier,
            store,
        })
    }
}
