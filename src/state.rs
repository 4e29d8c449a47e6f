use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::firebase::FirebaseApp;
use crate::storage::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let firebase = FirebaseApp::initialize(config)?;
        Ok(Self::from_parts(
            firebase.verifier.clone(),
            firebase.store.clone(),
        ))
    }

    pub fn from_parts(
        verifier: Arc<dyn IdentityVerifier>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self { verifier, store }
    }
}
