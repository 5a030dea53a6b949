use crate::auth::services::CredentialService;
use crate::config::{AppConfig, StoreKind};
use crate::storage::{JsonFileStore, LocalStore, UserStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<CredentialService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn UserStore> = match config.store.kind {
            StoreKind::File => {
                let store = JsonFileStore::open(&config.store.path)
                    .await
                    .with_context(|| format!("open user store {}", config.store.path.display()))?;
                info!(path = %store.path().display(), "using file user store");
                Arc::new(store)
            }
            StoreKind::Memory => {
                info!("using in-memory user store; accounts are lost on shutdown");
                Arc::new(LocalStore::new())
            }
        };

        if !config.password_digest.is_cryptographic() {
            warn!("PASSWORD_DIGEST=base64 is a compatibility encoding and is not safe for real systems");
        }

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let credentials = Arc::new(CredentialService::new(store, config.password_digest));
        Self {
            config,
            credentials,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_store(Arc::new(LocalStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_store(store: Arc<dyn UserStore>) -> Self {
        use crate::auth::password::PasswordDigest;
        use crate::config::StoreConfig;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreConfig {
                kind: StoreKind::Memory,
                path: "unused.json".into(),
            },
            public_dir: "public".into(),
            password_digest: PasswordDigest::Sha256,
        });

        Self::from_parts(config, store)
    }
}
