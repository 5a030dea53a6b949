use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser, error::CredentialError, password::PasswordDigest,
        repo_types::UserRecord,
    },
    storage::UserStore,
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Identity key for lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// Register/login rules over a [`UserStore`].
pub struct CredentialService {
    store: Arc<dyn UserStore>,
    digest: PasswordDigest,
}

impl CredentialService {
    pub fn new(store: Arc<dyn UserStore>, digest: PasswordDigest) -> Self {
        Self { store, digest }
    }

    pub fn hash(&self, password: &str) -> String {
        self.digest.hash(password)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<PublicUser, CredentialError> {
        if name.is_empty() {
            return Err(CredentialError::Validation("name required"));
        }
        if email.is_empty() || password.is_empty() {
            return Err(CredentialError::Validation("missing fields"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CredentialError::Validation("password too short"));
        }
        if password != confirm_password {
            return Err(CredentialError::Validation("password mismatch"));
        }

        let email = normalize_email(email);
        if self.store.email_taken(&email).await {
            return Err(CredentialError::Conflict("email taken"));
        }

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            password_hash: self.hash(password),
            created_at: OffsetDateTime::now_utc(),
        };
        let public = PublicUser::from(&user);
        let user_id = user.id.clone();
        self.store.append(user).await?;

        info!(%user_id, email = %public.email, "user registered");
        Ok(public)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, CredentialError> {
        if email.is_empty() || password.is_empty() {
            return Err(CredentialError::Validation("missing fields"));
        }

        let email = normalize_email(email);
        let Some(user) = self.store.find_by_email(&email).await else {
            return Err(CredentialError::NotFound("no account"));
        };

        if self.hash(password) != user.password_hash {
            return Err(CredentialError::Auth("wrong password"));
        }

        info!(user_id = %user.id, %email, "user logged in");
        Ok(PublicUser::from(&user))
    }
}
