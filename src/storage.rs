use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::repo_types::UserRecord;

/// Key under which [`LocalStore`] keeps the serialized user list.
pub const LOCAL_USERS_KEY: &str = "harbor.users";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence for the user list.
///
/// Every write replaces the whole list. Stored entries that do not decode
/// into a [`UserRecord`] are left out of reads but kept verbatim on rewrite,
/// and their `email` still counts as taken.
///
/// `append` reads, pushes and writes without holding a lock across the three
/// steps, so two concurrent registrations of the same new email can both
/// succeed. Callers that need strict uniqueness under concurrency must
/// serialize appends themselves.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All records in insertion order. Missing or unreadable state reads as empty.
    async fn load_all(&self) -> Vec<UserRecord>;

    /// Exact match on an already-normalized email.
    async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.load_all().await.into_iter().find(|u| u.email == email)
    }

    /// Whether any stored entry, decodable or not, claims this email.
    async fn email_taken(&self, email: &str) -> bool {
        self.find_by_email(email).await.is_some()
    }

    async fn append(&self, record: UserRecord) -> Result<(), StoreError>;
}

/// Parses the stored list into raw entries. Only text that is not a JSON
/// array reads as empty.
fn parse_entries(raw: &str, source: &str) -> Vec<Value> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, source, "user list is corrupt; treating as empty");
            Vec::new()
        }
    }
}

/// Entries that do not fit [`UserRecord`] are skipped, not fatal.
fn decode_users(entries: Vec<Value>) -> Vec<UserRecord> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed user record");
                None
            }
        })
        .collect()
}

fn entries_claim_email(entries: &[Value], email: &str) -> bool {
    entries
        .iter()
        .any(|entry| entry.get("email").and_then(Value::as_str) == Some(email))
}

/// JSON array on disk, rewritten in full on every append.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the store, creating the parent directory and an empty `[]`
    /// file when nothing exists yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, "[]").await?;
            debug!(path = %path.display(), "created empty user store");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Vec<Value> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => parse_entries(&raw, "file"),
            Err(e) => {
                warn!(error = %e, "user store unreadable; treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_entries(&self, entries: &[Value]) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn load_all(&self) -> Vec<UserRecord> {
        decode_users(self.read_entries().await)
    }

    async fn email_taken(&self, email: &str) -> bool {
        entries_claim_email(&self.read_entries().await, email)
    }

    async fn append(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut entries = self.read_entries().await;
        entries.push(serde_json::to_value(&record)?);
        self.write_entries(&entries).await
    }
}

/// In-process key/value area holding the user list as JSON text, the way a
/// browser keeps it in local storage.
#[derive(Debug, Default)]
pub struct LocalStore {
    items: RwLock<HashMap<String, String>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().await.get(key).cloned()
    }

    pub async fn set_item(&self, key: &str, value: impl Into<String>) {
        self.items.write().await.insert(key.to_string(), value.into());
    }

    async fn read_entries(&self) -> Vec<Value> {
        match self.get_item(LOCAL_USERS_KEY).await {
            Some(raw) => parse_entries(&raw, "local"),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl UserStore for LocalStore {
    async fn load_all(&self) -> Vec<UserRecord> {
        decode_users(self.read_entries().await)
    }

    async fn email_taken(&self, email: &str) -> bool {
        entries_claim_email(&self.read_entries().await, email)
    }

    async fn append(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut entries = self.read_entries().await;
        entries.push(serde_json::to_value(&record)?);
        let raw = serde_json::to_string(&entries)?;
        self.set_item(LOCAL_USERS_KEY, raw).await;
        Ok(())
    }
}

/// Serves reads from an inner [`LocalStore`] and fails every append.
#[cfg(test)]
pub(crate) struct ReadOnlyStore {
    pub inner: LocalStore,
}

#[cfg(test)]
#[async_trait]
impl UserStore for ReadOnlyStore {
    async fn load_all(&self) -> Vec<UserRecord> {
        self.inner.load_all().await
    }

    async fn append(&self, _record: UserRecord) -> Result<(), StoreError> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied: /srv/harbor/data/users.json",
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(email: &str) -> UserRecord {
        UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Ada".into(),
            email: email.into(),
            password_hash: "ab".repeat(32),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn open_seeds_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("users.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn file_store_appends_and_finds() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json")).await.unwrap();
        store.append(record("ada@example.com")).await.unwrap();
        store.append(record("bob@example.com")).await.unwrap();

        let all = store.load_all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email, "ada@example.com");
        assert!(store.find_by_email("bob@example.com").await.is_some());
        assert!(store.find_by_email("BOB@example.com").await.is_none());
    }

    #[tokio::test]
    async fn file_store_persists_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json")).await.unwrap();
        store.append(record("ada@example.com")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = &value[0];
        for field in ["id", "name", "email", "passwordHash", "createdAt"] {
            assert!(first.get(field).is_some(), "missing {field}");
        }

        let reopened = JsonFileStore::open(store.path()).await.unwrap();
        assert_eq!(reopened.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty_and_recovers_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.load_all().await.is_empty());

        store.append(record("ada@example.com")).await.unwrap();
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json")).await.unwrap();
        std::fs::remove_file(store.path()).unwrap();
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn local_store_round_trips_through_key() {
        let store = LocalStore::new();
        assert!(store.load_all().await.is_empty());
        store.append(record("ada@example.com")).await.unwrap();

        let raw = store.get_item(LOCAL_USERS_KEY).await.unwrap();
        assert!(raw.contains("\"passwordHash\""));
        assert!(store.find_by_email("ada@example.com").await.is_some());
    }

    #[tokio::test]
    async fn local_store_corrupt_value_reads_as_empty() {
        let store = LocalStore::new();
        store.set_item(LOCAL_USERS_KEY, "[{\"broken\":").await;
        assert!(store.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_record_does_not_hide_or_drop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let ada = serde_json::to_value(record("ada@example.com")).unwrap();
        let bob = serde_json::json!({
            "id": "1700000000000",
            "name": "Bob",
            "email": "bob@example.com",
            "passwordHash": "ab".repeat(32),
        });
        std::fs::write(&path, serde_json::to_string(&vec![ada, bob]).unwrap()).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let all = store.load_all().await;
        assert_eq!(all.len(), 1);
        assert!(store.find_by_email("ada@example.com").await.is_some());
        assert!(store.email_taken("ada@example.com").await);
        assert!(store.email_taken("bob@example.com").await);
        assert!(!store.email_taken("carol@example.com").await);

        store.append(record("carol@example.com")).await.unwrap();
        let raw: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let emails: Vec<_> = raw.iter().filter_map(|e| e["email"].as_str()).collect();
        assert_eq!(emails, ["ada@example.com", "bob@example.com", "carol@example.com"]);
    }

    #[tokio::test]
    async fn local_store_keeps_malformed_entries_on_append() {
        let store = LocalStore::new();
        store
            .set_item(LOCAL_USERS_KEY, r#"[{"email":"old@example.com","createdAt":1700000000000}]"#)
            .await;
        assert!(store.load_all().await.is_empty());
        assert!(store.email_taken("old@example.com").await);

        store.append(record("ada@example.com")).await.unwrap();
        let raw = store.get_item(LOCAL_USERS_KEY).await.unwrap();
        assert!(raw.contains("old@example.com"));
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn read_only_store_reports_io_failure() {
        let store = ReadOnlyStore {
            inner: LocalStore::new(),
        };
        let err = store.append(record("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
