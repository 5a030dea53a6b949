use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,                 // opaque, never reused
    pub name: String,
    pub email: String,              // normalized, unique
    pub password_hash: String,      // digest only, never the raw password
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
