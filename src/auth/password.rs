use base64ct::{Base64, Encoding};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// How passwords are turned into the stored `passwordHash`.
///
/// Both modes are unsalted and deterministic, so the same password always
/// produces the same stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordDigest {
    /// Lowercase hex SHA-256.
    #[default]
    Sha256,
    /// Plain base64 of the password bytes. Compatibility shim for stores
    /// written by clients without a SHA-256 primitive; not a security measure.
    Base64,
}

impl PasswordDigest {
    pub fn hash(self, plain: &str) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(plain.as_bytes())),
            Self::Base64 => Base64::encode_string(plain.as_bytes()),
        }
    }

    pub fn is_cryptographic(self) -> bool {
        matches!(self, Self::Sha256)
    }
}

impl std::str::FromStr for PasswordDigest {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "base64" => Ok(Self::Base64),
            other => anyhow::bail!("unknown PASSWORD_DIGEST `{other}` (expected sha256 or base64)"),
        }
    }
}
