use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::auth::password::PasswordDigest;

/// Which backend holds the user list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    File,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown USER_STORE `{other}` (expected file or memory)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub public_dir: PathBuf,
    pub password_digest: PasswordDigest,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .map(|v| v.parse::<u16>().context("APP_PORT must be a port number"))
            .transpose()?
            .unwrap_or(8080);
        let store = StoreConfig {
            kind: std::env::var("USER_STORE")
                .ok()
                .map(|v| v.parse::<StoreKind>())
                .transpose()?
                .unwrap_or(StoreKind::File),
            path: std::env::var("USER_STORE_PATH")
                .unwrap_or_else(|_| "data/users.json".into())
                .into(),
        };
        let public_dir: PathBuf = std::env::var("PUBLIC_DIR")
            .unwrap_or_else(|_| "public".into())
            .into();
        let password_digest = std::env::var("PASSWORD_DIGEST")
            .ok()
            .map(|v| v.parse::<PasswordDigest>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            store,
            public_dir,
            password_digest,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_parses_case_insensitively() {
        assert_eq!("File".parse::<StoreKind>().unwrap(), StoreKind::File);
        assert_eq!(" memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("postgres".parse::<StoreKind>().is_err());
    }
}
