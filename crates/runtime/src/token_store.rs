//! Connector token storage. Tokens never touch the filesystem: they live in
//! process memory or in the OS credential service.

use std::{collections::HashMap, sync::Arc};

use {
    aios_config::AiosConfig,
    async_trait::async_trait,
    secrecy::{ExposeSecret, SecretString},
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// `"memory"` or `"keychain"`.
    fn kind(&self) -> &'static str;

    async fn put(&self, key: &str, value: SecretString) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<SecretString>>;
}

fn check_put(key: &str, value: &SecretString) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::EmptyKey);
    }
    if value.expose_secret().is_empty() {
        return Err(Error::EmptyValue);
    }
    Ok(())
}

/// Process-local store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, SecretString>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, value: SecretString) -> Result<()> {
        check_put(key, &value)?;
        self.tokens.write().await.insert(key.to_string(), value);
        debug!(key, "stored token in memory");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        Ok(self.tokens.read().await.get(key).cloned())
    }
}

/// OS credential service (Keychain, Credential Manager, kernel keyutils).
#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    service: String,
}

impl KeychainTokenStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str, op: &'static str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).map_err(|source| Error::Keychain { op, source })
    }
}

#[async_trait]
impl TokenStore for KeychainTokenStore {
    fn kind(&self) -> &'static str {
        "keychain"
    }

    async fn put(&self, key: &str, value: SecretString) -> Result<()> {
        check_put(key, &value)?;
        let entry = self.entry(key, "open")?;
        tokio::task::spawn_blocking(move || {
            entry
                .set_password(value.expose_secret())
                .map_err(|source| Error::Keychain { op: "write", source })
        })
        .await
        .map_err(|e| Error::KeychainTask(e.to_string()))??;
        info!(service = %self.service, key, "stored token in keychain");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        if key.trim().is_empty() {
            return Err(Error::EmptyKey);
        }
        let entry = self.entry(key, "open")?;
        tokio::task::spawn_blocking(move || match entry.get_password() {
            Ok(password) => Ok(Some(SecretString::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(source) => Err(Error::Keychain { op: "read", source }),
        })
        .await
        .map_err(|e| Error::KeychainTask(e.to_string()))?
    }
}

/// Keychain store when a token service is configured, memory otherwise.
pub fn token_store_from_config(config: &AiosConfig) -> Arc<dyn TokenStore> {
    match config.token_service.as_deref() {
        Some(service) if !service.is_empty() => Arc::new(KeychainTokenStore::new(service)),
        _ => Arc::new(MemoryTokenStore::new()),
    }
}
