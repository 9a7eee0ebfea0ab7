use std::sync::Arc;

use {
    secrecy::{ExposeSecret, SecretString},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{
    error::{Error, Result},
    resilience::{CircuitBreaker, RetryPolicy},
    token_store::TokenStore,
};

/// Token store key for the Google Drive connector.
pub const GOOGLE_DRIVE_KEY: &str = "gdrive";

/// Writes connector tokens through a circuit breaker wrapping a retry
/// policy.
pub struct Connector {
    store: Arc<dyn TokenStore>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl Connector {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_policies(store, RetryPolicy::default(), CircuitBreaker::default())
    }

    pub fn with_policies(
        store: Arc<dyn TokenStore>,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            store,
            retry,
            breaker,
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn connect_google_drive(
        &self,
        token: SecretString,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if token.expose_secret().trim().is_empty() {
            return Err(Error::EmptyValue);
        }
        aios_common::ensure_active(cancel)?;
        self.breaker
            .call(|| {
                self.retry.run(cancel, || {
                    self.store.put(GOOGLE_DRIVE_KEY, token.clone())
                })
            })
            .await?;
        info!(store = self.store.kind(), "connected Google Drive");
        Ok(())
    }
}
