use std::{sync::Arc, time::Duration};

use {async_trait::async_trait, tokio_util::sync::CancellationToken, tracing::info};

use crate::{
    callback_server::{CallbackServer, generate_state},
    error::Result,
};

/// Produces an OAuth authorization code.
#[async_trait]
pub trait OAuthCodeResolver: Send + Sync {
    async fn resolve_code(&self, cancel: &CancellationToken) -> Result<String>;
}

type ReadyHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Resolves the code by waiting on a fresh [`CallbackServer`].
pub struct LoopbackResolver {
    state: String,
    timeout: Duration,
    on_ready: Option<ReadyHook>,
}

impl LoopbackResolver {
    /// `state` defaults to a random value when `None`.
    pub fn new(state: Option<String>, timeout: Duration) -> Self {
        Self {
            state: state
                .filter(|s| !s.is_empty())
                .unwrap_or_else(generate_state),
            timeout,
            on_ready: None,
        }
    }

    /// Called with `(redirect_uri, state)` once the listener is bound, e.g.
    /// to open the provider's consent page.
    #[must_use]
    pub fn on_ready(mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Arc::new(hook));
        self
    }

    pub fn state(&self) -> &str {
        &self.state
    }
}

#[async_trait]
impl OAuthCodeResolver for LoopbackResolver {
    async fn resolve_code(&self, cancel: &CancellationToken) -> Result<String> {
        aios_common::ensure_active(cancel)?;
        let server = CallbackServer::bind().await?;
        let redirect_uri = server.redirect_uri();
        match &self.on_ready {
            Some(hook) => hook(&redirect_uri, &self.state),
            None => info!(%redirect_uri, "complete authorization in your browser"),
        }
        server.wait_for_code(&self.state, self.timeout, cancel).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn resolves_through_loopback() {
        let resolver = LoopbackResolver::new(Some("fixed".into()), Duration::from_secs(5))
            .on_ready(|uri, state| {
                let url = format!("{uri}?state={state}&code=the-code");
                tokio::spawn(async move {
                    let _ = reqwest::get(url).await;
                });
            });
        assert_eq!(resolver.state(), "fixed");
        let code = resolver
            .resolve_code(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, "the-code");
    }

    #[tokio::test]
    async fn cancelled_before_bind() {
        let resolver = LoopbackResolver::new(None, Duration::from_secs(5));
        assert_eq!(resolver.state().len(), 32);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = resolver.resolve_code(&cancel).await.unwrap_err();
        assert_eq!(err.class(), aios_common::FailureClass::Cancelled);
    }
}
