//! Google Drive onboarding: obtain a token, store it, then mark the
//! connection in tray state.

use {
    aios_config::AiosConfig,
    aios_oauth::OAuthCodeResolver,
    aios_skills::install::SkillInstaller,
    aios_tray::TrayState,
    secrecy::{ExposeSecret, SecretString},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{connector::Connector, error::Result};

/// Environment variable holding a pre-issued token that skips the browser
/// flow.
pub const OAUTH_TOKEN_ENV: &str = "AIOS_OAUTH_TOKEN";

/// Uses `preset_token` when it is non-empty, otherwise waits for an
/// authorization code from `resolver`. Tray state is only written after the
/// token has been stored.
pub async fn onboard_google_drive(
    config: &AiosConfig,
    resolver: &dyn OAuthCodeResolver,
    connector: &Connector,
    installer: &dyn SkillInstaller,
    preset_token: Option<SecretString>,
    cancel: &CancellationToken,
) -> Result<TrayState> {
    aios_common::ensure_active(cancel)?;
    let token = match preset_token.filter(|t| !t.expose_secret().trim().is_empty()) {
        Some(token) => {
            info!("using preset Google Drive token");
            token
        },
        None => SecretString::new(resolver.resolve_code(cancel).await?),
    };
    connector.connect_google_drive(token, cancel).await?;
    let state = aios_tray::refresh(config, installer, Some(true), cancel).await?;
    info!(skills = state.skills.len(), "Google Drive onboarding complete");
    Ok(state)
}
