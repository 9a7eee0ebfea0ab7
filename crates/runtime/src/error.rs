use aios_common::{Cancelled, FailureClass};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("token key must not be empty")]
    EmptyKey,
    #[error("token value must not be empty")]
    EmptyValue,
    #[error("skill id must not be empty")]
    EmptySkillId,
    #[error("keychain {op} failed: {source}")]
    Keychain {
        op: &'static str,
        #[source]
        source: keyring::Error,
    },
    #[error("keychain task failed: {0}")]
    KeychainTask(String),
    #[error("circuit breaker open; retry after cooldown")]
    CircuitOpen,
    #[error("blocked by runtime policy: {}", violations.join(", "))]
    Blocked { violations: Vec<String> },
    #[error(transparent)]
    Policy(#[from] aios_policy::Error),
    #[error(transparent)]
    OAuth(#[from] aios_oauth::Error),
    #[error(transparent)]
    Tray(#[from] aios_tray::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::EmptyKey | Self::EmptyValue | Self::EmptySkillId => FailureClass::Validation,
            Self::Keychain { .. } | Self::KeychainTask(_) | Self::CircuitOpen => {
                FailureClass::TransientConnector
            },
            Self::Blocked { .. } => FailureClass::PolicyBlocked,
            Self::Policy(e) => e.class(),
            Self::OAuth(e) => e.class(),
            Self::Tray(e) => e.class(),
            Self::Cancelled(_) => FailureClass::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
