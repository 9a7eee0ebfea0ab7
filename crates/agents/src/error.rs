use aios_common::FailureClass;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("invalid agent catalog: {0}")]
    Catalog(String),
    #[error("invalid agent '{name}': {reason}")]
    InvalidAgent { name: String, reason: String },
    #[error("duplicate agent name '{0}'")]
    Duplicate(String),
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),
}

impl Error {
    #[must_use]
    pub fn class(&self) -> FailureClass {
        FailureClass::Validation
    }
}

pub type Result<T> = std::result::Result<T, Error>;
