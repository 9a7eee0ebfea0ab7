use aios_common::FailureClass;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("use case must not be empty")]
    EmptyUseCase,
    #[error("unknown policy pack: {0}")]
    UnknownPack(String),
}

impl Error {
    #[must_use]
    pub fn class(&self) -> FailureClass {
        FailureClass::Validation
    }
}

pub type Result<T> = std::result::Result<T, Error>;
