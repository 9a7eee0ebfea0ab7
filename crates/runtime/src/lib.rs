//! Execution runtime: token storage, the Google Drive connector behind
//! retry and a circuit breaker, execution planning, health, and OAuth
//! onboarding.

pub mod connector;
pub mod error;
pub mod execution;
pub mod health;
pub mod onboarding;
pub mod resilience;
pub mod token_store;

pub use {
    connector::{Connector, GOOGLE_DRIVE_KEY},
    error::{Error, Result},
    execution::{ExecutionPlan, ExecutionRequest, prepare_execution},
    health::{Health, health},
    onboarding::{OAUTH_TOKEN_ENV, onboard_google_drive},
    resilience::{CircuitBreaker, RetryPolicy},
    token_store::{KeychainTokenStore, MemoryTokenStore, TokenStore, token_store_from_config},
};
