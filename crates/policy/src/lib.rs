//! Runtime policy hooks and model routing.
//!
//! Hooks scan every string in an execution input: injection phrases block
//! the execution, embedded credentials are replaced with
//! [`aios_common::secrets::REDACTED_SECRET`]. The router maps a use case,
//! a budget and a policy pack to a model id.

pub mod error;
pub mod hooks;
pub mod router;

pub use {
    error::{Error, Result},
    hooks::{HookOutcome, Telemetry, apply_runtime_hooks},
    router::{ModelRouter, PolicyPack, RouteDecision, RouteRequest},
};
