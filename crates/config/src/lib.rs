//! Configuration loading, env substitution, and path placeholder expansion.
//!
//! Resolution order (later wins): built-in defaults, an optional
//! `aios.{toml,yaml,yml,json}` in the workspace directory, then `AIOS_*`
//! environment variables. The binary applies its own flags last.
//!
//! Supports `${ENV_VAR}` substitution in config file string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod paths;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{load, load_with},
    paths::{expand_path, home_dir},
    schema::{AiosConfig, OAuthSettings},
};
