//! Loopback OAuth callback listener and the code resolver built on it.

pub mod callback_server;
pub mod error;
pub mod resolver;

pub use {
    callback_server::{CALLBACK_PATH, CallbackServer, generate_state},
    error::{Error, Result},
    resolver::{LoopbackResolver, OAuthCodeResolver},
};
