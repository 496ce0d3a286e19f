//! Core types for the Telegram Bot API client.
//!
//! Transport, polling and webhook crates all build on the types here: the error
//! enum, credential redaction, configuration, domain objects and response envelopes.

pub mod config;
pub mod envelope;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod redact;
pub mod types;

pub use errors::{Error, Result};
