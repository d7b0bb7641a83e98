//! Command-line front end for trafficlink.
//!
//! [`args`] defines the command line, [`app`] runs a parsed command against
//! a [`CommTester`](trafficlink_core::CommTester), and [`render`] turns the
//! result into text or JSON.

pub mod app;
pub mod args;
pub mod bytes;
pub mod render;

use thiserror::Error;
use trafficlink_core::{
    LinkError, ServiceError,
    config::ConfigError,
    error::{ArgParseError, UnknownCommand},
};

pub use app::{Report, execute};
pub use args::{Cli, Command};

/// Failures that stop the CLI before an outcome exists.
#[derive(Debug, Error)]
pub enum CliError {
    /// Profile file missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Profile lookup failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Port enumeration failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Command name not in the catalog.
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),

    /// Malformed `key=value` argument.
    #[error(transparent)]
    Arguments(#[from] ArgParseError),

    /// Byte list could not be parsed.
    #[error("invalid byte list: {0}")]
    InvalidBytes(String),

    /// JSON encoding failed.
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}
