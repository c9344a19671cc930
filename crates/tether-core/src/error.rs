//! Core error types for tether-core

use thiserror::Error;

/// Errors raised while setting up a connection handle
///
/// Failures of connect/exec calls themselves are reported as
/// [`tether_exec::ExecError`] values, not through this type.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Invalid client configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The blocking bridge could not build its runtime
    #[error("failed to start runtime: {0}")]
    RuntimeError(String),
}
