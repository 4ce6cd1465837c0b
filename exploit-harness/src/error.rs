//! Error types for the harness

use custody_core::ErrorKind;
use thiserror::Error;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Harness errors
///
/// These are failures of the scenario setup, never of the attack itself:
/// an attack's rejection is its outcome, not an error.
#[derive(Error, Debug)]
pub enum Error {
    /// A legitimate setup call was rejected by the ledger
    #[error("setup rejected: {0}")]
    Setup(#[from] ErrorKind),

    /// Ledger construction or configuration failed
    #[error("ledger error: {0}")]
    Core(#[from] custody_core::Error),

    /// Report serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No scenario with the requested name
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}
