//! Error types for the custody engine
//!
//! [`ErrorKind`] is the closed taxonomy every ledger operation reports to its
//! caller. [`Error`] wraps it together with the ambient failures (config,
//! I/O, metrics) that only surface at process edges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for ambient operations (config loading, metrics setup)
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for ledger operations
pub type OpResult<T> = std::result::Result<T, ErrorKind>;

/// Failure reported by a ledger operation
///
/// Every variant is a caller error: nothing is retried, and the failing
/// transaction is rolled back before the error is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Principal did not prove it authorized the call
    #[error("missing required signature")]
    MissingSignature,

    /// Address does not match the one derived from its seeds
    #[error("invalid derived address")]
    InvalidDerivedAddress,

    /// Principal is not the owner of the referenced resource
    #[error("unauthorized principal")]
    Unauthorized,

    /// Addition would exceed u64::MAX
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Subtraction would go below zero
    #[error("arithmetic underflow")]
    ArithmeticUnderflow,

    /// Withdrawal larger than the available balance
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Record is locked by an outstanding external invocation
    #[error("reentrancy blocked")]
    ReentrancyBlocked,

    /// Sub-resource carries a different type tag than expected
    #[error("invalid type tag")]
    InvalidTypeTag,

    /// Outgoing invocation addressed to a target outside the allow-list
    #[error("invalid external target")]
    InvalidExternalTarget,

    /// Record has already been initialized
    #[error("resource already initialized")]
    AlreadyInitialized,

    /// Record has been closed
    #[error("resource closed")]
    ResourceClosed,

    /// Record has not been initialized yet
    #[error("resource not initialized")]
    NotInitialized,

    /// Instruction bytes could not be decoded
    #[error("invalid instruction data")]
    InvalidInstructionData,

    /// Fewer participants than the operation requires
    #[error("not enough participants")]
    NotEnoughParticipants,

    /// Participant is written by the operation but was passed read-only
    #[error("participant is not mutable")]
    ReadOnlyParticipant,

    /// Account data is not a valid layout for the expected kind
    #[error("invalid record data")]
    InvalidRecordData,
}

impl ErrorKind {
    /// Stable numeric code, used in reports and metrics labels
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::MissingSignature => 1,
            ErrorKind::InvalidDerivedAddress => 2,
            ErrorKind::Unauthorized => 3,
            ErrorKind::ArithmeticOverflow => 4,
            ErrorKind::ArithmeticUnderflow => 5,
            ErrorKind::InsufficientFunds => 6,
            ErrorKind::ReentrancyBlocked => 7,
            ErrorKind::InvalidTypeTag => 8,
            ErrorKind::InvalidExternalTarget => 9,
            ErrorKind::AlreadyInitialized => 10,
            ErrorKind::ResourceClosed => 11,
            ErrorKind::NotInitialized => 12,
            ErrorKind::InvalidInstructionData => 13,
            ErrorKind::NotEnoughParticipants => 14,
            ErrorKind::ReadOnlyParticipant => 15,
            ErrorKind::InvalidRecordData => 16,
        }
    }

    /// Short snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::MissingSignature => "missing_signature",
            ErrorKind::InvalidDerivedAddress => "invalid_derived_address",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ArithmeticOverflow => "arithmetic_overflow",
            ErrorKind::ArithmeticUnderflow => "arithmetic_underflow",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::ReentrancyBlocked => "reentrancy_blocked",
            ErrorKind::InvalidTypeTag => "invalid_type_tag",
            ErrorKind::InvalidExternalTarget => "invalid_external_target",
            ErrorKind::AlreadyInitialized => "already_initialized",
            ErrorKind::ResourceClosed => "resource_closed",
            ErrorKind::NotInitialized => "not_initialized",
            ErrorKind::InvalidInstructionData => "invalid_instruction_data",
            ErrorKind::NotEnoughParticipants => "not_enough_participants",
            ErrorKind::ReadOnlyParticipant => "read_only_participant",
            ErrorKind::InvalidRecordData => "invalid_record_data",
        }
    }
}

/// Engine errors outside the operation taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger operation rejected
    #[error("Operation rejected: {0}")]
    Rejected(#[from] ErrorKind),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ErrorKind::MissingSignature,
            ErrorKind::InvalidDerivedAddress,
            ErrorKind::Unauthorized,
            ErrorKind::ArithmeticOverflow,
            ErrorKind::ArithmeticUnderflow,
            ErrorKind::InsufficientFunds,
            ErrorKind::ReentrancyBlocked,
            ErrorKind::InvalidTypeTag,
            ErrorKind::InvalidExternalTarget,
            ErrorKind::AlreadyInitialized,
            ErrorKind::ResourceClosed,
            ErrorKind::NotInitialized,
            ErrorKind::InvalidInstructionData,
            ErrorKind::NotEnoughParticipants,
            ErrorKind::ReadOnlyParticipant,
            ErrorKind::InvalidRecordData,
        ];
        let codes: std::collections::HashSet<u32> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_rejection_wraps_kind() {
        let err: Error = ErrorKind::ReentrancyBlocked.into();
        assert!(err.to_string().contains("reentrancy blocked"));
    }
}
