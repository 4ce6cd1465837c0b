//! Custody Core
//!
//! Single-owner value custody with individually switchable protections.
//!
//! # Architecture
//!
//! - **Ledger**: Owns the account store and applies encoded instructions
//! - **Validators**: Identity, derived-address, type-tag and target checks
//! - **Policy**: Strict or permissive enforcement per protection mechanism
//! - **Reentry guard**: Scoped lock flag held across external interaction
//!
//! # Invariants
//!
//! - Only the principal with a valid proof mutates its record
//! - Record addresses are derived and off-curve; no key signs for them
//! - Balances never wrap; a failed instruction leaves no trace
//! - Native value only moves: deposits fill the escrow that pays withdrawals
//! - A closed record is terminal and cannot be revived by re-funding

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod arith;
pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod instruction;
pub mod layout;
pub mod ledger;
pub mod metrics;
pub mod policy;
pub mod store;
pub mod target;
pub mod types;
pub mod validation;

// Re-exports
pub use config::Config;
pub use crypto::KeyPair;
pub use error::{Error, ErrorKind, OpResult, Result};
pub use instruction::{Call, Instruction, Operation, Transaction};
pub use ledger::Ledger;
pub use policy::{Enforcement, Mechanism, Policy};
pub use target::{ExternalTarget, Invocation, Payout, ValueTransfer};
pub use types::{
    Address, Holding, Participant, ResourceRecord, ResourceRecordSnapshot, ResourceStatus,
    Signature, TypeTag,
};
