//! Exploit Harness
//!
//! Drives the custody ledger with legitimate and adversarial call sequences.
//! Every scenario attacks exactly one protection mechanism and is run twice:
//! under the strict policy, where the attack must be blocked, and with that
//! one mechanism relaxed, where the attack must succeed.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod attackers;
pub mod error;
pub mod fixture;
pub mod report;
pub mod scenarios;

// Re-exports
pub use error::{Error, Result};
pub use fixture::Fixture;
pub use report::{Report, Verdict};
pub use scenarios::{Outcome, Scenario, SCENARIOS};
