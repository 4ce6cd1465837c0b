//! Checked arithmetic over custodied amounts
//!
//! Strict enforcement never wraps: every result either fits in `u64` or the
//! operation fails. The permissive variants reproduce the wrapping behavior
//! of unchecked release builds so the harness can demonstrate the exploit.

use crate::error::{ErrorKind, OpResult};
use crate::policy::Enforcement;

/// `a + b`, failing with `ArithmeticOverflow`
pub fn checked_add(a: u64, b: u64) -> OpResult<u64> {
    a.checked_add(b).ok_or(ErrorKind::ArithmeticOverflow)
}

/// `a - b`, failing with `ArithmeticUnderflow`
pub fn checked_sub(a: u64, b: u64) -> OpResult<u64> {
    a.checked_sub(b).ok_or(ErrorKind::ArithmeticUnderflow)
}

/// Addition under the given enforcement
pub fn add(enforcement: Enforcement, a: u64, b: u64) -> OpResult<u64> {
    match enforcement {
        Enforcement::Strict => checked_add(a, b),
        Enforcement::Permissive => Ok(a.wrapping_add(b)),
    }
}

/// Debit of `amount` from `balance` under the given enforcement
///
/// Underflow surfaces as `InsufficientFunds`, the error withdrawing callers
/// see.
pub fn debit(enforcement: Enforcement, balance: u64, amount: u64) -> OpResult<u64> {
    match enforcement {
        Enforcement::Strict => checked_sub(balance, amount).map_err(|_| ErrorKind::InsufficientFunds),
        Enforcement::Permissive => Ok(balance.wrapping_sub(amount)),
    }
}
