//! External targets
//!
//! An external target is code outside the ledger's trust boundary that the
//! ledger hands delegated authority to during Withdraw's interaction phase.
//! The target receives an [`Invocation`], through which it can move native
//! value out of the payout source (never more than the payout amount in
//! total) and, crucially, call back into the ledger before the outer
//! operation has finished.

use crate::error::{ErrorKind, OpResult};
use crate::instruction::Call;
use crate::ledger::Ledger;
use crate::types::{Address, ResourceRecordSnapshot};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use tracing::debug;

/// Value movement requested from a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Account the value is drawn from
    pub source: Address,
    /// Account receiving native value
    pub recipient: Address,
    /// Amount to move
    pub amount: u64,
}

/// Delegated authority handed to a target for the duration of one call
pub struct Invocation<'a> {
    ledger: &'a Ledger,
    target: Address,
    payout: Payout,
    depth: usize,
    remaining: Cell<u64>,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(ledger: &'a Ledger, target: Address, payout: Payout, depth: usize) -> Self {
        Self {
            ledger,
            target,
            payout,
            depth,
            remaining: Cell::new(payout.amount),
        }
    }

    /// Identity the target was invoked under
    pub fn target(&self) -> &Address {
        &self.target
    }

    /// Requested value movement
    pub fn payout(&self) -> &Payout {
        &self.payout
    }

    /// Nesting depth of the ledger call that issued this invocation
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Move native value from the payout source to `to`
    ///
    /// Draws against the payout amount; asking for more than is left of it
    /// fails `InsufficientFunds`.
    pub fn transfer(&self, to: Address, amount: u64) -> OpResult<()> {
        let left = self
            .remaining
            .get()
            .checked_sub(amount)
            .ok_or(ErrorKind::InsufficientFunds)?;
        self.ledger.move_native(&self.payout.source, to, amount)?;
        self.remaining.set(left);
        Ok(())
    }

    /// Call back into the ledger while the issuing operation is suspended
    pub fn reenter(&self, call: &Call) -> OpResult<ResourceRecordSnapshot> {
        debug!(target = %self.target, depth = self.depth + 1, "target re-entering ledger");
        self.ledger.apply_at_depth(&call.data, &call.participants, self.depth + 1)
    }
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("target", &self.target)
            .field("payout", &self.payout)
            .field("depth", &self.depth)
            .field("remaining", &self.remaining.get())
            .finish_non_exhaustive()
    }
}

/// Component the ledger may invoke outside its trust boundary
pub trait ExternalTarget: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Perform the requested payout
    fn invoke(&self, invocation: &Invocation<'_>) -> OpResult<()>;
}

/// The value-transfer subsystem: pays the recipient from the source, nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueTransfer;

impl ExternalTarget for ValueTransfer {
    fn name(&self) -> &str {
        "value_transfer"
    }

    fn invoke(&self, invocation: &Invocation<'_>) -> OpResult<()> {
        let payout = invocation.payout();
        invocation.transfer(payout.recipient, payout.amount)
    }
}
