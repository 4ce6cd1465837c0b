//! Adversarial external targets

use custody_core::{
    Address, Call, ExternalTarget, Invocation, OpResult, ResourceRecordSnapshot,
};
use parking_lot::Mutex;
use tracing::debug;

/// Target that pays out, then calls back into the ledger once
///
/// The queued call is taken before it is issued, so a nested invocation of
/// the same hook pays out without re-entering again.
#[derive(Debug, Default)]
pub struct ReentrantHook {
    queued: Mutex<Option<Call>>,
    nested: Mutex<Option<OpResult<ResourceRecordSnapshot>>>,
}

impl ReentrantHook {
    /// Hook that re-enters with `call`
    pub fn new(call: Call) -> Self {
        Self {
            queued: Mutex::new(Some(call)),
            nested: Mutex::new(None),
        }
    }

    /// Result of the nested call, if it was issued
    pub fn nested_result(&self) -> Option<OpResult<ResourceRecordSnapshot>> {
        self.nested.lock().clone()
    }
}

impl ExternalTarget for ReentrantHook {
    fn name(&self) -> &str {
        "reentrant_hook"
    }

    fn invoke(&self, invocation: &Invocation<'_>) -> OpResult<()> {
        let payout = *invocation.payout();
        invocation.transfer(payout.recipient, payout.amount)?;

        let queued = self.queued.lock().take();
        if let Some(call) = queued {
            let result = invocation.reenter(&call);
            debug!(depth = invocation.depth(), ?result, "nested call returned");
            // Swallowed so the outer Withdraw still completes
            *self.nested.lock() = Some(result);
        }

        Ok(())
    }
}

/// Look-alike transfer target that pays a fixed beneficiary
#[derive(Debug, Clone, Copy)]
pub struct RedirectingTarget {
    beneficiary: Address,
}

impl RedirectingTarget {
    /// Redirect every payout to `beneficiary`
    pub fn new(beneficiary: Address) -> Self {
        Self { beneficiary }
    }
}

impl ExternalTarget for RedirectingTarget {
    fn name(&self) -> &str {
        "redirecting_target"
    }

    fn invoke(&self, invocation: &Invocation<'_>) -> OpResult<()> {
        invocation.transfer(self.beneficiary, invocation.payout().amount)
    }
}
