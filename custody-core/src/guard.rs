//! Reentry guard
//!
//! The lock flag lives in the record itself; [`ReentryGuard`] is the only
//! code that sets or clears it. Acquisition fails with `ReentrancyBlocked`
//! if the flag is already set; release happens in `Drop`, so the flag is
//! cleared on every exit path including `?` propagation.
//!
//! The guard must be created before, and dropped after, any store lock
//! held by the same caller: `Drop` takes the store lock itself.

use crate::error::{ErrorKind, OpResult};
use crate::store::AccountStore;
use crate::types::Address;
use parking_lot::Mutex;
use tracing::{debug, error};

/// Scoped hold on a record's lock flag
#[derive(Debug)]
pub struct ReentryGuard<'a> {
    store: &'a Mutex<AccountStore>,
    address: Address,
}

impl<'a> ReentryGuard<'a> {
    /// Set the lock flag on the record at `address`
    pub fn acquire(store: &'a Mutex<AccountStore>, address: Address) -> OpResult<Self> {
        let mut accounts = store.lock();
        let account = accounts
            .get_mut(&address)
            .ok_or(ErrorKind::InvalidRecordData)?;
        let mut record = account.record()?;

        if record.lock {
            return Err(ErrorKind::ReentrancyBlocked);
        }

        record.lock = true;
        account.set_record(record)?;
        debug!(record = %address, "reentry guard acquired");

        Ok(Self { store, address })
    }
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        let mut accounts = self.store.lock();
        let Some(account) = accounts.get_mut(&self.address) else {
            return;
        };

        let released = account.record().and_then(|mut record| {
            record.lock = false;
            account.set_record(record)
        });

        match released {
            Ok(()) => debug!(record = %self.address, "reentry guard released"),
            Err(kind) => error!(record = %self.address, error = %kind, "failed to release reentry guard"),
        }
    }
}
