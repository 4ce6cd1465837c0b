//! In-memory account store
//!
//! Plays the runtime's role: it allocates account cells, holds native
//! value, and records which authority custodies each cell. The ledger
//! checkpoints the whole store at instruction entry and restores it on
//! error, which is what makes every instruction all-or-nothing.

use crate::error::{ErrorKind, OpResult};
use crate::layout::{self, AccountData};
use crate::types::{Address, Holding, ResourceRecord};
use std::collections::BTreeMap;

/// A runtime storage cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Authority allowed to interpret `data`
    pub custodian: Address,

    /// Native value held at the address
    pub value: u64,

    /// Layout-encoded data cell
    pub data: Vec<u8>,
}

impl Account {
    /// Blank cell custodied by `custodian`
    pub fn allocated(custodian: Address) -> Self {
        Self {
            custodian,
            value: 0,
            data: layout::blank(),
        }
    }

    /// Decode as a custody record
    pub fn record(&self) -> OpResult<ResourceRecord> {
        layout::read_record(&self.data)
    }

    /// Decode as a holding
    pub fn holding(&self) -> OpResult<Holding> {
        layout::read_holding(&self.data)
    }

    /// Re-encode the record
    pub fn set_record(&mut self, record: ResourceRecord) -> OpResult<()> {
        layout::write(&mut self.data, &AccountData::Resource(record))
    }

    /// Re-encode the holding
    pub fn set_holding(&mut self, holding: Holding) -> OpResult<()> {
        layout::write(&mut self.data, &AccountData::Holding(holding))
    }
}

/// Address-ordered account map
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: BTreeMap<Address, Account>,
}

impl AccountStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a blank cell at `address`
    ///
    /// Never overwrites: returns `false` and leaves the existing account
    /// untouched if the address is already in use.
    pub fn allocate(&mut self, address: Address, custodian: Address) -> bool {
        if self.accounts.contains_key(&address) {
            return false;
        }
        self.accounts.insert(address, Account::allocated(custodian));
        true
    }

    /// Get account
    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Get account mutably
    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Account> {
        self.accounts.get_mut(address)
    }

    /// Insert or replace an account wholesale
    pub fn put(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Native value at `address` (zero if absent)
    pub fn value_of(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.value)
    }

    /// Add native value, creating a neutral-custody wallet if absent
    pub fn credit(&mut self, address: Address, amount: u64) -> OpResult<u64> {
        let account = self
            .accounts
            .entry(address)
            .or_insert_with(|| Account::allocated(Address::ZERO));
        account.value = account
            .value
            .checked_add(amount)
            .ok_or(ErrorKind::ArithmeticOverflow)?;
        Ok(account.value)
    }

    /// Remove native value; a missing or short account fails `InsufficientFunds`
    pub fn debit(&mut self, address: &Address, amount: u64) -> OpResult<u64> {
        let account = self
            .accounts
            .get_mut(address)
            .ok_or(ErrorKind::InsufficientFunds)?;
        account.value = account
            .value
            .checked_sub(amount)
            .ok_or(ErrorKind::InsufficientFunds)?;
        Ok(account.value)
    }

    /// Move native value between accounts
    ///
    /// Runtime-level movement: always checked, whatever the ledger policy.
    /// On failure neither side is changed.
    pub fn transfer(&mut self, from: &Address, to: Address, amount: u64) -> OpResult<()> {
        if amount == 0 {
            return Ok(());
        }
        if self.value_of(from) < amount {
            return Err(ErrorKind::InsufficientFunds);
        }
        if *from != to && self.value_of(&to).checked_add(amount).is_none() {
            return Err(ErrorKind::ArithmeticOverflow);
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(())
    }

    /// Native value summed over every account
    pub fn total_value(&self) -> u128 {
        self.accounts.values().map(|a| u128::from(a.value)).sum()
    }
}
