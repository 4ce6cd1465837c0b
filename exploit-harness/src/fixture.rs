//! Test fixture: a ledger plus a victim and an attacker

use crate::Result;
use custody_core::{
    Address, Call, Config, Instruction, KeyPair, Ledger, OpResult, Participant,
    ResourceRecordSnapshot,
};

/// Ledger with two principals
#[derive(Debug)]
pub struct Fixture {
    /// Ledger under test
    pub ledger: Ledger,

    /// Honest principal
    pub victim: KeyPair,

    /// Adversarial principal
    pub attacker: KeyPair,
}

impl Fixture {
    /// Build a fresh ledger for `config`
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            ledger: Ledger::new(config)?,
            victim: KeyPair::from_seed(&[0x11; 32]),
            attacker: KeyPair::from_seed(&[0xa7; 32]),
        })
    }

    /// Configured value-transfer target
    pub fn transfer_target(&self) -> Address {
        self.ledger.config().transfer_target
    }

    /// Allocate and initialize the record of `principal`
    pub fn open_vault(&self, principal: &KeyPair) -> Result<Address> {
        let vault = self.ledger.record_address(&principal.address())?;
        self.ledger.allocate(vault);
        self.ledger
            .apply_call(&self.signed(principal, vault, Instruction::Initialize, vec![]))?;
        Ok(vault)
    }

    /// Call signed by `principal` on `vault`, followed by `extra` participants
    pub fn signed(
        &self,
        principal: &KeyPair,
        vault: Address,
        instruction: Instruction,
        extra: Vec<Participant>,
    ) -> Call {
        let data = instruction.encode();
        let mut participants = vec![
            Participant::signer(principal, &data),
            Participant::mutable(vault),
        ];
        participants.extend(extra);
        Call { data, participants }
    }

    /// Fund `principal`'s wallet with `amount`, open its vault and deposit it all
    pub fn stake(&self, principal: &KeyPair, amount: u64) -> Result<Address> {
        self.ledger.fund(principal.address(), amount)?;
        let vault = self.open_vault(principal)?;
        self.deposit(principal, vault, amount)?;
        Ok(vault)
    }

    /// Legitimate deposit
    pub fn deposit(
        &self,
        principal: &KeyPair,
        vault: Address,
        amount: u64,
    ) -> Result<ResourceRecordSnapshot> {
        let call = self.signed(principal, vault, Instruction::Deposit { amount }, vec![]);
        Ok(self.ledger.apply_call(&call)?)
    }

    /// Signed Withdraw paying `recipient` through `target`
    pub fn withdraw(
        &self,
        principal: &KeyPair,
        vault: Address,
        amount: u64,
        target: Address,
        recipient: Address,
    ) -> Call {
        self.signed(
            principal,
            vault,
            Instruction::Withdraw { amount },
            vec![Participant::readonly(target), Participant::mutable(recipient)],
        )
    }

    /// Withdraw whatever balance is left back to `principal`'s wallet
    pub fn cash_out(&self, principal: &KeyPair, vault: Address) -> OpResult<ResourceRecordSnapshot> {
        let call = self.withdraw(
            principal,
            vault,
            self.balance(&vault),
            self.transfer_target(),
            principal.address(),
        );
        self.ledger.apply_call(&call)
    }

    /// Native value in `principal`'s wallet
    pub fn wallet(&self, principal: &KeyPair) -> u64 {
        self.ledger.value_of(&principal.address())
    }

    /// Record balance, or zero if the record cannot be read
    pub fn balance(&self, vault: &Address) -> u64 {
        self.ledger.snapshot(vault).map(|s| s.balance).unwrap_or(0)
    }
}
