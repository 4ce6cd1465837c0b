//! Resource ledger
//!
//! This module ties together the validators, the arithmetic unit, the
//! reentry guard and the account store into the custody state machine:
//!
//! ```text
//! Uninitialized ──Initialize──▶ Active ──Close──▶ Closed (terminal)
//!                                │  ▲
//!          Withdraw interaction  ▼  │ guard release
//!                            Active-Locked
//! ```
//!
//! # Example
//!
//! ```
//! use custody_core::{Call, Config, Instruction, KeyPair, Ledger, Participant};
//!
//! let ledger = Ledger::new(Config::default())?;
//! let alice = KeyPair::generate();
//! let vault = ledger.record_address(&alice.address())?;
//! ledger.allocate(vault);
//!
//! let init = Instruction::Initialize.encode();
//! ledger.apply(&init, &[Participant::signer(&alice, &init), Participant::mutable(vault)])?;
//!
//! ledger.fund(alice.address(), 500)?;
//! let deposit = Instruction::Deposit { amount: 500 }.encode();
//! let snapshot = ledger.apply(
//!     &deposit,
//!     &[Participant::signer(&alice, &deposit), Participant::mutable(vault)],
//! )?;
//! assert_eq!(snapshot.balance, 500);
//! assert_eq!(ledger.value_of(&ledger.escrow()), 500);
//! # Ok::<(), custody_core::Error>(())
//! ```

use crate::{
    arith,
    config::Config,
    crypto::derive_address,
    error::{Error, ErrorKind, OpResult},
    guard::ReentryGuard,
    instruction::{Call, Instruction, Operation, Transaction},
    metrics::Metrics,
    policy::Policy,
    store::{Account, AccountStore},
    target::{ExternalTarget, Invocation, Payout, ValueTransfer},
    types::{
        Address, Holding, Participant, ResourceRecord, ResourceRecordSnapshot, ResourceStatus,
        TypeTag,
    },
    validation::Validator,
    Result,
};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, field, info, info_span, warn};
use uuid::Uuid;

/// Deepest allowed chain of target callbacks into the ledger
pub const MAX_INVOCATION_DEPTH: usize = 4;

/// Seed of the escrow account holding deposited native value
const ESCROW_SEED: &[u8] = b"escrow";

/// Main ledger interface
pub struct Ledger {
    /// Configuration
    config: Config,

    /// Expected type tag for records and holdings
    type_tag: TypeTag,

    /// Account holding every record's deposited native value
    escrow: Address,

    /// Validators under the configured policy
    validator: Validator,

    /// Account store; never held across an external invocation
    store: Mutex<AccountStore>,

    /// Registered external targets by identity
    targets: RwLock<BTreeMap<Address, Arc<dyn ExternalTarget>>>,

    /// Metrics
    metrics: Metrics,
}

impl Ledger {
    /// Create ledger with configuration
    ///
    /// The value-transfer subsystem is registered under
    /// `config.transfer_target`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let validator = Validator::new(
            config.policy,
            config.ledger_id,
            config.record_seed.as_bytes().to_vec(),
            config.allowed_targets.iter().copied(),
        );

        let (escrow, _) = derive_address(&[ESCROW_SEED], &config.ledger_id)
            .ok_or_else(|| Error::Config("no off-curve escrow address".to_string()))?;
        let mut store = AccountStore::new();
        store.allocate(escrow, config.ledger_id);

        let mut targets: BTreeMap<Address, Arc<dyn ExternalTarget>> = BTreeMap::new();
        targets.insert(config.transfer_target, Arc::new(ValueTransfer));

        info!(
            ledger = %config.ledger_id,
            relaxed = ?config.policy.relaxed(),
            "custody ledger created"
        );

        Ok(Self {
            type_tag: config.type_tag(),
            escrow,
            validator,
            store: Mutex::new(store),
            targets: RwLock::new(targets),
            metrics: Metrics::new()?,
            config,
        })
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Active policy
    pub fn policy(&self) -> &Policy {
        self.validator.policy()
    }

    /// Expected type tag
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Escrow account
    ///
    /// Deposits move native value here; withdrawals and closes pay out of
    /// it. A record's balance is its owner's claim on the escrow.
    pub fn escrow(&self) -> Address {
        self.escrow
    }

    // =========================================================================
    // RUNTIME SURFACE
    // =========================================================================

    /// Record address for `owner`
    pub fn record_address(&self, owner: &Address) -> OpResult<Address> {
        self.validator.record_address(owner)
    }

    /// Allocate a blank cell custodied by this ledger
    ///
    /// Returns `false` if the address is already in use; existing data,
    /// including a closed record's marker, is never overwritten.
    pub fn allocate(&self, address: Address) -> bool {
        self.store.lock().allocate(address, self.config.ledger_id)
    }

    /// Add native value to `address` from outside the ledger
    pub fn fund(&self, address: Address, amount: u64) -> OpResult<u64> {
        self.store.lock().credit(address, amount)
    }

    /// Create a holding custodied by the holding authority
    pub fn create_holding(&self, address: Address, holding: Holding) -> OpResult<()> {
        let mut store = self.store.lock();
        if !store.allocate(address, self.config.holding_authority) {
            return Err(ErrorKind::AlreadyInitialized);
        }
        store
            .get_mut(&address)
            .ok_or(ErrorKind::InvalidRecordData)?
            .set_holding(holding)
    }

    /// Place arbitrary bytes at `address` under `custodian`
    ///
    /// Models an account written by some other program. Cells this ledger
    /// custodies and closed records are refused, so existing data is never
    /// overwritten from outside.
    pub fn write_raw(&self, address: Address, custodian: Address, data: Vec<u8>) -> OpResult<()> {
        let mut store = self.store.lock();
        if let Some(existing) = store.get(&address) {
            if existing.custodian == self.config.ledger_id {
                return Err(ErrorKind::AlreadyInitialized);
            }
            if existing
                .record()
                .is_ok_and(|record| record.status == ResourceStatus::Closed)
            {
                return Err(ErrorKind::ResourceClosed);
            }
        }

        let value = store.value_of(&address);
        store.put(
            address,
            Account {
                custodian,
                value,
                data,
            },
        );
        Ok(())
    }

    /// Register an external target implementation
    pub fn register_target(&self, id: Address, target: Arc<dyn ExternalTarget>) {
        debug!(target = %id, name = target.name(), "target registered");
        self.targets.write().insert(id, target);
    }

    /// Snapshot of the record at `address`
    pub fn snapshot(&self, address: &Address) -> OpResult<ResourceRecordSnapshot> {
        snapshot_of(&self.store.lock(), address)
    }

    /// Holding at `address`
    pub fn holding(&self, address: &Address) -> OpResult<Holding> {
        self.store
            .lock()
            .get(address)
            .ok_or(ErrorKind::InvalidRecordData)?
            .holding()
    }

    /// Native value at `address`
    pub fn value_of(&self, address: &Address) -> u64 {
        self.store.lock().value_of(address)
    }

    /// Native value summed over every account
    pub fn total_value(&self) -> u128 {
        self.store.lock().total_value()
    }

    pub(crate) fn move_native(&self, from: &Address, to: Address, amount: u64) -> OpResult<()> {
        self.store.lock().transfer(from, to, amount)
    }

    // =========================================================================
    // HARNESS CONTRACT
    // =========================================================================

    /// Apply one encoded instruction as its own transaction
    pub fn apply(
        &self,
        data: &[u8],
        participants: &[Participant],
    ) -> OpResult<ResourceRecordSnapshot> {
        self.apply_at_depth(data, participants, 0)
    }

    /// Apply a prepared call
    pub fn apply_call(&self, call: &Call) -> OpResult<ResourceRecordSnapshot> {
        self.apply(&call.data, &call.participants)
    }

    /// Execute calls in order; any failure rolls back the whole transaction
    pub fn execute(&self, transaction: &Transaction) -> OpResult<Vec<ResourceRecordSnapshot>> {
        let tx_id = Uuid::now_v7();
        let span = info_span!("transaction", %tx_id, calls = transaction.calls.len());
        let _enter = span.enter();

        let checkpoint = self.store.lock().clone();
        let mut snapshots = Vec::with_capacity(transaction.calls.len());

        for (index, call) in transaction.calls.iter().enumerate() {
            match self.apply_call(call) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(kind) => {
                    *self.store.lock() = checkpoint;
                    warn!(index, error = %kind, "transaction aborted, rolled back");
                    return Err(kind);
                }
            }
        }

        info!("transaction committed");
        Ok(snapshots)
    }

    pub(crate) fn apply_at_depth(
        &self,
        data: &[u8],
        participants: &[Participant],
        depth: usize,
    ) -> OpResult<ResourceRecordSnapshot> {
        let span = info_span!("instruction", depth, operation = field::Empty);
        let _enter = span.enter();

        if depth > MAX_INVOCATION_DEPTH {
            warn!("invocation depth exceeded");
            self.metrics.record_rejection(None, ErrorKind::ReentrancyBlocked);
            return Err(ErrorKind::ReentrancyBlocked);
        }

        let checkpoint = self.store.lock().clone();
        let decoded = Instruction::decode(data);
        let operation = decoded.as_ref().ok().map(Instruction::operation);
        if let Some(op) = operation {
            span.record("operation", op.name());
        }

        let result = decoded.and_then(|instruction| {
            self.dispatch(instruction, data, participants, depth)
        });

        match result {
            Ok(snapshot) => {
                if let Some(op) = operation {
                    self.metrics.record_success(op);
                }
                debug!(record = %snapshot.address, balance = snapshot.balance, "instruction committed");
                Ok(snapshot)
            }
            Err(kind) => {
                *self.store.lock() = checkpoint;
                self.metrics.record_rejection(operation, kind);
                warn!(error = %kind, code = kind.code(), "instruction rejected");
                Err(kind)
            }
        }
    }

    fn dispatch(
        &self,
        instruction: Instruction,
        data: &[u8],
        participants: &[Participant],
        depth: usize,
    ) -> OpResult<ResourceRecordSnapshot> {
        let required = instruction.operation().required_participants();
        if participants.len() < required {
            return Err(ErrorKind::NotEnoughParticipants);
        }

        match instruction {
            Instruction::Initialize => self.initialize(data, participants),
            Instruction::Deposit { amount } => self.deposit(data, participants, amount),
            Instruction::Withdraw { amount } => self.withdraw(data, participants, amount, depth),
            Instruction::Close => self.close(data, participants),
            Instruction::Transfer { amount } => self.transfer(data, participants, amount),
        }
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Participants: `[principal, record]`
    fn initialize(
        &self,
        data: &[u8],
        participants: &[Participant],
    ) -> OpResult<ResourceRecordSnapshot> {
        let (principal, record_p) = (&participants[0], &participants[1]);

        self.validator.verify_identity(principal, data)?;
        self.validator.require_mutable(record_p)?;
        self.validator
            .verify_record_address(&record_p.address, &principal.address)?;

        let mut store = self.store.lock();
        let account = store
            .get_mut(&record_p.address)
            .ok_or(ErrorKind::InvalidRecordData)?;
        account.record()?.status.admits(Operation::Initialize)?;
        self.check_custodian(account)?;

        account.set_record(ResourceRecord::active(principal.address, self.type_tag))?;
        info!(record = %record_p.address, owner = %principal.address, "record initialized");

        snapshot_of(&store, &record_p.address)
    }

    /// Participants: `[principal, record]`
    ///
    /// Moves `amount` of the principal's native value into escrow.
    fn deposit(
        &self,
        data: &[u8],
        participants: &[Participant],
        amount: u64,
    ) -> OpResult<ResourceRecordSnapshot> {
        let (principal, record_p) = (&participants[0], &participants[1]);

        self.validator.verify_identity(principal, data)?;
        self.validator.require_mutable(principal)?;
        self.validator.require_mutable(record_p)?;
        self.validator
            .verify_record_address(&record_p.address, &principal.address)?;

        let mut store = self.store.lock();
        let account = store
            .get_mut(&record_p.address)
            .ok_or(ErrorKind::InvalidRecordData)?;
        let mut record = self.active_record(account, Operation::Deposit)?;
        self.check_unlocked(&record)?;

        record.balance = arith::add(self.policy().arithmetic, record.balance, amount)?;
        account.set_record(record)?;
        store.transfer(&principal.address, self.escrow, amount)?;
        debug!(record = %record_p.address, amount, "deposit committed");

        snapshot_of(&store, &record_p.address)
    }

    /// Participants: `[principal, record, transfer target, recipient]`
    ///
    /// Check, then effect, then interaction. Under strict reentrancy the
    /// balance is committed and the record locked before the target runs,
    /// so a callback sees the debited balance and the held lock.
    fn withdraw(
        &self,
        data: &[u8],
        participants: &[Participant],
        amount: u64,
        depth: usize,
    ) -> OpResult<ResourceRecordSnapshot> {
        let (principal, record_p, target_p, recipient_p) = (
            &participants[0],
            &participants[1],
            &participants[2],
            &participants[3],
        );
        let address = record_p.address;

        self.validator.verify_identity(principal, data)?;
        self.validator.require_mutable(record_p)?;
        self.validator.require_mutable(recipient_p)?;
        self.validator
            .verify_record_address(&address, &principal.address)?;

        // CHECK
        let record = {
            let store = self.store.lock();
            let account = store.get(&address).ok_or(ErrorKind::InvalidRecordData)?;
            self.active_record(account, Operation::Withdraw)?
        };
        self.check_unlocked(&record)?;
        if record.owner != principal.address {
            return Err(ErrorKind::Unauthorized);
        }
        let new_balance = arith::debit(self.policy().arithmetic, record.balance, amount)?;

        let payout = Payout {
            source: self.escrow,
            recipient: recipient_p.address,
            amount,
        };

        if self.policy().reentrancy.is_strict() {
            let _guard = ReentryGuard::acquire(&self.store, address)?;

            // EFFECT
            self.commit_balance(&address, new_balance)?;
            debug!(record = %address, new_balance, "withdraw effect committed");

            // INTERACTION
            self.interact(target_p.address, payout, depth)?;
        } else {
            // Interaction first, then a write-back of the balance read above
            self.interact(target_p.address, payout, depth)?;
            self.commit_balance(&address, new_balance)?;
        }

        snapshot_of(&self.store.lock(), &address)
    }

    /// Participants: `[principal, record]`
    ///
    /// Pays the balance out of escrow plus whatever the record account
    /// itself holds.
    fn close(&self, data: &[u8], participants: &[Participant]) -> OpResult<ResourceRecordSnapshot> {
        let (principal, record_p) = (&participants[0], &participants[1]);
        let address = record_p.address;

        self.validator.verify_identity(principal, data)?;
        self.validator.require_mutable(principal)?;
        self.validator.require_mutable(record_p)?;
        self.validator
            .verify_record_address(&address, &principal.address)?;

        let mut store = self.store.lock();
        let account = store.get_mut(&address).ok_or(ErrorKind::InvalidRecordData)?;
        let record = self.active_record(account, Operation::Close)?;
        self.check_unlocked(&record)?;
        if record.owner != principal.address {
            return Err(ErrorKind::Unauthorized);
        }

        let held = account.value;

        // Permissive teardown stops after the payout: balance, status and
        // custody stay behind
        if self.policy().teardown.is_strict() {
            account.set_record(ResourceRecord::closed())?;
            account.custodian = self.config.neutral_authority;
        }

        store.transfer(&address, principal.address, held)?;
        store.transfer(&self.escrow, principal.address, record.balance)?;
        info!(
            record = %address,
            owner = %principal.address,
            balance = record.balance,
            held,
            "record closed"
        );

        snapshot_of(&store, &address)
    }

    /// Participants: `[principal, record, source holding, destination holding]`
    ///
    /// Moves holding units only; the record balance tracks native value.
    fn transfer(
        &self,
        data: &[u8],
        participants: &[Participant],
        amount: u64,
    ) -> OpResult<ResourceRecordSnapshot> {
        let (principal, record_p, source_p, dest_p) = (
            &participants[0],
            &participants[1],
            &participants[2],
            &participants[3],
        );
        let address = record_p.address;

        self.validator.verify_identity(principal, data)?;
        for participant in [record_p, source_p, dest_p] {
            self.validator.require_mutable(participant)?;
        }
        self.validator
            .verify_record_address(&address, &principal.address)?;

        let mut store = self.store.lock();
        let record = {
            let account = store.get(&address).ok_or(ErrorKind::InvalidRecordData)?;
            self.active_record(account, Operation::Transfer)?
        };
        self.check_unlocked(&record)?;
        if record.owner != principal.address {
            return Err(ErrorKind::Unauthorized);
        }

        let mut source = self.load_holding(&store, &source_p.address)?;
        let mut dest = self.load_holding(&store, &dest_p.address)?;

        // Both sides, by declared tag only
        self.validator.verify_type_tag(&source.type_tag, &record.type_tag)?;
        self.validator.verify_type_tag(&dest.type_tag, &record.type_tag)?;

        if source.owner != principal.address || dest.owner != address {
            return Err(ErrorKind::Unauthorized);
        }

        let arithmetic = self.policy().arithmetic;
        source.amount = arith::debit(arithmetic, source.amount, amount)?;
        dest.amount = arith::add(arithmetic, dest.amount, amount)?;

        write_holding(&mut store, &source_p.address, source)?;
        write_holding(&mut store, &dest_p.address, dest)?;
        debug!(record = %address, amount, "typed transfer committed");

        snapshot_of(&store, &address)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Decode an Active record this ledger custodies
    fn active_record(&self, account: &Account, operation: Operation) -> OpResult<ResourceRecord> {
        let record = account.record()?;
        record.status.admits(operation)?;
        self.check_custodian(account)?;
        Ok(record)
    }

    fn check_custodian(&self, account: &Account) -> OpResult<()> {
        if self.policy().derived_address.is_strict() && account.custodian != self.config.ledger_id {
            return Err(ErrorKind::InvalidRecordData);
        }
        Ok(())
    }

    fn check_unlocked(&self, record: &ResourceRecord) -> OpResult<()> {
        if self.policy().reentrancy.is_strict() && record.lock {
            return Err(ErrorKind::ReentrancyBlocked);
        }
        Ok(())
    }

    fn load_holding(&self, store: &AccountStore, address: &Address) -> OpResult<Holding> {
        let account = store.get(address).ok_or(ErrorKind::InvalidRecordData)?;
        if account.custodian != self.config.holding_authority {
            return Err(ErrorKind::InvalidRecordData);
        }
        account.holding()
    }

    fn commit_balance(&self, address: &Address, balance: u64) -> OpResult<()> {
        let mut store = self.store.lock();
        let account = store.get_mut(address).ok_or(ErrorKind::InvalidRecordData)?;
        let mut record = account.record()?;
        record.balance = balance;
        account.set_record(record)
    }

    /// Validate the target, then hand it delegated authority
    ///
    /// Must be called with no store lock held: the target may re-enter.
    fn interact(&self, target_id: Address, payout: Payout, depth: usize) -> OpResult<()> {
        self.validator.verify_external_target(&target_id)?;

        let target = self
            .targets
            .read()
            .get(&target_id)
            .cloned()
            .ok_or(ErrorKind::InvalidExternalTarget)?;

        debug!(target = %target_id, name = target.name(), amount = payout.amount, "delegating to target");
        target.invoke(&Invocation::new(self, target_id, payout, depth))
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("ledger_id", &self.config.ledger_id)
            .field("policy", self.validator.policy())
            .finish_non_exhaustive()
    }
}

fn write_holding(store: &mut AccountStore, address: &Address, holding: Holding) -> OpResult<()> {
    store
        .get_mut(address)
        .ok_or(ErrorKind::InvalidRecordData)?
        .set_holding(holding)
}

fn snapshot_of(store: &AccountStore, address: &Address) -> OpResult<ResourceRecordSnapshot> {
    let account = store.get(address).ok_or(ErrorKind::InvalidRecordData)?;
    let record = account.record()?;

    Ok(ResourceRecordSnapshot {
        address: *address,
        custodian: account.custodian,
        native_value: account.value,
        owner: record.owner,
        balance: record.balance,
        type_tag: record.type_tag,
        status: record.status,
        locked: record.lock,
    })
}
