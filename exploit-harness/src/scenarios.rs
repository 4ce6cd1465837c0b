//! Exploit scenarios, one per protection mechanism
//!
//! Each scenario builds a fresh ledger from the given configuration, plays
//! the attack and measures what the attacker walked away with beyond what it
//! paid in. Victim and attacker deposits share the ledger's escrow, so any
//! gain is value taken from the victim. A positive gain means the exploit
//! reproduced.

use crate::attackers::{ReentrantHook, RedirectingTarget};
use crate::{Fixture, Result};
use custody_core::{
    layout::{self, AccountData},
    Address, Call, Config, ErrorKind, Holding, Instruction, Mechanism, OpResult, Participant,
    ResourceRecord, TypeTag,
};
use serde::Serialize;
use std::sync::Arc;

/// Native units each principal stakes
const STAKE: u64 = 1_000_000_000;

/// Result of one scenario run under one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Mechanisms relaxed for this run
    pub relaxed: Vec<Mechanism>,

    /// Error the attack was rejected with, if any
    pub rejected_with: Option<ErrorKind>,

    /// Value the attacker obtained beyond what it was entitled to
    pub attacker_gain: u64,
}

impl Outcome {
    fn new(config: &Config, rejected_with: Option<ErrorKind>, attacker_gain: u64) -> Self {
        Self {
            relaxed: config.policy.relaxed(),
            rejected_with,
            attacker_gain,
        }
    }

    /// Whether the attack paid off
    pub fn exploited(&self) -> bool {
        self.attacker_gain > 0
    }
}

/// A named attack against one mechanism
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// Stable scenario name
    pub name: &'static str,

    /// Mechanism the attack targets
    pub mechanism: Mechanism,

    /// One-line description of the attack
    pub attack: &'static str,

    play: fn(Config) -> Result<Outcome>,
}

impl Scenario {
    /// Play the attack against a fresh ledger built from `config`
    pub fn run(&self, config: Config) -> Result<Outcome> {
        (self.play)(config)
    }

    /// Find a scenario by name
    pub fn find(name: &str) -> Option<&'static Scenario> {
        SCENARIOS.iter().find(|s| s.name == name)
    }
}

/// Every scenario, in mechanism order
pub static SCENARIOS: [Scenario; 7] = [
    Scenario {
        name: "unsigned_impersonation",
        mechanism: Mechanism::Identity,
        attack: "withdraw the victim's funds naming the victim as principal without a proof",
        play: unsigned_impersonation,
    },
    Scenario {
        name: "forged_record",
        mechanism: Mechanism::DerivedAddress,
        attack: "withdraw from a record pre-written at a non-derived address",
        play: forged_record,
    },
    Scenario {
        name: "underflow_withdraw",
        mechanism: Mechanism::Arithmetic,
        attack: "withdraw twice the balance from a shared escrow and let the balance wrap",
        play: underflow_withdraw,
    },
    Scenario {
        name: "reentrant_withdraw",
        mechanism: Mechanism::Reentrancy,
        attack: "re-enter Withdraw from the transfer callback before the balance is committed",
        play: reentrant_withdraw,
    },
    Scenario {
        name: "type_confusion",
        mechanism: Mechanism::TypeTag,
        attack: "fill the record's custody holding from a counterfeit holding of a foreign type",
        play: type_confusion,
    },
    Scenario {
        name: "arbitrary_target",
        mechanism: Mechanism::ExternalTarget,
        attack: "route the victim's withdrawal through a look-alike transfer target",
        play: arbitrary_target,
    },
    Scenario {
        name: "double_close",
        mechanism: Mechanism::Teardown,
        attack: "close a record twice to collect its balance twice from escrow",
        play: double_close,
    },
];

fn rejection<T>(result: &OpResult<T>) -> Option<ErrorKind> {
    result.as_ref().err().copied()
}

fn unsigned_impersonation(config: Config) -> Result<Outcome> {
    let fx = Fixture::new(config)?;
    let vault = fx.stake(&fx.victim, STAKE)?;

    let call = Call::new(
        Instruction::Withdraw { amount: STAKE },
        vec![
            Participant::mutable(fx.victim.address()).claiming_authentication(),
            Participant::mutable(vault),
            Participant::readonly(fx.transfer_target()),
            Participant::mutable(fx.attacker.address()),
        ],
    );
    let result = fx.ledger.apply_call(&call);

    let gain = fx.wallet(&fx.attacker);
    Ok(Outcome::new(fx.ledger.config(), rejection(&result), gain))
}

fn forged_record(config: Config) -> Result<Outcome> {
    let fx = Fixture::new(config)?;
    fx.stake(&fx.victim, STAKE)?;
    let forged = Address::from_label("forged-vault");

    let mut record = ResourceRecord::active(fx.attacker.address(), fx.ledger.type_tag());
    record.balance = STAKE;
    let mut data = layout::blank();
    layout::write(&mut data, &AccountData::Resource(record))?;
    fx.ledger.write_raw(forged, fx.attacker.address(), data)?;

    let call = fx.withdraw(
        &fx.attacker,
        forged,
        STAKE,
        fx.transfer_target(),
        fx.attacker.address(),
    );
    let result = fx.ledger.apply_call(&call);

    let gain = fx.wallet(&fx.attacker);
    Ok(Outcome::new(fx.ledger.config(), rejection(&result), gain))
}

fn underflow_withdraw(config: Config) -> Result<Outcome> {
    let fx = Fixture::new(config)?;
    fx.stake(&fx.victim, STAKE)?;
    let vault = fx.stake(&fx.attacker, STAKE)?;

    let call = fx.withdraw(
        &fx.attacker,
        vault,
        2 * STAKE,
        fx.transfer_target(),
        fx.attacker.address(),
    );
    let result = fx.ledger.apply_call(&call);

    // Paid in STAKE; anything above it came out of the victim's deposit
    let gain = fx.wallet(&fx.attacker).saturating_sub(STAKE);
    Ok(Outcome::new(fx.ledger.config(), rejection(&result), gain))
}

fn reentrant_withdraw(mut config: Config) -> Result<Outcome> {
    let hook_id = Address::from_label("reentrant-hook");
    config.allowed_targets.push(hook_id);

    let fx = Fixture::new(config)?;
    fx.stake(&fx.victim, STAKE)?;
    let vault = fx.stake(&fx.attacker, STAKE)?;

    let amount = STAKE / 10 * 6;
    let wallet = fx.attacker.address();
    let hook = Arc::new(ReentrantHook::new(
        fx.withdraw(&fx.attacker, vault, amount, hook_id, wallet),
    ));
    fx.ledger.register_target(hook_id, hook.clone());

    let outer = fx
        .ledger
        .apply_call(&fx.withdraw(&fx.attacker, vault, amount, hook_id, wallet));
    let rejected_with = rejection(&outer).or_else(|| hook.nested_result().and_then(|r| rejection(&r)));

    // Redeem whatever balance the record still shows
    fx.cash_out(&fx.attacker, vault)?;

    let gain = fx.wallet(&fx.attacker).saturating_sub(STAKE);
    Ok(Outcome::new(fx.ledger.config(), rejected_with, gain))
}

fn type_confusion(config: Config) -> Result<Outcome> {
    let fx = Fixture::new(config)?;
    let vault = fx.open_vault(&fx.attacker)?;
    let counterfeit = Address::from_label("counterfeit-holding");
    let custody = Address::from_label("vault-holding");

    fx.ledger.create_holding(
        counterfeit,
        Holding {
            type_tag: TypeTag::from_name("counterfeit"),
            owner: fx.attacker.address(),
            amount: u64::MAX,
        },
    )?;
    fx.ledger.create_holding(
        custody,
        Holding {
            type_tag: fx.ledger.type_tag(),
            owner: vault,
            amount: 0,
        },
    )?;

    let call = fx.signed(
        &fx.attacker,
        vault,
        Instruction::Transfer { amount: STAKE },
        vec![
            Participant::mutable(counterfeit),
            Participant::mutable(custody),
        ],
    );
    let result = fx.ledger.apply_call(&call);

    // The attacker held none of the genuine type
    let gain = fx.ledger.holding(&custody)?.amount;
    Ok(Outcome::new(fx.ledger.config(), rejection(&result), gain))
}

fn arbitrary_target(config: Config) -> Result<Outcome> {
    let fx = Fixture::new(config)?;
    let lookalike = Address::from_label("value-transfer-v2");
    fx.ledger.register_target(
        lookalike,
        Arc::new(RedirectingTarget::new(fx.attacker.address())),
    );

    let vault = fx.stake(&fx.victim, STAKE)?;

    let call = fx.withdraw(
        &fx.victim,
        vault,
        STAKE / 2,
        lookalike,
        fx.victim.address(),
    );
    let result = fx.ledger.apply_call(&call);

    let gain = fx.wallet(&fx.attacker);
    Ok(Outcome::new(fx.ledger.config(), rejection(&result), gain))
}

fn double_close(config: Config) -> Result<Outcome> {
    let fx = Fixture::new(config)?;
    fx.stake(&fx.victim, STAKE)?;
    let vault = fx.stake(&fx.attacker, STAKE)?;

    let close = fx.signed(&fx.attacker, vault, Instruction::Close, vec![]);
    fx.ledger.apply_call(&close)?;
    let result = fx.ledger.apply_call(&close);

    // The first close returned the attacker's own STAKE
    let gain = fx.wallet(&fx.attacker).saturating_sub(STAKE);
    Ok(Outcome::new(fx.ledger.config(), rejection(&result), gain))
}
