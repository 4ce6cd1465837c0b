//! Enforcement policies
//!
//! One ledger runs every operation; the policy decides, per safety
//! mechanism, whether the hardened check runs (`Strict`) or the broken
//! behavior is reproduced (`Permissive`). The harness runs each attack
//! against both so every hardening is shown to matter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a single mechanism is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    /// Hardened behavior
    #[default]
    Strict,
    /// Broken behavior, for exploit reproduction
    Permissive,
}

impl Enforcement {
    /// Whether the hardened check runs
    pub fn is_strict(&self) -> bool {
        matches!(self, Enforcement::Strict)
    }
}

/// Safety mechanism guarded by a policy entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Principal proofs
    Identity,
    /// Record address re-derivation and custodian check
    DerivedAddress,
    /// Checked add/sub
    Arithmetic,
    /// Lock plus effects-before-interactions
    Reentrancy,
    /// Holding type tags
    TypeTag,
    /// Outgoing target allow-list
    ExternalTarget,
    /// Complete, non-revivable close
    Teardown,
}

impl Mechanism {
    /// Every mechanism, in evaluation order
    pub const ALL: [Mechanism; 7] = [
        Mechanism::Identity,
        Mechanism::DerivedAddress,
        Mechanism::Arithmetic,
        Mechanism::Reentrancy,
        Mechanism::TypeTag,
        Mechanism::ExternalTarget,
        Mechanism::Teardown,
    ];

    /// snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            Mechanism::Identity => "identity",
            Mechanism::DerivedAddress => "derived_address",
            Mechanism::Arithmetic => "arithmetic",
            Mechanism::Reentrancy => "reentrancy",
            Mechanism::TypeTag => "type_tag",
            Mechanism::ExternalTarget => "external_target",
            Mechanism::Teardown => "teardown",
        }
    }

    /// Parse from snake_case name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == s)
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-mechanism enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Principal proofs
    pub identity: Enforcement,
    /// Record address re-derivation
    pub derived_address: Enforcement,
    /// Checked arithmetic
    pub arithmetic: Enforcement,
    /// Lock plus effects-before-interactions
    pub reentrancy: Enforcement,
    /// Holding type tags
    pub type_tag: Enforcement,
    /// Outgoing target allow-list
    pub external_target: Enforcement,
    /// Complete close
    pub teardown: Enforcement,
}

impl Policy {
    /// Every mechanism hardened
    pub fn strict() -> Self {
        Self::uniform(Enforcement::Strict)
    }

    /// Every mechanism broken
    pub fn permissive() -> Self {
        Self::uniform(Enforcement::Permissive)
    }

    fn uniform(e: Enforcement) -> Self {
        Self {
            identity: e,
            derived_address: e,
            arithmetic: e,
            reentrancy: e,
            type_tag: e,
            external_target: e,
            teardown: e,
        }
    }

    /// Enforcement for one mechanism
    pub fn get(&self, mechanism: Mechanism) -> Enforcement {
        match mechanism {
            Mechanism::Identity => self.identity,
            Mechanism::DerivedAddress => self.derived_address,
            Mechanism::Arithmetic => self.arithmetic,
            Mechanism::Reentrancy => self.reentrancy,
            Mechanism::TypeTag => self.type_tag,
            Mechanism::ExternalTarget => self.external_target,
            Mechanism::Teardown => self.teardown,
        }
    }

    /// Same policy with one mechanism set to `enforcement`
    pub fn with(mut self, mechanism: Mechanism, enforcement: Enforcement) -> Self {
        let slot = match mechanism {
            Mechanism::Identity => &mut self.identity,
            Mechanism::DerivedAddress => &mut self.derived_address,
            Mechanism::Arithmetic => &mut self.arithmetic,
            Mechanism::Reentrancy => &mut self.reentrancy,
            Mechanism::TypeTag => &mut self.type_tag,
            Mechanism::ExternalTarget => &mut self.external_target,
            Mechanism::Teardown => &mut self.teardown,
        };
        *slot = enforcement;
        self
    }

    /// Same policy with one mechanism relaxed
    pub fn relax(self, mechanism: Mechanism) -> Self {
        self.with(mechanism, Enforcement::Permissive)
    }

    /// Mechanisms currently relaxed
    pub fn relaxed(&self) -> Vec<Mechanism> {
        Mechanism::ALL
            .into_iter()
            .filter(|m| !self.get(*m).is_strict())
            .collect()
    }
}
