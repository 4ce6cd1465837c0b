//! Verification report

use crate::scenarios::{Outcome, Scenario, SCENARIOS};
use crate::Result;
use custody_core::{Address, Config, Mechanism, Policy};
use serde::Serialize;
use tracing::{error, info, info_span};
use uuid::Uuid;

/// Both runs of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Scenario name
    pub scenario: &'static str,

    /// Mechanism under test
    pub mechanism: Mechanism,

    /// Attack description
    pub attack: &'static str,

    /// Run under the strict policy
    pub strict: Outcome,

    /// Run with the scenario's mechanism relaxed
    pub relaxed: Outcome,

    /// Blocked when strict and reproduced when relaxed
    pub passed: bool,
}

impl Verdict {
    /// Run `scenario` under both policies
    pub fn verify(scenario: &Scenario, base: &Config) -> Result<Self> {
        let span = info_span!("scenario", name = scenario.name);
        let _enter = span.enter();

        let strict = scenario.run(base.clone().with_policy(Policy::strict()))?;
        let relaxed = scenario.run(
            base.clone()
                .with_policy(Policy::strict().relax(scenario.mechanism)),
        )?;
        let passed = !strict.exploited() && relaxed.exploited();

        if passed {
            info!(
                mechanism = %scenario.mechanism,
                blocked_with = ?strict.rejected_with,
                relaxed_gain = relaxed.attacker_gain,
                "hardening verified"
            );
        } else {
            error!(
                mechanism = %scenario.mechanism,
                strict_gain = strict.attacker_gain,
                relaxed_gain = relaxed.attacker_gain,
                "hardening not verified"
            );
        }

        Ok(Self {
            scenario: scenario.name,
            mechanism: scenario.mechanism,
            attack: scenario.attack,
            strict,
            relaxed,
            passed,
        })
    }
}

/// Report over a set of scenarios
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Run identifier
    pub run_id: Uuid,

    /// Ledger identity the scenarios ran under
    pub ledger_id: Address,

    /// Per-scenario verdicts
    pub verdicts: Vec<Verdict>,

    /// Every verdict passed
    pub passed: bool,
}

impl Report {
    /// Verify every scenario
    pub fn run(config: &Config) -> Result<Self> {
        Self::run_scenarios(SCENARIOS.iter(), config)
    }

    /// Verify the given scenarios
    pub fn run_scenarios<'a>(
        scenarios: impl IntoIterator<Item = &'a Scenario>,
        config: &Config,
    ) -> Result<Self> {
        let verdicts = scenarios
            .into_iter()
            .map(|scenario| Verdict::verify(scenario, config))
            .collect::<Result<Vec<_>>>()?;
        let passed = verdicts.iter().all(|v| v.passed);

        Ok(Self {
            run_id: Uuid::new_v4(),
            ledger_id: config.ledger_id,
            verdicts,
            passed,
        })
    }

    /// Failed verdicts
    pub fn failures(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| !v.passed)
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
