//! Exploit scenarios against the strict and relaxed policies

use custody_core::{Config, ErrorKind, Instruction, Mechanism, Policy, ResourceStatus};
use exploit_harness::{Fixture, Report, Scenario, SCENARIOS};
use proptest::prelude::*;
use std::io::Write;

fn strict(name: &str) -> exploit_harness::Outcome {
    Scenario::find(name)
        .unwrap()
        .run(Config::default())
        .unwrap()
}

fn relaxed(name: &str) -> exploit_harness::Outcome {
    let scenario = Scenario::find(name).unwrap();
    scenario
        .run(Config::default().with_policy(Policy::strict().relax(scenario.mechanism)))
        .unwrap()
}

#[test]
fn test_every_hardening_verified() {
    let report = Report::run(&Config::default()).unwrap();

    assert_eq!(report.verdicts.len(), SCENARIOS.len());
    for verdict in &report.verdicts {
        assert!(verdict.passed, "{} not verified: {:?}", verdict.scenario, verdict);
    }
    assert!(report.passed);
    assert_eq!(report.failures().count(), 0);
}

#[test]
fn test_unsigned_impersonation() {
    assert_eq!(
        strict("unsigned_impersonation").rejected_with,
        Some(ErrorKind::MissingSignature)
    );
    assert_eq!(relaxed("unsigned_impersonation").attacker_gain, 1_000_000_000);
}

#[test]
fn test_forged_record() {
    assert_eq!(
        strict("forged_record").rejected_with,
        Some(ErrorKind::InvalidDerivedAddress)
    );
    assert!(relaxed("forged_record").exploited());
}

#[test]
fn test_underflow_withdraw() {
    let outcome = strict("underflow_withdraw");
    assert_eq!(outcome.rejected_with, Some(ErrorKind::InsufficientFunds));
    assert_eq!(outcome.attacker_gain, 0);
    assert_eq!(relaxed("underflow_withdraw").attacker_gain, 1_000_000_000);
}

#[test]
fn test_reentrant_withdraw() {
    let outcome = strict("reentrant_withdraw");
    assert_eq!(outcome.rejected_with, Some(ErrorKind::ReentrancyBlocked));
    assert_eq!(outcome.attacker_gain, 0);

    let outcome = relaxed("reentrant_withdraw");
    assert_eq!(outcome.rejected_with, None);
    assert_eq!(outcome.attacker_gain, 600_000_000);
    assert_eq!(outcome.relaxed, vec![Mechanism::Reentrancy]);
}

#[test]
fn test_type_confusion() {
    assert_eq!(
        strict("type_confusion").rejected_with,
        Some(ErrorKind::InvalidTypeTag)
    );
    assert_eq!(relaxed("type_confusion").attacker_gain, 1_000_000_000);
}

#[test]
fn test_arbitrary_target() {
    assert_eq!(
        strict("arbitrary_target").rejected_with,
        Some(ErrorKind::InvalidExternalTarget)
    );
    assert_eq!(relaxed("arbitrary_target").attacker_gain, 500_000_000);
}

#[test]
fn test_double_close() {
    assert_eq!(
        strict("double_close").rejected_with,
        Some(ErrorKind::ResourceClosed)
    );
    assert_eq!(relaxed("double_close").attacker_gain, 1_000_000_000);
}

#[test]
fn test_fully_permissive_ledger_is_exploitable() {
    for scenario in SCENARIOS.iter() {
        let outcome = scenario
            .run(Config::default().with_policy(Policy::permissive()))
            .unwrap();
        assert!(outcome.exploited(), "{} not reproduced", scenario.name);
    }
}

#[test]
fn test_refunded_closed_record_stays_closed() {
    let fx = Fixture::new(Config::default()).unwrap();
    let vault = fx.stake(&fx.victim, 250).unwrap();
    fx.ledger
        .apply_call(&fx.signed(&fx.victim, vault, Instruction::Close, vec![]))
        .unwrap();

    fx.ledger.fund(vault, 1_000).unwrap();
    assert!(matches!(
        fx.deposit(&fx.victim, vault, 1),
        Err(exploit_harness::Error::Setup(ErrorKind::ResourceClosed))
    ));

    let withdraw = fx.withdraw(
        &fx.victim,
        vault,
        1,
        fx.transfer_target(),
        fx.victim.address(),
    );
    assert_eq!(
        fx.ledger.apply_call(&withdraw),
        Err(ErrorKind::ResourceClosed)
    );

    let snapshot = fx.ledger.snapshot(&vault).unwrap();
    assert_eq!(snapshot.status, ResourceStatus::Closed);
    assert_eq!(snapshot.balance, 0);
    assert_eq!(fx.wallet(&fx.victim), 250);
}

#[test]
fn test_deposit_without_funds_is_rejected() {
    let fx = Fixture::new(Config::default()).unwrap();
    let vault = fx.open_vault(&fx.attacker).unwrap();

    assert!(matches!(
        fx.deposit(&fx.attacker, vault, 1_000_000_000),
        Err(exploit_harness::Error::Setup(ErrorKind::InsufficientFunds))
    ));
    let withdraw = fx.withdraw(
        &fx.attacker,
        vault,
        1_000_000_000,
        fx.transfer_target(),
        fx.attacker.address(),
    );
    assert_eq!(fx.ledger.apply_call(&withdraw), Err(ErrorKind::InsufficientFunds));
    assert_eq!(fx.wallet(&fx.attacker), 0);
    assert_eq!(fx.ledger.total_value(), 0);
}

#[test]
fn test_victim_loses_what_the_attacker_gains() {
    // Double close with teardown relaxed: the second payout is the victim's stake
    let config = Config::default().with_policy(Policy::strict().relax(Mechanism::Teardown));
    let fx = Fixture::new(config).unwrap();
    let victim_vault = fx.stake(&fx.victim, 700).unwrap();
    let vault = fx.stake(&fx.attacker, 500).unwrap();

    let close = fx.signed(&fx.attacker, vault, Instruction::Close, vec![]);
    fx.ledger.apply_call(&close).unwrap();
    fx.ledger.apply_call(&close).unwrap();

    assert_eq!(fx.wallet(&fx.attacker), 1_000);
    assert_eq!(fx.ledger.value_of(&fx.ledger.escrow()), 200);
    assert_eq!(fx.ledger.total_value(), 1_200);
    assert_eq!(
        fx.ledger.apply_call(&fx.signed(&fx.victim, victim_vault, Instruction::Close, vec![])),
        Err(ErrorKind::InsufficientFunds)
    );
}

#[test]
fn test_report_json_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "record_type = \"custody.harness\"").unwrap();
    let config = Config::from_file(file.path()).unwrap();

    let scenario = Scenario::find("double_close").unwrap();
    let report = Report::run_scenarios([scenario], &config).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["passed"], true);
    assert_eq!(json["verdicts"][0]["mechanism"], "teardown");
    assert_eq!(json["verdicts"][0]["strict"]["rejected_with"], "resource_closed");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: The strict ledger pays a legitimate withdrawal exactly once
    #[test]
    fn prop_legitimate_withdraw_pays_once(deposit in 1u64..1_000_000_000, cut in 1u64..=100) {
        let fx = Fixture::new(Config::default()).unwrap();
        let vault = fx.stake(&fx.victim, deposit).unwrap();

        let amount = (deposit / 100 * cut).max(1);
        let call = fx.withdraw(&fx.victim, vault, amount, fx.transfer_target(), fx.victim.address());
        let snapshot = fx.ledger.apply_call(&call).unwrap();

        prop_assert_eq!(snapshot.balance, deposit - amount);
        prop_assert_eq!(fx.wallet(&fx.victim), amount);
        prop_assert_eq!(fx.ledger.value_of(&fx.ledger.escrow()), deposit - amount);
    }
}
