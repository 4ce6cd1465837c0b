//! Custody Harness Binary
//!
//! Runs every exploit scenario against the strict and relaxed policies and
//! prints the verification report as JSON.
//!
//! Usage: `custody-harness [scenario...]`

use anyhow::Context;
use custody_core::Config;
use exploit_harness::{Report, Scenario, SCENARIOS};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for the report
    let json = std::env::var("CUSTODY_LOG_JSON").is_ok_and(|v| v == "1");
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting custody harness");

    // Load configuration
    let config = if let Ok(config_path) = std::env::var("CUSTODY_CONFIG") {
        info!("Loading config from: {}", config_path);
        Config::from_file(&config_path)
            .with_context(|| format!("loading config from {}", config_path))?
    } else {
        info!("Loading config from environment variables");
        Config::from_env().context("loading config from environment")?
    };

    info!(
        "Ledger ID: {}, record type: {}",
        config.ledger_id, config.record_type
    );

    let selected = std::env::args()
        .skip(1)
        .map(|name| {
            Scenario::find(&name).ok_or(exploit_harness::Error::UnknownScenario(name))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = if selected.is_empty() {
        Report::run_scenarios(SCENARIOS.iter(), &config)?
    } else {
        Report::run_scenarios(selected, &config)?
    };

    println!("{}", report.to_json()?);

    if !report.passed {
        for verdict in report.failures() {
            error!("Scenario {} failed against {}", verdict.scenario, verdict.mechanism);
        }
        anyhow::bail!("hardening verification failed");
    }

    info!("All {} scenarios verified", report.verdicts.len());
    Ok(())
}
