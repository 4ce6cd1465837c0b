//! Configuration for the custody ledger

use crate::policy::{Mechanism, Policy};
use crate::types::{Address, TypeTag};
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger identity (mixed into every derived address)
    pub ledger_id: Address,

    /// Seed prefix for record addresses
    pub record_seed: String,

    /// Resource type name; the expected type tag is derived from it
    pub record_type: String,

    /// Authority that takes custody of closed records
    pub neutral_authority: Address,

    /// Authority that custodies holdings
    pub holding_authority: Address,

    /// Value-transfer subsystem identity
    pub transfer_target: Address,

    /// Targets allowed to receive delegated authority
    pub allowed_targets: Vec<Address>,

    /// Enforcement per mechanism
    pub policy: Policy,
}

impl Default for Config {
    fn default() -> Self {
        let transfer_target = Address::from_label("value-transfer");
        Self {
            service_name: "custody-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger_id: Address::from_label("custody-ledger"),
            record_seed: "vault".to_string(),
            record_type: "custody.vault".to_string(),
            neutral_authority: Address::ZERO,
            holding_authority: Address::from_label("holding-authority"),
            transfer_target,
            allowed_targets: vec![transfer_target],
            policy: Policy::strict(),
        }
    }
}

impl Config {
    /// Expected type tag for records and the holdings they accept
    pub fn type_tag(&self) -> TypeTag {
        TypeTag::from_name(&self.record_type)
    }

    /// Same config under a different policy
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(id) = std::env::var("CUSTODY_LEDGER_ID") {
            config.ledger_id = parse_address("CUSTODY_LEDGER_ID", &id)?;
        }

        if let Ok(seed) = std::env::var("CUSTODY_RECORD_SEED") {
            config.record_seed = seed;
        }

        if let Ok(record_type) = std::env::var("CUSTODY_RECORD_TYPE") {
            config.record_type = record_type;
        }

        if let Ok(policy) = std::env::var("CUSTODY_POLICY") {
            config.policy = match policy.as_str() {
                "strict" => Policy::strict(),
                "permissive" => Policy::permissive(),
                other => {
                    return Err(crate::Error::Config(format!(
                        "CUSTODY_POLICY must be strict or permissive, got {}",
                        other
                    )))
                }
            };
        }

        if let Ok(relax) = std::env::var("CUSTODY_RELAX") {
            for name in relax.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let mechanism = Mechanism::parse(name).ok_or_else(|| {
                    crate::Error::Config(format!("Unknown mechanism in CUSTODY_RELAX: {}", name))
                })?;
                config.policy = config.policy.relax(mechanism);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make custody ambiguous
    pub fn validate(&self) -> crate::Result<()> {
        if self.record_seed.is_empty() {
            return Err(crate::Error::Config("record_seed must not be empty".into()));
        }

        if self.record_type.is_empty() {
            return Err(crate::Error::Config("record_type must not be empty".into()));
        }

        if self.ledger_id == self.neutral_authority {
            return Err(crate::Error::Config(
                "ledger_id must differ from neutral_authority".into(),
            ));
        }

        if self.ledger_id == self.holding_authority {
            return Err(crate::Error::Config(
                "ledger_id must differ from holding_authority".into(),
            ));
        }

        Ok(())
    }
}

fn parse_address(var: &str, value: &str) -> crate::Result<Address> {
    Address::from_hex(value)
        .ok_or_else(|| crate::Error::Config(format!("{} is not a 32-byte hex address", var)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "custody-core");
        assert_eq!(config.record_seed, "vault");
        assert_eq!(config.allowed_targets, vec![config.transfer_target]);
        assert_eq!(config.policy, Policy::strict());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let ledger = Address::from_label("file-ledger");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ledger_id = \"{}\"\nrecord_type = \"custody.test\"\n\n[policy]\nreentrancy = \"permissive\"",
            ledger
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.ledger_id, ledger);
        assert_eq!(config.type_tag(), TypeTag::from_name("custody.test"));
        assert_eq!(config.policy.relaxed(), vec![Mechanism::Reentrancy]);
        // Unspecified fields keep their defaults
        assert_eq!(config.record_seed, "vault");
    }

    #[test]
    fn test_from_file_rejects_bad_address() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ledger_id = \"not-hex\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_neutral_ledger() {
        let mut config = Config::default();
        config.ledger_id = Address::ZERO;
        assert!(config.validate().is_err());
    }
}
