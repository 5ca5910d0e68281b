//! Ledger configuration
//!
//! All tunables flow through environment variables with the `LEDGER_`
//! prefix, loaded once by the process entry point and injected into the
//! components at construction time.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use core_kernel::{CoreError, Timezone};
use domain_ledger::RepairPolicy;
use infra_store::StoreConfig;

/// Ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Log level
    pub log_level: String,
    /// Business timezone for month bucketing (IANA name)
    pub timezone: String,
    /// Shards per counter
    pub counter_shards: u32,
    /// Balance audit repair policy: `two_leg_averaging` or `flag_only`
    pub repair_policy: String,
    /// Logical store name
    pub store_name: String,
    /// Store operation timeout in seconds
    pub op_timeout_secs: u64,
    /// Maximum optimistic transaction attempts
    pub txn_max_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            timezone: "UTC".to_string(),
            counter_shards: 32,
            repair_policy: "two_leg_averaging".to_string(),
            store_name: "ledger".to_string(),
            op_timeout_secs: 30,
            txn_max_attempts: 5,
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from `LEDGER_`-prefixed environment variables
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = LedgerConfig::default();
        config::Config::builder()
            .set_default("log_level", defaults.log_level)?
            .set_default("timezone", defaults.timezone)?
            .set_default("counter_shards", defaults.counter_shards as i64)?
            .set_default("repair_policy", defaults.repair_policy)?
            .set_default("store_name", defaults.store_name)?
            .set_default("op_timeout_secs", defaults.op_timeout_secs as i64)?
            .set_default("txn_max_attempts", defaults.txn_max_attempts as i64)?
            .add_source(config::Environment::with_prefix("LEDGER"))
            .build()?
            .try_deserialize()
    }

    /// Parses the configured business timezone
    pub fn timezone(&self) -> Result<Timezone, CoreError> {
        chrono_tz::Tz::from_str(&self.timezone)
            .map(Timezone::new)
            .map_err(|_| {
                CoreError::Configuration(format!("invalid timezone: {}", self.timezone))
            })
    }

    /// Parses the configured repair policy
    pub fn repair_policy(&self) -> Result<RepairPolicy, CoreError> {
        match self.repair_policy.as_str() {
            "two_leg_averaging" => Ok(RepairPolicy::TwoLegAveraging),
            "flag_only" => Ok(RepairPolicy::FlagOnly),
            other => Err(CoreError::Configuration(format!(
                "invalid repair policy: {}",
                other
            ))),
        }
    }

    /// Builds the store client configuration
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.store_name.clone())
            .op_timeout(Duration::from_secs(self.op_timeout_secs))
            .max_txn_attempts(self.txn_max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_cleanly() {
        let config = LedgerConfig::default();

        assert_eq!(config.timezone().unwrap(), Timezone::default());
        assert_eq!(config.repair_policy().unwrap(), RepairPolicy::TwoLegAveraging);
        assert_eq!(config.store_config().max_txn_attempts, 5);
    }

    #[test]
    fn test_flag_only_policy_parses() {
        let config = LedgerConfig {
            repair_policy: "flag_only".to_string(),
            ..Default::default()
        };
        assert_eq!(config.repair_policy().unwrap(), RepairPolicy::FlagOnly);
    }

    #[test]
    fn test_invalid_timezone_is_a_configuration_error() {
        let config = LedgerConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.timezone(),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_policy_is_a_configuration_error() {
        let config = LedgerConfig {
            repair_policy: "guess".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.repair_policy(),
            Err(CoreError::Configuration(_))
        ));
    }
}
