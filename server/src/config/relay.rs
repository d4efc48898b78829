use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::ledger::StartBlock;
use crate::models::{Address, StatusCode};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// JSON-RPC endpoint, contract address and transaction settings.
#[derive(Clone, Debug)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub app_address: Address,
    pub registration_gas: u64,
    pub response_gas: u64,
    pub gas_price: u64,
    pub poll_interval: Duration,
    pub block_range: u64,
    pub receipt_poll_attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OraclePoolConfig {
    pub count: usize,
    pub offset: usize,
    pub concurrency: usize,
}

impl Default for OraclePoolConfig {
    fn default() -> Self {
        Self {
            count: 20,
            offset: 20,
            concurrency: 8,
        }
    }
}

/// How oracles decide the status code they report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusSetting {
    Fixed(StatusCode),
    Random,
}

impl FromStr for StatusSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("random") {
            return Ok(StatusSetting::Random);
        }
        raw.parse().map(StatusSetting::Fixed)
    }
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub ledger: LedgerSettings,
    pub pool: OraclePoolConfig,
    pub status: StatusSetting,
    pub request_start: StartBlock,
    pub http: HttpConfig,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_address = lookup("FLIGHT_SURETY_APP_ADDRESS")
            .filter(|value| !value.trim().is_empty())
            .map(Address::new)
            .ok_or(ConfigError::Missing("FLIGHT_SURETY_APP_ADDRESS"))?;
        if !app_address.is_well_formed() {
            return Err(ConfigError::Invalid {
                key: "FLIGHT_SURETY_APP_ADDRESS",
                value: app_address.to_string(),
                reason: "expected 0x followed by 40 hex digits".to_string(),
            });
        }

        let ledger = LedgerSettings {
            rpc_url: lookup("LEDGER_RPC_URL")
                .unwrap_or_else(|| "http://127.0.0.1:9545".to_string()),
            app_address,
            registration_gas: parse_or(&lookup, "REGISTRATION_GAS", 5_000_000)?,
            response_gas: parse_or(&lookup, "RESPONSE_GAS", 500_000)?,
            gas_price: parse_or(&lookup, "GAS_PRICE", 20_000_000)?,
            poll_interval: Duration::from_millis(parse_or(&lookup, "EVENT_POLL_INTERVAL_MS", 1_000)?),
            block_range: parse_or(&lookup, "EVENT_BLOCK_RANGE", 200u64)?.max(1),
            receipt_poll_attempts: parse_or(&lookup, "RECEIPT_POLL_ATTEMPTS", 20)?,
        };

        let defaults = OraclePoolConfig::default();
        let pool = OraclePoolConfig {
            count: parse_or(&lookup, "ORACLE_COUNT", defaults.count)?,
            offset: parse_or(&lookup, "ORACLE_ACCOUNT_OFFSET", defaults.offset)?,
            concurrency: parse_or(&lookup, "ORACLE_BOOTSTRAP_CONCURRENCY", defaults.concurrency)?
                .max(1),
        };

        let http = HttpConfig {
            port: parse_or(&lookup, "PORT", 3000)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:8000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        };

        Ok(Self {
            ledger,
            pool,
            status: parse_or(&lookup, "ORACLE_STATUS_CODE", StatusSetting::Fixed(StatusCode::LateAirline))?,
            request_start: parse_or(&lookup, "ORACLE_REQUEST_START", StartBlock::Latest)?,
            http,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                key,
                value,
                reason: err.to_string(),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const APP: &str = "0x345ca3e014aaf5dca488057592ee47305d9b3e10";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[("FLIGHT_SURETY_APP_ADDRESS", APP)])).unwrap();

        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:9545");
        assert_eq!(config.ledger.app_address.as_str(), APP);
        assert_eq!(config.ledger.registration_gas, 5_000_000);
        assert_eq!(config.ledger.response_gas, 500_000);
        assert_eq!(config.ledger.gas_price, 20_000_000);
        assert_eq!(config.pool, OraclePoolConfig::default());
        assert_eq!(config.status, StatusSetting::Fixed(StatusCode::LateAirline));
        assert_eq!(config.request_start, StartBlock::Latest);
        assert_eq!(config.http.port, 3000);
        assert_eq!(config.http.cors_allowed_origins, vec!["http://localhost:8000"]);
    }

    #[test]
    fn test_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("FLIGHT_SURETY_APP_ADDRESS", APP),
            ("ORACLE_COUNT", "5"),
            ("ORACLE_ACCOUNT_OFFSET", "0"),
            ("ORACLE_BOOTSTRAP_CONCURRENCY", "0"),
            ("ORACLE_STATUS_CODE", "random"),
            ("ORACLE_REQUEST_START", "genesis"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
        ]))
        .unwrap();

        assert_eq!(config.pool.count, 5);
        assert_eq!(config.pool.offset, 0);
        assert_eq!(config.pool.concurrency, 1);
        assert_eq!(config.status, StatusSetting::Random);
        assert_eq!(config.request_start, StartBlock::Genesis);
        assert_eq!(config.http.cors_allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_missing_app_address() {
        let err = RelayConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("FLIGHT_SURETY_APP_ADDRESS"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = RelayConfig::from_lookup(lookup(&[
            ("FLIGHT_SURETY_APP_ADDRESS", APP),
            ("ORACLE_COUNT", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ORACLE_COUNT", .. }));

        let err = RelayConfig::from_lookup(lookup(&[
            ("FLIGHT_SURETY_APP_ADDRESS", APP),
            ("ORACLE_STATUS_CODE", "delayed"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ORACLE_STATUS_CODE", .. }));
    }

    #[test]
    fn test_malformed_app_address() {
        let err = RelayConfig::from_lookup(lookup(&[("FLIGHT_SURETY_APP_ADDRESS", "0x1234")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FLIGHT_SURETY_APP_ADDRESS", .. }));
    }
}
