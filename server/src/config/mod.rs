//! Runtime configuration, read from the environment.

pub mod relay;

pub use relay::{
    ConfigError, HttpConfig, LedgerSettings, OraclePoolConfig, RelayConfig, StatusSetting,
};
