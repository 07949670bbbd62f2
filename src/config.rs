//! Configuration management for the mint submitter
//!
//! Loads configuration from a TOML file with environment variable substitution.
//! Every section has defaults so a run can be described entirely by CLI flags.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR_RE: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub mint: MintConfig,
    pub gas: GasConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
    /// Expected chain ID; the run aborts if the node reports another one
    pub chain_id: Option<u64>,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub confirmation_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            chain_id: None,
            request_timeout_secs: 30,
            poll_interval_ms: 1000,
            confirmation_timeout_secs: 300,
        }
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "MINT_PRIVATE_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MintConfig {
    pub contract_address: String,
    pub recipient: String,
    /// Amount in base units, decimal
    pub amount: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            recipient: String::new(),
            // 1 token with 18 decimals
            amount: "1000000000000000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    pub strategy: GasPriceStrategy,
    pub gas_limit: u64,
    pub price_buffer_percent: u64,
    pub max_gas_price_gwei: Option<u64>,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            strategy: GasPriceStrategy::Legacy,
            gas_limit: 300_000,
            price_buffer_percent: 0,
            max_gas_price_gwei: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    Legacy,
    Eip1559,
}

impl Settings {
    /// Load settings from a configuration file
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        toml::from_str(&config_str).with_context(|| "Failed to parse configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("No RPC URL configured");
        }
        if self.mint.contract_address.trim().is_empty() {
            anyhow::bail!("No contract address configured");
        }
        if self.mint.recipient.trim().is_empty() {
            anyhow::bail!("No recipient address configured");
        }
        if self.gas.gas_limit == 0 {
            anyhow::bail!("Gas limit must be greater than zero");
        }
        if self.rpc.poll_interval_ms == 0 {
            anyhow::bail!("Receipt poll interval must be greater than zero");
        }
        if self.rpc.request_timeout_secs == 0 {
            anyhow::bail!("RPC request timeout must be greater than zero");
        }
        if self.rpc.confirmation_timeout_secs == 0 {
            anyhow::bail!("Confirmation timeout must be greater than zero");
        }
        if self.wallet.private_key_env.trim().is_empty() {
            anyhow::bail!("Private key environment variable name is empty");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_RE
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn complete() -> Settings {
        let mut settings = Settings::default();
        settings.rpc.url = "http://127.0.0.1:8545".to_string();
        settings.mint.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        settings.mint.recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string();
        settings
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("STZETA_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${STZETA_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_missing_env_var_becomes_empty() {
        let result = substitute_env_vars("key = \"${STZETA_SURELY_UNSET_VAR}\"");
        assert_eq!(result, "key = \"\"");
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.gas.gas_limit, 300_000);
        assert_eq!(settings.gas.strategy, GasPriceStrategy::Legacy);
        assert_eq!(settings.mint.amount, "1000000000000000000");
        assert_eq!(settings.wallet.private_key_env, "MINT_PRIVATE_KEY");
        assert_eq!(settings.rpc.poll_interval(), Duration::from_secs(1));
        assert!(settings.rpc.chain_id.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[rpc]
url = "http://localhost:8545"
chain_id = 7001
confirmation_timeout_secs = 60

[mint]
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
amount = "42"

[gas]
strategy = "eip1559"
max_gas_price_gwei = 100
"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.rpc.chain_id, Some(7001));
        assert_eq!(settings.rpc.confirmation_timeout(), Duration::from_secs(60));
        assert_eq!(settings.mint.amount, "42");
        assert_eq!(settings.gas.strategy, GasPriceStrategy::Eip1559);
        assert_eq!(settings.gas.max_gas_price_gwei, Some(100));
        assert_eq!(settings.gas.gas_limit, 300_000);
        settings.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/stzeta.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = Settings::from_toml_str("[gas]\nstrategy = \"turbo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        complete().validate().unwrap();

        let mut settings = complete();
        settings.rpc.url.clear();
        assert!(settings.validate().is_err());

        let mut settings = complete();
        settings.mint.recipient = "  ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = complete();
        settings.gas.gas_limit = 0;
        assert!(settings.validate().is_err());

        let mut settings = complete();
        settings.rpc.poll_interval_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = complete();
        settings.rpc.request_timeout_secs = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("request timeout"));

        let mut settings = complete();
        settings.rpc.confirmation_timeout_secs = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Confirmation timeout"));
    }
}
