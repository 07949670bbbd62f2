//! Command line interface
//!
//! Flags override values from the config file. The private key is never a
//! flag; it is read from the environment variable named in the config.

use crate::config::{GasPriceStrategy, Settings};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(name = "stzeta-mint", version, about = "Mint stZETA tokens with a single signed transaction")]
pub struct Args {
    /// Config file (TOML). Defaults to config/default.toml when present
    #[arg(short, long, env = "MINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint URL
    #[arg(short, long, env = "MINT_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Token contract address
    #[arg(long, env = "MINT_CONTRACT")]
    pub contract: Option<String>,

    /// Address receiving the minted tokens
    #[arg(short = 'a', long, env = "MINT_RECIPIENT")]
    pub recipient: Option<String>,

    /// Amount to mint in base units
    #[arg(short = 'm', long, env = "MINT_AMOUNT")]
    pub amount: Option<String>,

    /// Abort unless the node reports this chain ID
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Gas limit for the mint call
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Gas pricing mode
    #[arg(long, value_enum)]
    pub gas_strategy: Option<GasStrategyArg>,

    /// Seconds to wait for the transaction to be mined
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GasStrategyArg {
    Legacy,
    Eip1559,
}

impl From<GasStrategyArg> for GasPriceStrategy {
    fn from(arg: GasStrategyArg) -> Self {
        match arg {
            GasStrategyArg::Legacy => GasPriceStrategy::Legacy,
            GasStrategyArg::Eip1559 => GasPriceStrategy::Eip1559,
        }
    }
}

impl Args {
    /// Load the config file (if any), apply flag overrides and validate
    pub fn resolve_settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Settings::load(&default_path)?
                } else {
                    Settings::default()
                }
            }
        };

        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply flag values on top of `settings`
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.rpc_url {
            settings.rpc.url = url.clone();
        }
        if let Some(contract) = &self.contract {
            settings.mint.contract_address = contract.clone();
        }
        if let Some(recipient) = &self.recipient {
            settings.mint.recipient = recipient.clone();
        }
        if let Some(amount) = &self.amount {
            settings.mint.amount = amount.clone();
        }
        if self.chain_id.is_some() {
            settings.rpc.chain_id = self.chain_id;
        }
        if let Some(gas_limit) = self.gas_limit {
            settings.gas.gas_limit = gas_limit;
        }
        if let Some(strategy) = self.gas_strategy {
            settings.gas.strategy = strategy.into();
        }
        if let Some(timeout) = self.timeout_secs {
            settings.rpc.confirmation_timeout_secs = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[rpc]
url = "http://from-file:8545"

[mint]
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
amount = "5"
"#
        )
        .unwrap();

        let args = Args::try_parse_from([
            "stzeta-mint",
            "--config",
            file.path().to_str().unwrap(),
            "--rpc-url",
            "http://from-flag:8545",
            "--amount",
            "77",
            "--gas-strategy",
            "eip1559",
            "--timeout-secs",
            "12",
        ])
        .unwrap();

        let settings = args.resolve_settings().unwrap();
        assert_eq!(settings.rpc.url, "http://from-flag:8545");
        assert_eq!(settings.mint.amount, "77");
        assert_eq!(
            settings.mint.recipient,
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        );
        assert_eq!(settings.gas.strategy, GasPriceStrategy::Eip1559);
        assert_eq!(settings.rpc.confirmation_timeout_secs, 12);
    }

    #[test]
    fn test_apply_without_flags_keeps_settings() {
        let args = Args::try_parse_from(["stzeta-mint"]).unwrap();
        let mut settings = Settings::default();
        settings.rpc.url = "http://node:8545".to_string();
        args.apply(&mut settings);
        assert_eq!(settings.rpc.url, "http://node:8545");
        assert_eq!(settings.gas.gas_limit, 300_000);
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let args =
            Args::try_parse_from(["stzeta-mint", "--config", "/nonexistent/mint.toml"]).unwrap();
        assert!(args.resolve_settings().is_err());
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        assert!(Args::try_parse_from(["stzeta-mint", "--gas-strategy", "turbo"]).is_err());
    }
}
