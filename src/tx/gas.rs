//! Gas limit and gas price selection

use crate::chain::{ChainClient, GasPrice};
use crate::config::{GasConfig, GasPriceStrategy};
use crate::error::{MintError, MintResult};

use ethers::types::U256;
use tracing::{debug, warn};

const GWEI: u64 = 1_000_000_000;

/// Picks gas parameters for the mint transaction
pub struct GasEstimator {
    /// Fixed gas limit for the mint call
    gas_limit: U256,
    /// Legacy price or EIP-1559 fees
    strategy: GasPriceStrategy,
    /// Buffer percentage added to the node's suggestion (e.g., 10 = 10%)
    price_buffer_percent: u64,
    /// Upper bound on the price per gas, in wei
    max_gas_price: Option<U256>,
}

impl GasEstimator {
    /// Create a new gas estimator
    pub fn new(config: &GasConfig) -> Self {
        Self {
            gas_limit: U256::from(config.gas_limit),
            strategy: config.strategy,
            price_buffer_percent: config.price_buffer_percent,
            max_gas_price: config
                .max_gas_price_gwei
                .map(|gwei| U256::from(gwei) * U256::from(GWEI)),
        }
    }

    /// Gas limit for the mint call
    pub fn gas_limit(&self) -> U256 {
        self.gas_limit
    }

    /// Get the gas price suggested by the node, buffered and capped
    pub async fn get_gas_price<C: ChainClient + ?Sized>(&self, client: &C) -> MintResult<GasPrice> {
        let (operation, suggested) = match self.strategy {
            GasPriceStrategy::Legacy => ("eth_gasPrice", GasPrice::Legacy(client.gas_price().await?)),
            GasPriceStrategy::Eip1559 => {
                let (max_fee_per_gas, max_priority_fee_per_gas) = client.eip1559_fees().await?;
                (
                    "eth_feeHistory",
                    GasPrice::Eip1559 {
                        max_fee_per_gas,
                        max_priority_fee_per_gas,
                    },
                )
            }
        };

        let buffered = self
            .buffer(suggested)
            .ok_or_else(|| MintError::rpc(operation, format!("gas price {:?} out of range", suggested)))?;
        let price = self.cap(buffered);
        debug!("Suggested gas price {:?}, using {:?}", suggested, price);
        Ok(price)
    }

    /// Add the buffer; `None` when the node's value overflows
    fn buffer(&self, price: GasPrice) -> Option<GasPrice> {
        let add = |v: U256| {
            v.checked_mul(U256::from(self.price_buffer_percent))
                .and_then(|extra| v.checked_add(extra / 100))
        };
        Some(match price {
            GasPrice::Legacy(price) => GasPrice::Legacy(add(price)?),
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => GasPrice::Eip1559 {
                max_fee_per_gas: add(max_fee_per_gas)?,
                max_priority_fee_per_gas: add(max_priority_fee_per_gas)?,
            },
        })
    }

    fn cap(&self, price: GasPrice) -> GasPrice {
        let Some(max) = self.max_gas_price else {
            return price;
        };

        match price {
            GasPrice::Legacy(p) if p > max => {
                warn!("Gas price {} wei exceeds cap, using {} wei", p, max);
                GasPrice::Legacy(max)
            }
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } if max_fee_per_gas > max => {
                warn!("Max fee {} wei exceeds cap, using {} wei", max_fee_per_gas, max);
                GasPrice::Eip1559 {
                    max_fee_per_gas: max,
                    max_priority_fee_per_gas: max_priority_fee_per_gas.min(max),
                }
            }
            other => other,
        }
    }

    /// Calculate the most the transaction can cost in wei, saturating at `U256::MAX`
    pub fn calculate_cost(&self, gas_price: &GasPrice) -> U256 {
        self.gas_limit.saturating_mul(gas_price.max_per_gas())
    }
}
