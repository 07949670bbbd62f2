//! JSON-RPC chain access behind the `ChainClient` trait

use crate::config::RpcConfig;
use crate::error::{MintError, MintResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::RpcError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// The node calls a mint run needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain ID reported by the node
    async fn chain_id(&self) -> MintResult<u64>;

    /// Next nonce for `address`, counting transactions still in the pool
    async fn pending_nonce(&self, address: Address) -> MintResult<U256>;

    /// Balance of `address` in wei
    async fn balance(&self, address: Address) -> MintResult<U256>;

    /// Node-suggested legacy gas price
    async fn gas_price(&self) -> MintResult<U256>;

    /// Node-estimated EIP-1559 fees as `(max_fee_per_gas, max_priority_fee_per_gas)`
    async fn eip1559_fees(&self) -> MintResult<(U256, U256)>;

    /// Submit a signed, RLP-encoded transaction and return its hash
    async fn send_raw_transaction(&self, raw: Bytes) -> MintResult<H256>;

    /// Receipt for `tx_hash`, `None` while not yet mined
    async fn transaction_receipt(&self, tx_hash: H256) -> MintResult<Option<TransactionReceipt>>;
}

/// HTTP JSON-RPC provider with a per-request timeout
pub struct ChainProvider {
    /// Underlying ethers provider
    http: Provider<Http>,
    /// Timeout applied to each RPC call
    request_timeout: Duration,
}

impl ChainProvider {
    /// Dial the endpoint and make sure it answers
    pub async fn connect(config: &RpcConfig) -> MintResult<Self> {
        let endpoint = config.url.clone();
        let http = Provider::<Http>::try_from(endpoint.as_str())
            .map_err(|e| MintError::Connection {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?
            .interval(config.poll_interval());

        let request_timeout = config.request_timeout();
        let block = match timeout(request_timeout, http.get_block_number()).await {
            Ok(Ok(block)) => block.as_u64(),
            Ok(Err(e)) => {
                return Err(MintError::Connection {
                    endpoint,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(MintError::Connection {
                    endpoint,
                    message: format!("no response within {:?}", request_timeout),
                })
            }
        };

        info!("Connected to {} (latest block {})", endpoint, block);

        Ok(Self {
            http,
            request_timeout,
        })
    }

    /// Run one RPC call under the request timeout, mapping failures to `Rpc`
    async fn call<T, F>(&self, operation: &str, fut: F) -> MintResult<T>
    where
        F: Future<Output = Result<T, ProviderError>> + Send,
    {
        match timeout(self.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(MintError::rpc(operation, e)),
            Err(_) => Err(MintError::rpc(
                operation,
                format!("no response within {:?}", self.request_timeout),
            )),
        }
    }
}

#[async_trait]
impl ChainClient for ChainProvider {
    async fn chain_id(&self) -> MintResult<u64> {
        let id = self.call("eth_chainId", self.http.get_chainid()).await?;
        if id > U256::from(u64::MAX) {
            return Err(MintError::rpc("eth_chainId", format!("chain ID {} out of range", id)));
        }
        Ok(id.as_u64())
    }

    async fn pending_nonce(&self, address: Address) -> MintResult<U256> {
        self.call(
            "eth_getTransactionCount",
            self.http
                .get_transaction_count(address, Some(BlockNumber::Pending.into())),
        )
        .await
    }

    async fn balance(&self, address: Address) -> MintResult<U256> {
        self.call("eth_getBalance", self.http.get_balance(address, None))
            .await
    }

    async fn gas_price(&self) -> MintResult<U256> {
        self.call("eth_gasPrice", self.http.get_gas_price()).await
    }

    async fn eip1559_fees(&self) -> MintResult<(U256, U256)> {
        self.call("eth_feeHistory", self.http.estimate_eip1559_fees(None))
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> MintResult<H256> {
        // A timeout here leaves the outcome unknown; it is reported as a
        // transport failure rather than a rejection.
        match timeout(self.request_timeout, self.http.send_raw_transaction(raw)).await {
            Ok(Ok(pending)) => {
                let tx_hash = pending.tx_hash();
                debug!("Node accepted transaction {:?}", tx_hash);
                Ok(tx_hash)
            }
            Ok(Err(e)) => match RpcError::as_error_response(&e) {
                Some(response) => Err(MintError::rejected(response.message.clone())),
                None => Err(MintError::rpc("eth_sendRawTransaction", e)),
            },
            Err(_) => Err(MintError::rpc(
                "eth_sendRawTransaction",
                format!("no response within {:?}", self.request_timeout),
            )),
        }
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> MintResult<Option<TransactionReceipt>> {
        self.call(
            "eth_getTransactionReceipt",
            self.http.get_transaction_receipt(tx_hash),
        )
        .await
    }
}

/// Gas price types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPrice {
    Legacy(U256),
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasPrice {
    /// Highest price per gas the transaction may pay
    pub fn max_per_gas(&self) -> U256 {
        match self {
            GasPrice::Legacy(price) => *price,
            GasPrice::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}
