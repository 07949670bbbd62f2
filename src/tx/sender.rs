//! Mint transaction submitter
//!
//! `MintSubmitter::submit` fetches the chain ID and pending nonce, encodes the
//! `mint` call, signs and sends it exactly once. It consumes the submitter, so
//! the same request can never go out twice. The returned `PendingMint` is
//! then waited on for its receipt.

use super::abi::{MintCall, MintFunction};
use super::gas::GasEstimator;
use super::signer::TxSigner;
use crate::chain::{receipt, ChainClient, GasPrice, ReceiptWaiter};
use crate::config::Settings;
use crate::error::{MintError, MintResult};

use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The contract call a submitter sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintRequest {
    pub contract: Address,
    pub call: MintCall,
}

impl MintRequest {
    /// Build the request from configured strings
    pub fn from_settings(settings: &Settings) -> MintResult<Self> {
        let contract = super::abi::parse_address(&settings.mint.contract_address)
            .map_err(|e| MintError::Config(format!("Invalid contract address: {}", e)))?;
        let call = MintCall::parse(&settings.mint.recipient, &settings.mint.amount)?;
        Ok(Self { contract, call })
    }
}

/// Result of a mined mint
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub tx_hash: H256,
    pub sender: Address,
    pub nonce: U256,
    pub block_number: u64,
    pub gas_used: Option<U256>,
}

/// Sends one mint transaction
pub struct MintSubmitter<C> {
    /// Chain client
    client: C,
    /// Signing key
    signer: TxSigner,
    /// Gas estimator
    gas_estimator: GasEstimator,
    /// Fixed contract interface
    mint_fn: MintFunction,
    /// What to mint, and where
    request: MintRequest,
    /// Chain ID the node must report, if pinned
    expected_chain_id: Option<u64>,
    /// Delay between receipt lookups
    poll_interval: Duration,
}

impl<C: ChainClient> MintSubmitter<C> {
    /// Create a new submitter
    pub fn new(
        client: C,
        signer: TxSigner,
        request: MintRequest,
        settings: &Settings,
    ) -> MintResult<Self> {
        Ok(Self {
            client,
            signer,
            gas_estimator: GasEstimator::new(&settings.gas),
            mint_fn: MintFunction::load()?,
            request,
            expected_chain_id: settings.rpc.chain_id,
            poll_interval: settings.rpc.poll_interval(),
        })
    }

    /// Build, sign and submit the mint transaction
    pub async fn submit(self) -> MintResult<PendingMint<C>> {
        let sender = self.signer.address();

        let chain_id = self.client.chain_id().await?;
        if let Some(expected) = self.expected_chain_id {
            if expected != chain_id {
                return Err(MintError::ChainMismatch {
                    expected,
                    actual: chain_id,
                });
            }
        }

        let nonce = self.client.pending_nonce(sender).await?;
        info!("Sender {:?} on chain {} with nonce {}", sender, chain_id, nonce);

        let data = self.mint_fn.encode(&self.request.call)?;

        let gas_limit = self.gas_estimator.gas_limit();
        let gas_price = self.gas_estimator.get_gas_price(&self.client).await?;
        self.check_balance(sender, &gas_price).await;

        let mut tx = build_mint_tx(
            self.request.contract,
            data.into(),
            nonce,
            gas_limit,
            &gas_price,
        );
        let signed = self.signer.sign(&mut tx, chain_id).await?;

        info!(
            "Minting {} to {:?} via {:?} (gas limit {}, price {:?})",
            self.request.call.amount, self.request.call.to, self.request.contract, gas_limit, gas_price
        );

        let tx_hash = self.client.send_raw_transaction(signed.raw).await?;
        if tx_hash != signed.hash {
            warn!(
                "Node returned hash {:?}, locally computed {:?}",
                tx_hash, signed.hash
            );
        }

        Ok(PendingMint {
            client: self.client,
            tx_hash,
            sender,
            nonce,
            poll_interval: self.poll_interval,
        })
    }

    /// Warn when the sender cannot cover the worst-case fee. The node has the
    /// final say, so this never fails the run.
    async fn check_balance(&self, sender: Address, gas_price: &GasPrice) {
        let cost = self.gas_estimator.calculate_cost(gas_price);
        match self.client.balance(sender).await {
            Ok(balance) if balance < cost => warn!(
                "Balance {} wei of {:?} is below the maximum fee {} wei",
                balance, sender, cost
            ),
            Ok(balance) => debug!("Balance {} wei covers maximum fee {} wei", balance, cost),
            Err(e) => warn!("Could not check balance of {:?}: {}", sender, e),
        }
    }
}

/// Build the unsigned call transaction with zero value
pub fn build_mint_tx(
    contract: Address,
    data: Bytes,
    nonce: U256,
    gas_limit: U256,
    gas_price: &GasPrice,
) -> TypedTransaction {
    match gas_price {
        GasPrice::Legacy(price) => TransactionRequest::new()
            .to(contract)
            .value(U256::zero())
            .data(data)
            .nonce(nonce)
            .gas(gas_limit)
            .gas_price(*price)
            .into(),
        GasPrice::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => Eip1559TransactionRequest::new()
            .to(contract)
            .value(U256::zero())
            .data(data)
            .nonce(nonce)
            .gas(gas_limit)
            .max_fee_per_gas(*max_fee_per_gas)
            .max_priority_fee_per_gas(*max_priority_fee_per_gas)
            .into(),
    }
}

/// A submitted mint waiting to be mined
pub struct PendingMint<C> {
    client: C,
    tx_hash: H256,
    sender: Address,
    nonce: U256,
    poll_interval: Duration,
}

impl<C: ChainClient> PendingMint<C> {
    /// Hash of the submitted transaction
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    /// Wait for the receipt until `deadline` or until `cancel` completes
    pub async fn wait<F>(self, deadline: Instant, cancel: F) -> MintResult<MintOutcome>
    where
        F: Future<Output = ()>,
    {
        let waiter = ReceiptWaiter::new(&self.client, self.poll_interval);
        let tx_receipt = waiter.wait(self.tx_hash, deadline, cancel).await?;

        let block_number = tx_receipt.block_number.map(|b| b.as_u64()).unwrap_or_default();
        if !receipt::succeeded(&tx_receipt) {
            return Err(MintError::Reverted {
                tx_hash: self.tx_hash,
                block_number,
            });
        }

        Ok(MintOutcome {
            tx_hash: self.tx_hash,
            sender: self.sender,
            nonce: self.nonce,
            block_number,
            gas_used: tx_receipt.gas_used,
        })
    }
}
