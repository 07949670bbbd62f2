//! Waiting for a submitted transaction to be mined
//!
//! The waiter polls `eth_getTransactionReceipt` until the node reports a
//! receipt with a block number. It stops early when the deadline passes or
//! the caller's cancellation future resolves. It never re-submits anything.

use crate::chain::ChainClient;
use crate::error::{MintError, MintResult};

use ethers::types::{TransactionReceipt, H256};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Polls for a transaction receipt on one chain
pub struct ReceiptWaiter<'a, C: ?Sized> {
    /// Chain client
    client: &'a C,
    /// Delay between receipt lookups
    poll_interval: Duration,
}

impl<'a, C: ChainClient + ?Sized> ReceiptWaiter<'a, C> {
    /// Create a new receipt waiter
    pub fn new(client: &'a C, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Wait until `tx_hash` is mined.
    ///
    /// Returns `Timeout` once `deadline` has passed (immediately if it already
    /// has) and `Cancelled` when `cancel` completes first.
    pub async fn wait<F>(
        &self,
        tx_hash: H256,
        deadline: Instant,
        cancel: F,
    ) -> MintResult<TransactionReceipt>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        if Instant::now() >= deadline {
            return Err(MintError::Timeout { tx_hash });
        }

        let mut attempts = 0u64;
        loop {
            attempts += 1;

            tokio::select! {
                biased;
                _ = &mut cancel => return Err(MintError::Cancelled { tx_hash }),
                _ = sleep_until(deadline) => return Err(MintError::Timeout { tx_hash }),
                receipt = self.client.transaction_receipt(tx_hash) => {
                    if let Some(receipt) = receipt? {
                        if let Some(block) = receipt.block_number {
                            info!(
                                "Transaction {:?} included in block {} after {} polls",
                                tx_hash, block, attempts
                            );
                            return Ok(receipt);
                        }
                    }
                }
            }

            debug!("Transaction {:?} not mined yet (poll {})", tx_hash, attempts);

            let next = Instant::now() + self.poll_interval;
            tokio::select! {
                biased;
                _ = &mut cancel => return Err(MintError::Cancelled { tx_hash }),
                _ = sleep_until(deadline) => return Err(MintError::Timeout { tx_hash }),
                _ = sleep_until(next) => {}
            }
        }
    }
}

/// Whether a mined receipt reports successful execution
pub fn succeeded(receipt: &TransactionReceipt) -> bool {
    // Pre-Byzantium receipts carry no status; treat them as success
    !matches!(receipt.status, Some(status) if status.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use ethers::types::U64;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn mined(tx_hash: H256, block: u64) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(U64::from(block)),
            status: Some(U64::from(1)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_returns_receipt_once_mined() {
        let tx_hash = H256::repeat_byte(0x11);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut client = MockChainClient::new();
        client
            .expect_transaction_receipt()
            .returning(move |hash| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(None)
                } else {
                    Ok(Some(mined(hash, 42)))
                }
            });

        let waiter = ReceiptWaiter::new(&client, Duration::from_millis(5));
        let deadline = Instant::now() + Duration::from_secs(5);
        let receipt = waiter
            .wait(tx_hash, deadline, std::future::pending())
            .await
            .unwrap();

        assert_eq!(receipt.block_number, Some(U64::from(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_pending_receipt_without_block_keeps_polling() {
        let tx_hash = H256::repeat_byte(0x12);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut client = MockChainClient::new();
        client.expect_transaction_receipt().returning(move |hash| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Some(TransactionReceipt {
                    transaction_hash: hash,
                    ..Default::default()
                }))
            } else {
                Ok(Some(mined(hash, 7)))
            }
        });

        let waiter = ReceiptWaiter::new(&client, Duration::from_millis(1));
        let receipt = waiter
            .wait(
                tx_hash,
                Instant::now() + Duration::from_secs(5),
                std::future::pending(),
            )
            .await
            .unwrap();
        assert_eq!(receipt.block_number, Some(U64::from(7)));
    }

    #[tokio::test]
    async fn test_expired_deadline_times_out_without_polling() {
        let tx_hash = H256::repeat_byte(0x22);
        let mut client = MockChainClient::new();
        client.expect_transaction_receipt().times(0);

        let waiter = ReceiptWaiter::new(&client, Duration::from_millis(5));
        let result = waiter
            .wait(tx_hash, Instant::now(), std::future::pending())
            .await;

        match result {
            Err(MintError::Timeout { tx_hash: hash }) => assert_eq!(hash, tx_hash),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deadline_while_polling() {
        let mut client = MockChainClient::new();
        client.expect_transaction_receipt().returning(|_| Ok(None));

        let waiter = ReceiptWaiter::new(&client, Duration::from_millis(5));
        let result = waiter
            .wait(
                H256::zero(),
                Instant::now() + Duration::from_millis(30),
                std::future::pending(),
            )
            .await;
        assert!(matches!(result, Err(MintError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let mut client = MockChainClient::new();
        client.expect_transaction_receipt().returning(|_| Ok(None));

        let waiter = ReceiptWaiter::new(&client, Duration::from_millis(5));
        let result = waiter
            .wait(
                H256::zero(),
                Instant::now() + Duration::from_secs(60),
                std::future::ready(()),
            )
            .await;
        assert!(matches!(result, Err(MintError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_rpc_error_is_fatal() {
        let mut client = MockChainClient::new();
        client
            .expect_transaction_receipt()
            .times(1)
            .returning(|_| Err(MintError::rpc("eth_getTransactionReceipt", "connection reset")));

        let waiter = ReceiptWaiter::new(&client, Duration::from_millis(5));
        let result = waiter
            .wait(
                H256::zero(),
                Instant::now() + Duration::from_secs(60),
                std::future::pending(),
            )
            .await;
        assert!(matches!(result, Err(MintError::Rpc { .. })));
    }

    #[test]
    fn test_succeeded() {
        let mut receipt = mined(H256::zero(), 1);
        assert!(succeeded(&receipt));
        receipt.status = Some(U64::zero());
        assert!(!succeeded(&receipt));
        receipt.status = None;
        assert!(succeeded(&receipt));
        // any nonzero status counts as success
        receipt.status = Some(U64::from(2));
        assert!(succeeded(&receipt));
    }
}
