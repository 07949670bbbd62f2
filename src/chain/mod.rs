//! Chain module - node access and confirmation tracking
//!
//! This module provides:
//! - The `ChainClient` trait over the handful of JSON-RPC calls a mint needs
//! - An ethers HTTP implementation with per-request timeouts
//! - Receipt polling bounded by a deadline and a cancellation signal

pub mod provider;
pub mod receipt;

pub use provider::{ChainClient, ChainProvider, GasPrice};
pub use receipt::ReceiptWaiter;

#[cfg(test)]
pub use provider::MockChainClient;
