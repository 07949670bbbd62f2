//! stZETA mint submitter
//!
//! Connects to an Ethereum-compatible JSON-RPC node, signs a single
//! `mint(address,uint256)` call with a local key, submits it and waits for
//! the receipt.

pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod tx;

pub use chain::{ChainClient, ChainProvider};
pub use config::Settings;
pub use error::{MintError, MintResult};
pub use tx::{MintOutcome, MintRequest, MintSubmitter, PendingMint, TxSigner};
