//! Mint transaction construction, signing and submission

pub mod abi;
mod gas;
mod sender;
pub mod signer;

pub use abi::{MintCall, MintFunction, STZETA_ABI};
pub use gas::GasEstimator;
pub use sender::{build_mint_tx, MintOutcome, MintRequest, MintSubmitter, PendingMint};
pub use signer::{SignedTransaction, TxSigner};
