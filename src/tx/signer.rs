//! Private key handling and transaction signing
//!
//! The key is read from the environment only and is never logged or
//! serialized. Signing and sender recovery are done by ethers.

use crate::error::{MintError, MintResult};

use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use tracing::info;

/// A transaction signed and ready for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
    pub signature: Signature,
}

/// Holds the signing key for the duration of a run
pub struct TxSigner {
    wallet: LocalWallet,
}

impl TxSigner {
    /// Parse a hex private key, with or without `0x`
    pub fn from_hex(private_key_hex: &str) -> MintResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let bytes = hex::decode(key_hex)
            .map_err(|e| MintError::Key(format!("Private key is not valid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(MintError::Key(format!(
                "Private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }

        let wallet = LocalWallet::from_bytes(&bytes)
            .map_err(|e| MintError::Key(format!("Invalid private key: {}", e)))?;

        info!("Loaded signing key for {:?}", wallet.address());

        Ok(Self { wallet })
    }

    /// Load the key from the named environment variable
    pub fn from_env(var_name: &str) -> MintResult<Self> {
        let key = std::env::var(var_name)
            .map_err(|_| MintError::Key(format!("Environment variable {} not set", var_name)))?;
        Self::from_hex(&key)
    }

    /// Address derived from the key
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign `tx` for `chain_id` (EIP-155) and check the signature recovers to
    /// this signer's address.
    pub async fn sign(&self, tx: &mut TypedTransaction, chain_id: u64) -> MintResult<SignedTransaction> {
        tx.set_chain_id(chain_id);
        tx.set_from(self.address());

        let wallet = self.wallet.clone().with_chain_id(chain_id);
        let signature = wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| MintError::Key(format!("Failed to sign transaction: {}", e)))?;

        let recovered = recover_sender(tx, &signature)?;
        if recovered != self.address() {
            return Err(MintError::Key(format!(
                "Signature recovers to {:?}, expected {:?}",
                recovered,
                self.address()
            )));
        }

        Ok(SignedTransaction {
            raw: tx.rlp_signed(&signature),
            hash: tx.hash(&signature),
            signature,
        })
    }
}

/// Recover the address that produced `signature` over `tx`
pub fn recover_sender(tx: &TypedTransaction, signature: &Signature) -> MintResult<Address> {
    signature
        .recover(tx.sighash())
        .map_err(|e| MintError::Key(format!("Failed to recover signer: {}", e)))
}
