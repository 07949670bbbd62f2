//! The token contract interface and `mint` call encoding

use crate::error::{MintError, MintResult};

use ethers::abi::{Abi, Function, Token};
use ethers::types::{Address, U256};
use std::str::FromStr;

/// Interface description of the token contract. Only `mint` is called.
pub const STZETA_ABI: &str = r#"[{"inputs":[{"internalType":"address","name":"to","type":"address"},{"internalType":"uint256","name":"amount","type":"uint256"}],"name":"mint","outputs":[],"stateMutability":"nonpayable","type":"function"}]"#;

const MINT_FUNCTION: &str = "mint";

/// Parsed `mint` function from the fixed interface
pub struct MintFunction {
    function: Function,
}

impl MintFunction {
    /// Parse the built-in interface description
    pub fn load() -> MintResult<Self> {
        Self::from_json(STZETA_ABI)
    }

    /// Parse an interface description and pick out `mint(address,uint256)`
    pub fn from_json(abi_json: &str) -> MintResult<Self> {
        let abi: Abi = serde_json::from_str(abi_json)
            .map_err(|e| MintError::Encoding(format!("Invalid ABI JSON: {}", e)))?;

        let function = abi
            .function(MINT_FUNCTION)
            .map_err(|e| MintError::Encoding(e.to_string()))?
            .clone();

        if function.signature() != "mint(address,uint256)" {
            return Err(MintError::Encoding(format!(
                "Unexpected mint signature: {}",
                function.signature()
            )));
        }

        Ok(Self { function })
    }

    /// Four-byte function selector
    pub fn selector(&self) -> [u8; 4] {
        self.function.short_signature()
    }

    /// Encode calldata: selector followed by the ABI-encoded arguments
    pub fn encode(&self, call: &MintCall) -> MintResult<Vec<u8>> {
        self.function
            .encode_input(&[Token::Address(call.to), Token::Uint(call.amount)])
            .map_err(|e| MintError::Encoding(e.to_string()))
    }

    /// Decode calldata produced by `encode`
    pub fn decode(&self, calldata: &[u8]) -> MintResult<MintCall> {
        if calldata.len() < 4 || calldata[..4] != self.selector() {
            return Err(MintError::Encoding(
                "Calldata does not start with the mint selector".to_string(),
            ));
        }

        let tokens = self
            .function
            .decode_input(&calldata[4..])
            .map_err(|e| MintError::Encoding(e.to_string()))?;

        match tokens.as_slice() {
            [Token::Address(to), Token::Uint(amount)] => Ok(MintCall {
                to: *to,
                amount: *amount,
            }),
            _ => Err(MintError::Encoding(format!(
                "Unexpected mint arguments: {:?}",
                tokens
            ))),
        }
    }
}

/// Arguments of one `mint` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintCall {
    pub to: Address,
    pub amount: U256,
}

impl MintCall {
    /// Parse and check user-supplied arguments
    pub fn parse(recipient: &str, amount: &str) -> MintResult<Self> {
        let to = parse_address(recipient)
            .map_err(|e| MintError::Encoding(format!("Invalid recipient address: {}", e)))?;
        if to.is_zero() {
            return Err(MintError::Encoding(
                "Recipient must not be the zero address".to_string(),
            ));
        }

        let amount = U256::from_dec_str(amount.trim())
            .map_err(|e| MintError::Encoding(format!("Invalid amount {:?}: {:?}", amount, e)))?;

        Ok(Self { to, amount })
    }
}

/// Parse a 20-byte hex address, with or without `0x`
pub fn parse_address(s: &str) -> Result<Address, String> {
    let s = s.trim();
    let hex_part = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if hex_part.len() != 40 {
        return Err(format!("{:?} is not 40 hex characters", s));
    }
    Address::from_str(hex_part).map_err(|e| format!("{:?}: {}", s, e))
}
