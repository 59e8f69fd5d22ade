//! JSON wire types for coins and spend bundles.
//!
//! These mirror the wallet RPC's JSON shapes: byte fields are `0x`-prefixed hex
//! and keys are declared in sorted order so serialized output is stable.

use chia::bls::Signature;
use chia::protocol::{Bytes32, Coin, CoinSpend, Program, SpendBundle};
use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};

/// `0x`-prefixed lowercase hex.
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without a `0x` prefix.
pub fn decode_hex(s: &str) -> WalletResult<Vec<u8>> {
    let s = s.trim();
    Ok(hex::decode(s.strip_prefix("0x").unwrap_or(s))?)
}

fn decode_bytes32(field: &str, s: &str) -> WalletResult<Bytes32> {
    let bytes = decode_hex(s)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
        WalletError::UnexpectedResponse(format!("{field}: expected 32 bytes, got {}", b.len()))
    })?;
    Ok(Bytes32::new(bytes))
}

/// Decode a 96-byte BLS signature from hex.
pub fn decode_signature(s: &str) -> WalletResult<Signature> {
    let bytes = decode_hex(s)?;
    let bytes: [u8; 96] = bytes.try_into().map_err(|b: Vec<u8>| {
        WalletError::UnexpectedResponse(format!("signature: expected 96 bytes, got {}", b.len()))
    })?;
    Signature::from_bytes(&bytes)
        .map_err(|e| WalletError::UnexpectedResponse(format!("signature: {e:?}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinJson {
    pub amount: u64,
    pub parent_coin_info: String,
    pub puzzle_hash: String,
}

impl From<&Coin> for CoinJson {
    fn from(coin: &Coin) -> Self {
        Self {
            amount: coin.amount,
            parent_coin_info: encode_hex(coin.parent_coin_info),
            puzzle_hash: encode_hex(coin.puzzle_hash),
        }
    }
}

impl TryFrom<&CoinJson> for Coin {
    type Error = WalletError;

    fn try_from(json: &CoinJson) -> WalletResult<Self> {
        Ok(Coin::new(
            decode_bytes32("parent_coin_info", &json.parent_coin_info)?,
            decode_bytes32("puzzle_hash", &json.puzzle_hash)?,
            json.amount,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSpendJson {
    pub coin: CoinJson,
    pub puzzle_reveal: String,
    pub solution: String,
}

impl From<&CoinSpend> for CoinSpendJson {
    fn from(spend: &CoinSpend) -> Self {
        Self {
            coin: CoinJson::from(&spend.coin),
            puzzle_reveal: encode_hex(&spend.puzzle_reveal),
            solution: encode_hex(&spend.solution),
        }
    }
}

impl TryFrom<&CoinSpendJson> for CoinSpend {
    type Error = WalletError;

    fn try_from(json: &CoinSpendJson) -> WalletResult<Self> {
        Ok(CoinSpend::new(
            Coin::try_from(&json.coin)?,
            Program::from(decode_hex(&json.puzzle_reveal)?),
            Program::from(decode_hex(&json.solution)?),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendBundleJson {
    pub aggregated_signature: String,
    #[serde(alias = "coin_solutions")]
    pub coin_spends: Vec<CoinSpendJson>,
}

impl From<&SpendBundle> for SpendBundleJson {
    fn from(bundle: &SpendBundle) -> Self {
        Self {
            aggregated_signature: encode_hex(bundle.aggregated_signature.to_bytes()),
            coin_spends: bundle.coin_spends.iter().map(CoinSpendJson::from).collect(),
        }
    }
}

impl TryFrom<&SpendBundleJson> for SpendBundle {
    type Error = WalletError;

    fn try_from(json: &SpendBundleJson) -> WalletResult<Self> {
        let coin_spends = json
            .coin_spends
            .iter()
            .map(CoinSpend::try_from)
            .collect::<WalletResult<Vec<_>>>()?;
        Ok(SpendBundle::new(
            coin_spends,
            decode_signature(&json.aggregated_signature)?,
        ))
    }
}
