//! Destination address decoding.

use bech32::primitives::decode::CheckedHrpstring;
use bech32::Bech32m;
use chia::protocol::Bytes32;

use crate::error::{WalletError, WalletResult};

/// Address utilities for Chia addresses.
pub struct AddressUtils;

impl AddressUtils {
    /// Parse destination (address or puzzle hash) to puzzle hash bytes.
    ///
    /// Addresses must carry a bech32m checksum; plain bech32 is rejected.
    pub fn parse_destination(dest: &str) -> WalletResult<Bytes32> {
        let dest = dest.trim();

        if dest.starts_with("xch1") || dest.starts_with("txch1") {
            let checked = CheckedHrpstring::new::<Bech32m>(dest)
                .map_err(|e| WalletError::InvalidAddress(format!("{dest}: {e}")))?;
            let data: Vec<u8> = checked.byte_iter().collect();

            Self::to_puzzle_hash(dest, &data)
        } else {
            let hex_str = dest.strip_prefix("0x").unwrap_or(dest);
            let bytes = hex::decode(hex_str).map_err(|e| {
                WalletError::InvalidAddress(format!("{dest}: invalid puzzle hash hex: {e}"))
            })?;

            Self::to_puzzle_hash(dest, &bytes)
        }
    }

    fn to_puzzle_hash(dest: &str, bytes: &[u8]) -> WalletResult<Bytes32> {
        let puzzle_hash: [u8; 32] = bytes.try_into().map_err(|_| {
            WalletError::InvalidAddress(format!(
                "{dest}: expected 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Bytes32::new(puzzle_hash))
    }
}
