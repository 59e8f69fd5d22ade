//! Issuance Wallet Library
//!
//! The wallet side of CAT issuance: everything the issuance pipeline needs from
//! the local Chia wallet service, and nothing else.
//!
//! # Features
//!
//! - **Signed transactions**: `create_signed_transaction` over the wallet RPC
//!   (HTTPS with the node's client certificate)
//! - **Connection config**: explicit [`WalletRpcConfig`] values, one per run
//! - **Addresses**: bech32m `xch`/`txch` addresses and raw puzzle hashes
//! - **Wire types**: JSON shapes for coins and spend bundles
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use issuance_wallet::{Addition, SignedTransactionSource, WalletRpcClient, WalletRpcConfig};
//!
//! # async fn example(puzzle_hash: chia::protocol::Bytes32) -> Result<(), Box<dyn std::error::Error>> {
//! let client = WalletRpcClient::connect(WalletRpcConfig::default())?;
//! let bundle = client
//!     .create_signed_transaction(&[Addition::new(puzzle_hash, 1000)], 0)
//!     .await?;
//! println!("{} coin spends", bundle.coin_spends.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

mod address;
mod config;
mod error;
mod json;
mod rpc;

pub use address::AddressUtils;
pub use config::{WalletRpcConfig, DEFAULT_WALLET_RPC_HOST, DEFAULT_WALLET_RPC_PORT};
pub use error::{WalletError, WalletResult};
pub use json::{decode_hex, decode_signature, encode_hex, CoinJson, CoinSpendJson, SpendBundleJson};
pub use rpc::{Addition, SignedTransactionSource, WalletRpcClient};
