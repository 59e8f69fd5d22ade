//! Error types for wallet RPC operations.

use thiserror::Error;

/// Result type for wallet operations.
pub type WalletResult<T> = std::result::Result<T, WalletError>;

/// Errors that can occur while talking to the wallet service.
#[derive(Error, Debug)]
pub enum WalletError {
    /// The wallet RPC endpoint refused the connection or timed out
    #[error("Wallet RPC unavailable at {endpoint}: {reason}")]
    Unavailable { endpoint: String, reason: String },

    /// The wallet answered but reported a failure
    #[error("Wallet RPC call `{method}` failed: {message}")]
    Rpc { method: String, message: String },

    /// The wallet answered with a payload we could not interpret
    #[error("Unexpected wallet response: {0}")]
    UnexpectedResponse(String),

    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// TLS client identity could not be loaded
    #[error("Invalid TLS identity: {0}")]
    Identity(String),

    /// HTTP transport error after the connection was established
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hex decode error
    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
