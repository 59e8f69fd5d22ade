//! Wallet RPC connection parameters.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wallet RPC port of a Chia node.
pub const DEFAULT_WALLET_RPC_PORT: u16 = 9256;

/// Default RPC host.
pub const DEFAULT_WALLET_RPC_HOST: &str = "localhost";

const WALLET_CERT: &str = "config/ssl/wallet/private_wallet.crt";
const WALLET_KEY: &str = "config/ssl/wallet/private_wallet.key";

/// Connection parameters for one issuance run.
///
/// Built once by the caller and handed to [`crate::WalletRpcClient::connect`];
/// nothing here is read from ambient process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRpcConfig {
    /// RPC host name
    pub host: String,
    /// RPC port
    pub port: u16,
    /// Client certificate presented to the wallet (PEM)
    pub cert_path: PathBuf,
    /// Client private key (PEM)
    pub key_path: PathBuf,
    /// Wallet to fund the issuance from
    pub wallet_id: u32,
    /// Overall request timeout; `None` leaves it to the transport
    pub timeout: Option<Duration>,
}

impl WalletRpcConfig {
    /// Configuration for a node rooted at `chia_root`, using its wallet certificate.
    pub fn for_root(chia_root: impl AsRef<Path>) -> Self {
        let chia_root = chia_root.as_ref();
        Self {
            host: DEFAULT_WALLET_RPC_HOST.to_string(),
            port: DEFAULT_WALLET_RPC_PORT,
            cert_path: chia_root.join(WALLET_CERT),
            key_path: chia_root.join(WALLET_KEY),
            wallet_id: 1,
            timeout: None,
        }
    }

    /// `~/.chia/mainnet`, or `.chia/mainnet` relative to the working directory
    /// when no home directory is known.
    pub fn default_chia_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chia")
            .join("mainnet")
    }

    /// Set the RPC host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the RPC port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the funding wallet id
    pub fn wallet_id(mut self, wallet_id: u32) -> Self {
        self.wallet_id = wallet_id;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL of the wallet RPC service.
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

impl Default for WalletRpcConfig {
    fn default() -> Self {
        Self::for_root(Self::default_chia_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_root() {
        let config = WalletRpcConfig::for_root("/srv/chia");
        assert_eq!(
            config.cert_path,
            PathBuf::from("/srv/chia/config/ssl/wallet/private_wallet.crt")
        );
        assert_eq!(
            config.key_path,
            PathBuf::from("/srv/chia/config/ssl/wallet/private_wallet.key")
        );
        assert_eq!(config.base_url(), "https://localhost:9256");
    }

    #[test]
    fn test_builder_overrides() {
        let config = WalletRpcConfig::for_root("/srv/chia")
            .host("10.0.0.2")
            .port(19256)
            .wallet_id(3)
            .timeout(Some(Duration::from_secs(30)));

        assert_eq!(config.base_url(), "https://10.0.0.2:19256");
        assert_eq!(config.wallet_id, 3);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }
}
