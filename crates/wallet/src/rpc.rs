//! Wallet RPC client.
//!
//! The wallet service selects funding coins and signs the standard transaction;
//! the issuance pipeline only ever needs `create_signed_transaction`, exposed
//! through [`SignedTransactionSource`] so tests can substitute an in-memory wallet.

use chia::protocol::{Bytes32, SpendBundle};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WalletRpcConfig;
use crate::error::{WalletError, WalletResult};
use crate::json::{encode_hex, SpendBundleJson};

/// One output requested from the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addition {
    pub puzzle_hash: Bytes32,
    pub amount: u64,
}

impl Addition {
    pub fn new(puzzle_hash: Bytes32, amount: u64) -> Self {
        Self {
            puzzle_hash,
            amount,
        }
    }
}

/// Anything that can fund outputs with a signed standard transaction.
#[allow(async_fn_in_trait)]
pub trait SignedTransactionSource {
    /// Ask for a signed transaction creating `additions` and paying `fee`.
    async fn create_signed_transaction(
        &self,
        additions: &[Addition],
        fee: u64,
    ) -> WalletResult<SpendBundle>;
}

#[derive(Serialize)]
struct AdditionJson {
    amount: u64,
    puzzle_hash: String,
}

#[derive(Serialize)]
struct CreateSignedTransactionRequest {
    additions: Vec<AdditionJson>,
    fee: u64,
    wallet_id: u32,
}

#[derive(Deserialize)]
struct TransactionRecordJson {
    spend_bundle: Option<SpendBundleJson>,
}

#[derive(Deserialize)]
struct CreateSignedTransactionResponse {
    signed_tx: TransactionRecordJson,
}

/// An open channel to the local wallet RPC service.
///
/// The underlying connection pool lives exactly as long as this value, so
/// dropping the client at the end of a run releases it on every exit path.
pub struct WalletRpcClient {
    http: reqwest::Client,
    config: WalletRpcConfig,
}

impl WalletRpcClient {
    /// Open a client using the wallet's TLS identity.
    pub fn connect(config: WalletRpcConfig) -> WalletResult<Self> {
        let mut pem = std::fs::read(&config.cert_path).map_err(|e| {
            WalletError::Identity(format!("{}: {e}", config.cert_path.display()))
        })?;
        pem.push(b'\n');
        pem.extend(std::fs::read(&config.key_path).map_err(|e| {
            WalletError::Identity(format!("{}: {e}", config.key_path.display()))
        })?);

        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| WalletError::Identity(e.to_string()))?;

        // The node's RPC certificates are signed by its own private CA.
        let mut builder = reqwest::Client::builder()
            .identity(identity)
            .danger_accept_invalid_certs(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        tracing::debug!(endpoint = %config.base_url(), "opened wallet RPC client");
        Ok(Self { http, config })
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> WalletResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let endpoint = format!("{}/{}", self.config.base_url(), method);
        tracing::debug!(%endpoint, "wallet RPC request");

        let response = self
            .http
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    WalletError::Unavailable {
                        endpoint: self.config.base_url(),
                        reason: e.to_string(),
                    }
                } else {
                    WalletError::Http(e)
                }
            })?;

        let body: Value = response.json().await?;
        parse_rpc_response(method, body)
    }
}

/// Check the RPC `success` flag and decode the payload.
fn parse_rpc_response<Resp: DeserializeOwned>(method: &str, body: Value) -> WalletResult<Resp> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("wallet reported failure without a message")
            .to_string();
        return Err(WalletError::Rpc {
            method: method.to_string(),
            message,
        });
    }
    Ok(serde_json::from_value(body)?)
}

fn signed_bundle(response: CreateSignedTransactionResponse) -> WalletResult<SpendBundle> {
    let bundle = response.signed_tx.spend_bundle.ok_or_else(|| {
        WalletError::UnexpectedResponse("signed_tx carries no spend_bundle".to_string())
    })?;
    SpendBundle::try_from(&bundle)
}

impl SignedTransactionSource for WalletRpcClient {
    async fn create_signed_transaction(
        &self,
        additions: &[Addition],
        fee: u64,
    ) -> WalletResult<SpendBundle> {
        let request = CreateSignedTransactionRequest {
            additions: additions
                .iter()
                .map(|a| AdditionJson {
                    amount: a.amount,
                    puzzle_hash: encode_hex(a.puzzle_hash),
                })
                .collect(),
            fee,
            wallet_id: self.config.wallet_id,
        };

        let response: CreateSignedTransactionResponse =
            self.call("create_signed_transaction", &request).await?;
        signed_bundle(response)
    }
}

impl Drop for WalletRpcClient {
    fn drop(&mut self) {
        tracing::debug!(endpoint = %self.config.base_url(), "closed wallet RPC client");
    }
}
