//! Text rendering of issuance results

use chia::protocol::{Bytes32, Coin, SpendBundle};
use chia::traits::Streamable;
use issuance_wallet::{CoinJson, SpendBundleJson};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::IssuanceError;

/// How the final spend bundle is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Sorted-key JSON, four-space indent
    #[default]
    Json,
    /// Hex of the streamable encoding
    Bytes,
}

impl OutputFormat {
    pub fn from_flag(as_bytes: bool) -> Self {
        if as_bytes {
            OutputFormat::Bytes
        } else {
            OutputFormat::Json
        }
    }
}

/// Serialize `value` as JSON with sorted keys and four-space indentation.
pub fn sorted_json<T: Serialize>(value: &T) -> Result<String, IssuanceError> {
    // serde_json::Value keeps object keys in a BTreeMap
    let value =
        serde_json::to_value(value).map_err(|e| IssuanceError::Serialize(e.to_string()))?;

    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(|e| IssuanceError::Serialize(e.to_string()))?;
    String::from_utf8(out).map_err(|e| IssuanceError::Serialize(e.to_string()))
}

pub fn render_asset_id(asset_id: Bytes32) -> String {
    hex::encode(asset_id)
}

pub fn render_bundle(bundle: &SpendBundle, format: OutputFormat) -> Result<String, IssuanceError> {
    match format {
        OutputFormat::Json => sorted_json(&SpendBundleJson::from(bundle)),
        OutputFormat::Bytes => bundle
            .to_bytes()
            .map(hex::encode)
            .map_err(|e| IssuanceError::Serialize(e.to_string())),
    }
}

/// The coin as JSON followed by a `Name:` line carrying its id.
pub fn render_coin(coin: &Coin) -> Result<String, IssuanceError> {
    Ok(format!(
        "{}\nName: {}",
        sorted_json(&CoinJson::from(coin))?,
        hex::encode(coin.coin_id())
    ))
}
