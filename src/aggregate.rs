//! Signature and spend bundle aggregation

use chia::bls::Signature;
use chia::protocol::SpendBundle;
use chia::traits::Streamable;
use issuance_wallet::{decode_hex, decode_signature};

use crate::error::IssuanceError;

/// Add signatures together, starting from the identity element.
pub fn aggregate_signatures<'a, I>(signatures: I) -> Signature
where
    I: IntoIterator<Item = &'a Signature>,
{
    signatures
        .into_iter()
        .fold(Signature::default(), |acc, sig| acc + sig)
}

/// Concatenate coin spends in order and add the signatures.
pub fn aggregate_bundles<'a, I>(bundles: I) -> SpendBundle
where
    I: IntoIterator<Item = &'a SpendBundle>,
{
    let mut coin_spends = Vec::new();
    let mut signature = Signature::default();
    for bundle in bundles {
        coin_spends.extend(bundle.coin_spends.iter().cloned());
        signature += &bundle.aggregated_signature;
    }
    SpendBundle::new(coin_spends, signature)
}

/// Decode a hex-encoded signature (optional `0x`).
pub fn parse_signature(input: &str) -> Result<Signature, IssuanceError> {
    decode_signature(input).map_err(|e| IssuanceError::Signature {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a hex-encoded streamable spend bundle (optional `0x`).
pub fn parse_spend_bundle(input: &str) -> Result<SpendBundle, IssuanceError> {
    let bundle_error = |reason: String| IssuanceError::SpendBundle {
        input: input.to_string(),
        reason,
    };
    let bytes = decode_hex(input).map_err(|e| bundle_error(e.to_string()))?;
    SpendBundle::from_bytes(&bytes).map_err(|e| bundle_error(e.to_string()))
}

/// Combine the funding bundle, the genesis bundle, extra bundles and extra
/// signatures into the bundle that gets pushed.
pub fn final_bundle(
    funding: &SpendBundle,
    genesis: &SpendBundle,
    extra_bundles: &[SpendBundle],
    extra_signatures: &[Signature],
) -> SpendBundle {
    let extras = aggregate_bundles(extra_bundles);
    let signatures = SpendBundle::new(Vec::new(), aggregate_signatures(extra_signatures));

    let bundle = aggregate_bundles([funding, genesis, &extras, &signatures]);
    tracing::debug!(
        spends = bundle.coin_spends.len(),
        extra_bundles = extra_bundles.len(),
        extra_signatures = extra_signatures.len(),
        "aggregated final bundle"
    );
    bundle
}
