//! End-to-end issuance: resolve, construct, fund, spend, aggregate.

use std::path::PathBuf;

use chia::bls::Signature;
use chia::protocol::{Bytes32, Coin, Program, SpendBundle};
use issuance_wallet::{AddressUtils, SignedTransactionSource};

use crate::aggregate::{final_bundle, parse_signature, parse_spend_bundle};
use crate::error::IssuanceError;
use crate::funding::{select_funding_coin, FundingCoordinator};
use crate::genesis::{unsigned_spend_bundle, SpendableAsset};
use crate::program::{assemble, curry, resolve_program, ProgramSource};
use crate::puzzle::IssuancePuzzles;

/// Everything one issuance run needs, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    /// TAIL locator: inline source, hex bytes or a file path
    pub tail: String,
    /// CLVM expressions curried into the TAIL, in order
    pub curry_args: Vec<String>,
    pub solution: String,
    /// bech32m address or hex puzzle hash
    pub destination: String,
    pub amount: u64,
    pub fee: u64,
    /// Hex signatures folded into the final bundle
    pub signatures: Vec<String>,
    /// Hex spend bundles folded into the final bundle
    pub spends: Vec<String>,
    pub include: Vec<PathBuf>,
    /// Stop after funding and report the coin the eve coin came from
    pub select_coin: bool,
}

impl IssuanceRequest {
    pub fn new(tail: impl Into<String>, destination: impl Into<String>, amount: u64) -> Self {
        Self {
            tail: tail.into(),
            curry_args: Vec::new(),
            solution: "()".to_string(),
            destination: destination.into(),
            amount,
            fee: 0,
            signatures: Vec::new(),
            spends: Vec::new(),
            include: Vec::new(),
            select_coin: false,
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceOutcome {
    Issued { asset_id: Bytes32, bundle: SpendBundle },
    SelectedCoin(Coin),
}

/// A request with every input parsed, ready to be funded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedIssuance {
    pub puzzles: IssuancePuzzles,
    pub signatures: Vec<Signature>,
    pub spends: Vec<SpendBundle>,
    pub fee: u64,
    pub select_coin: bool,
}

/// Parse and validate `request` without touching the wallet.
pub fn prepare(request: &IssuanceRequest) -> Result<PreparedIssuance, IssuanceError> {
    let destination = AddressUtils::parse_destination(&request.destination)?;

    let tail = resolve_program(&request.tail, &request.include)?;
    let args = request
        .curry_args
        .iter()
        .map(|arg| assemble(arg))
        .collect::<Result<Vec<Program>, _>>()?;
    let curried_tail = curry(&tail, &args)?;
    let tail_solution = match ProgramSource::classify(&request.solution)? {
        ProgramSource::Inline(expr) => assemble(&expr)?,
        source => source.resolve(&request.include)?,
    };

    let signatures = request
        .signatures
        .iter()
        .map(|sig| parse_signature(sig))
        .collect::<Result<Vec<_>, _>>()?;
    let spends = request
        .spends
        .iter()
        .map(|bundle| parse_spend_bundle(bundle))
        .collect::<Result<Vec<_>, _>>()?;

    let puzzles = IssuancePuzzles::build(curried_tail, tail_solution, destination, request.amount)?;
    Ok(PreparedIssuance {
        puzzles,
        signatures,
        spends,
        fee: request.fee,
        select_coin: request.select_coin,
    })
}

/// Run one issuance against `wallet`.
///
/// Every input is parsed before the wallet is contacted, so a bad TAIL or
/// address never reaches the network.
pub async fn run<W: SignedTransactionSource>(
    request: &IssuanceRequest,
    wallet: &W,
) -> Result<IssuanceOutcome, IssuanceError> {
    let prepared = prepare(request)?;
    run_prepared(prepared, wallet).await
}

/// Fund and spend an issuance that [`prepare`] already validated.
pub async fn run_prepared<W: SignedTransactionSource>(
    prepared: PreparedIssuance,
    wallet: &W,
) -> Result<IssuanceOutcome, IssuanceError> {
    let PreparedIssuance {
        puzzles,
        signatures,
        spends,
        fee,
        select_coin,
    } = prepared;
    tracing::info!(asset_id = %hex::encode(puzzles.asset_id), "issuance puzzles ready");

    let funded = FundingCoordinator::new(wallet)
        .fund(puzzles.wrapped_puzzle_hash, puzzles.amount, fee)
        .await?;

    if select_coin {
        let coin = select_funding_coin(&funded.funding_bundle, &funded.eve_coin)?;
        tracing::info!(coin = %hex::encode(coin.coin_id()), "selected funding coin");
        return Ok(IssuanceOutcome::SelectedCoin(coin));
    }

    let eve = SpendableAsset::eve(
        funded.eve_coin,
        puzzles.asset_id,
        puzzles.inner_puzzle.clone(),
        puzzles.tail.clone(),
        puzzles.tail_solution.clone(),
    );
    let genesis = unsigned_spend_bundle(&[eve])?;

    let bundle = final_bundle(&funded.funding_bundle, &genesis, &spends, &signatures);
    tracing::info!(spends = bundle.coin_spends.len(), "issuance bundle assembled");

    Ok(IssuanceOutcome::Issued {
        asset_id: puzzles.asset_id,
        bundle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_signatures;
    use crate::funding::tests::MockWallet;
    use crate::program::tree_hash;
    use chia::bls::{sign, SecretKey};
    use chia::traits::Streamable;

    fn destination() -> String {
        hex::encode([0x42u8; 32])
    }

    #[tokio::test]
    async fn test_issue_with_quoted_tail() {
        let wallet = MockWallet::new();
        let request = IssuanceRequest::new("(q . 1)", destination(), 1000);

        let outcome = run(&request, &wallet).await.unwrap();
        let IssuanceOutcome::Issued { asset_id, bundle } = outcome else {
            panic!("expected an issued bundle");
        };

        assert_eq!(asset_id, tree_hash(&assemble("(q . 1)").unwrap()).unwrap());
        assert_eq!(bundle.coin_spends.len(), 2);
        assert_eq!(bundle.coin_spends[1].coin.amount, 1000);
        assert_eq!(
            bundle.coin_spends[1].coin.parent_coin_info,
            bundle.coin_spends[0].coin.coin_id()
        );
    }

    #[tokio::test]
    async fn test_no_eve_coin_stops_before_genesis() {
        let wallet = MockWallet::with_copies(0);
        let request = IssuanceRequest::new("(q . 1)", destination(), 1000);

        assert!(matches!(
            run(&request, &wallet).await,
            Err(IssuanceError::InvariantViolation { found: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_select_coin_returns_funding_parent() {
        let wallet = MockWallet::new();
        let mut request = IssuanceRequest::new("(q . 1)", destination(), 1000);
        request.select_coin = true;

        let outcome = run(&request, &wallet).await.unwrap();
        let IssuanceOutcome::SelectedCoin(coin) = outcome else {
            panic!("expected a selected coin");
        };
        assert_eq!(coin.parent_coin_info, Bytes32::new([0xaa; 32]));
        assert_eq!(coin.amount, 1000);
    }

    #[tokio::test]
    async fn test_bad_destination_never_calls_wallet() {
        let wallet = MockWallet::new();
        let request = IssuanceRequest::new("(q . 1)", "xch1notanaddress", 1000);

        assert!(matches!(
            run(&request, &wallet).await,
            Err(IssuanceError::AddressDecode(_))
        ));
        assert!(wallet.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_curry_args_change_asset_id() {
        let wallet = MockWallet::new();
        let mut request = IssuanceRequest::new("(q . 1)", destination(), 1000);
        request.curry_args = vec!["0xcafe".to_string()];

        let IssuanceOutcome::Issued { asset_id, .. } = run(&request, &wallet).await.unwrap() else {
            panic!("expected an issued bundle");
        };
        let expected = curry(
            &assemble("(q . 1)").unwrap(),
            &[assemble("0xcafe").unwrap()],
        )
        .unwrap();
        assert_eq!(asset_id, tree_hash(&expected).unwrap());
    }

    #[tokio::test]
    async fn test_extra_signatures_and_spends_are_folded_in() {
        let wallet = MockWallet::new();
        let sig = sign(&SecretKey::from_seed(&[3u8; 32]), b"extra");
        let extra = SpendBundle::new(Vec::new(), sign(&SecretKey::from_seed(&[4u8; 32]), b"bundle"));

        let mut request = IssuanceRequest::new("(q . 1)", destination(), 1000);
        request.signatures = vec![hex::encode(sig.to_bytes())];
        request.spends = vec![hex::encode(extra.to_bytes().unwrap())];

        let IssuanceOutcome::Issued { bundle, .. } = run(&request, &wallet).await.unwrap() else {
            panic!("expected an issued bundle");
        };
        assert_eq!(
            bundle.aggregated_signature,
            aggregate_signatures([&sig, &extra.aggregated_signature])
        );
    }

    #[tokio::test]
    async fn test_malformed_solution_is_an_assembly_error() {
        let wallet = MockWallet::new();
        let mut request = IssuanceRequest::new("(q . 1)", destination(), 1000);
        request.solution = "(1 2".to_string();

        assert!(matches!(
            run(&request, &wallet).await,
            Err(IssuanceError::Assembly { .. })
        ));
        assert!(wallet.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prepare_rejects_bad_tail_without_wallet() {
        let request = IssuanceRequest::new("(q . 1", destination(), 1000);
        assert!(matches!(
            prepare(&request),
            Err(IssuanceError::Resolution { .. })
        ));

        let request = IssuanceRequest::new("(q . 1)", destination(), 0);
        assert!(matches!(
            prepare(&request),
            Err(IssuanceError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_run_prepared_uses_request_fee() {
        let wallet = MockWallet::new();
        let mut request = IssuanceRequest::new("(q . 1)", destination(), 1000);
        request.fee = 25;

        let prepared = prepare(&request).unwrap();
        let wrapped = prepared.puzzles.wrapped_puzzle_hash;
        run_prepared(prepared, &wallet).await.unwrap();

        let requests = wallet.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0[0].puzzle_hash, wrapped);
        assert_eq!(requests[0].1, 25);
    }

    #[tokio::test]
    async fn test_asset_id_stable_across_fee_destination_and_amount() {
        let wallet = MockWallet::new();
        let first = IssuanceRequest::new("(q . 1)", destination(), 1000);
        let mut second = IssuanceRequest::new("(q . 1)", hex::encode([0x17u8; 32]), 64);
        second.fee = 9;

        let IssuanceOutcome::Issued { asset_id: a, bundle: first_bundle } =
            run(&first, &wallet).await.unwrap()
        else {
            panic!("expected an issued bundle");
        };
        let IssuanceOutcome::Issued { asset_id: b, bundle: second_bundle } =
            run(&second, &wallet).await.unwrap()
        else {
            panic!("expected an issued bundle");
        };

        assert_eq!(a, b);
        assert_ne!(
            first_bundle.coin_spends[1].coin.puzzle_hash,
            second_bundle.coin_spends[1].coin.puzzle_hash
        );
        assert_eq!(second_bundle.coin_spends[1].coin.amount, 64);

        let requests = wallet.requests.lock().unwrap();
        assert_eq!(requests[0].1, 0);
        assert_eq!(requests[1].1, 9);
        assert_eq!(requests[1].0[0].amount, 64);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let wallet = MockWallet::new();
        let mut request = IssuanceRequest::new("(q . 1)", destination(), 1000);
        request.signatures = vec!["zz".to_string()];

        assert!(matches!(
            run(&request, &wallet).await,
            Err(IssuanceError::Signature { .. })
        ));
    }
}
