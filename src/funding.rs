//! Funding the eve coin through the wallet

use chia::protocol::{Bytes32, Coin, SpendBundle};
use issuance_wallet::{Addition, SignedTransactionSource};

use crate::conditions::{additions, removals};
use crate::error::IssuanceError;

/// The wallet's signed transaction and the eve coin it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundedIssuance {
    pub funding_bundle: SpendBundle,
    pub eve_coin: Coin,
}

/// Asks the wallet to create the eve coin and locates it.
pub struct FundingCoordinator<'a, W> {
    wallet: &'a W,
}

impl<'a, W: SignedTransactionSource> FundingCoordinator<'a, W> {
    pub fn new(wallet: &'a W) -> Self {
        Self { wallet }
    }

    /// Pay `amount` to `wrapped_puzzle_hash` and return the resulting eve coin.
    pub async fn fund(
        &self,
        wrapped_puzzle_hash: Bytes32,
        amount: u64,
        fee: u64,
    ) -> Result<FundedIssuance, IssuanceError> {
        tracing::debug!(
            puzzle_hash = %hex::encode(wrapped_puzzle_hash),
            amount,
            fee,
            "requesting signed transaction"
        );
        let funding_bundle = self
            .wallet
            .create_signed_transaction(&[Addition::new(wrapped_puzzle_hash, amount)], fee)
            .await?;

        let eve_coin = find_eve_coin(&funding_bundle, wrapped_puzzle_hash)?;
        tracing::info!(eve_coin = %hex::encode(eve_coin.coin_id()), "funding transaction signed");

        Ok(FundedIssuance {
            funding_bundle,
            eve_coin,
        })
    }
}

/// The single coin the bundle creates at `wrapped_puzzle_hash`.
pub fn find_eve_coin(bundle: &SpendBundle, wrapped_puzzle_hash: Bytes32) -> Result<Coin, IssuanceError> {
    let matches: Vec<Coin> = additions(bundle)?
        .into_iter()
        .filter(|coin| coin.puzzle_hash == wrapped_puzzle_hash)
        .collect();

    exactly_one(
        matches,
        "eve coin",
        format!("puzzle hash {}", hex::encode(wrapped_puzzle_hash)),
    )
}

/// The single coin the bundle spends to create `eve_coin`.
pub fn select_funding_coin(bundle: &SpendBundle, eve_coin: &Coin) -> Result<Coin, IssuanceError> {
    let matches: Vec<Coin> = removals(bundle)
        .into_iter()
        .filter(|coin| coin.coin_id() == eve_coin.parent_coin_info)
        .collect();

    exactly_one(
        matches,
        "funding coin",
        format!("parent coin {}", hex::encode(eve_coin.parent_coin_info)),
    )
}

fn exactly_one(matches: Vec<Coin>, what: &str, target: String) -> Result<Coin, IssuanceError> {
    match matches.as_slice() {
        [coin] => Ok(*coin),
        _ => {
            tracing::warn!(what, %target, found = matches.len(), "expected exactly one match");
            Err(IssuanceError::invariant(what, target, matches.len()))
        }
    }
}
