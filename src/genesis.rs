//! Genesis spend construction
//!
//! Spends CAT coins whose lineage is established by running the TAIL rather
//! than by a parent proof. The issuance pipeline spends exactly one eve coin,
//! but any number of coins can be linked into the ring.

use chia::bls::Signature;
use chia::protocol::{Bytes32, Coin, CoinSpend, Program, SpendBundle};
use chia::puzzles::cat::CatSolution;
use chia::puzzles::CoinProof;
use chia_wallet_sdk::driver::SpendContext;

use crate::conditions::{run_puzzle, Condition};
use crate::error::IssuanceError;
use crate::program::tree_hash;
use crate::puzzle::build_cat_puzzle;

/// A CAT coin together with everything needed to spend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendableAsset {
    pub coin: Coin,
    pub asset_id: Bytes32,
    pub inner_puzzle: Program,
    pub inner_solution: Program,
    /// TAIL revealed by the inner puzzle, when this spend runs it
    pub limitations_program_reveal: Option<Program>,
    pub limitations_solution: Option<Program>,
    /// Amount minted (positive) or melted (negative) by the TAIL
    pub extra_delta: i64,
}

impl SpendableAsset {
    /// The eve coin of a fresh issuance, spent with an empty inner solution.
    pub fn eve(
        coin: Coin,
        asset_id: Bytes32,
        inner_puzzle: Program,
        tail: Program,
        tail_solution: Program,
    ) -> Self {
        Self {
            coin,
            asset_id,
            inner_puzzle,
            inner_solution: Program::from(vec![0x80]),
            limitations_program_reveal: Some(tail),
            limitations_solution: Some(tail_solution),
            extra_delta: 0,
        }
    }

    /// Net amount this spend moves into the ring.
    fn delta(&self, conditions: &[Condition]) -> Result<i64, IssuanceError> {
        let created = conditions
            .iter()
            .map(|condition| match condition {
                Condition::CreateCoin { amount, .. } => *amount,
                _ => 0,
            })
            .try_fold(0u64, u64::checked_add)
            .ok_or_else(|| overflow("created amounts"))?;

        let amount = i64::try_from(self.coin.amount)
            .map_err(|_| IssuanceError::InvalidAmount(self.coin.amount.to_string()))?;
        let created = i64::try_from(created)
            .map_err(|_| IssuanceError::InvalidAmount(created.to_string()))?;
        amount
            .checked_sub(created)
            .and_then(|delta| delta.checked_add(self.extra_delta))
            .ok_or_else(|| overflow("coin delta"))
    }

    fn check_limitations(&self, conditions: &[Condition]) -> Result<(), IssuanceError> {
        let Some(reveal) = &self.limitations_program_reveal else {
            return Ok(());
        };
        if tree_hash(reveal)? != self.asset_id {
            return Err(IssuanceError::Eval(format!(
                "TAIL reveal does not hash to asset id {}",
                hex::encode(self.asset_id)
            )));
        }

        let runs_tail = conditions.iter().any(|condition| {
            matches!(condition, Condition::RunTail { program, solution }
                if program == reveal
                    && self.limitations_solution.as_ref().map_or(true, |s| s == solution))
        });
        if !runs_tail {
            return Err(IssuanceError::Eval(format!(
                "inner puzzle of coin {} does not run the TAIL",
                hex::encode(self.coin.coin_id())
            )));
        }
        Ok(())
    }
}

fn overflow(what: &str) -> IssuanceError {
    IssuanceError::InvalidAmount(format!("{what} overflow a signed 64-bit amount"))
}

/// Prev subtotals for each coin in ring order, shifted so the smallest is 0.
pub fn subtotals_for_deltas(deltas: &[i64]) -> Result<Vec<i64>, IssuanceError> {
    let mut subtotals = Vec::with_capacity(deltas.len());
    let mut running = 0i64;
    for delta in deltas {
        subtotals.push(running);
        running = running
            .checked_add(*delta)
            .ok_or_else(|| overflow("ring subtotals"))?;
    }
    let offset = subtotals.iter().copied().min().unwrap_or(0);
    subtotals
        .iter()
        .map(|subtotal| {
            subtotal
                .checked_sub(offset)
                .ok_or_else(|| overflow("ring subtotals"))
        })
        .collect()
}

/// Build the unsigned bundle spending every asset in `assets` as one ring.
pub fn unsigned_spend_bundle(assets: &[SpendableAsset]) -> Result<SpendBundle, IssuanceError> {
    if assets.is_empty() {
        return Ok(SpendBundle::new(Vec::new(), Signature::default()));
    }

    let mut deltas = Vec::with_capacity(assets.len());
    for asset in assets {
        let conditions = run_puzzle(&asset.inner_puzzle, &asset.inner_solution)?;
        asset.check_limitations(&conditions)?;
        deltas.push(asset.delta(&conditions)?);
    }
    let total = deltas
        .iter()
        .try_fold(0i64, |total, delta| total.checked_add(*delta))
        .ok_or_else(|| overflow("ring deltas"))?;
    if total != 0 {
        return Err(IssuanceError::InvalidAmount(
            "input and output amounts don't match".to_string(),
        ));
    }
    let subtotals = subtotals_for_deltas(&deltas)?;

    let mut next_proofs = Vec::with_capacity(assets.len());
    for asset in assets {
        next_proofs.push(CoinProof {
            parent_coin_info: asset.coin.parent_coin_info,
            inner_puzzle_hash: tree_hash(&asset.inner_puzzle)?,
            amount: asset.coin.amount,
        });
    }

    let ctx = &mut SpendContext::new();
    let count = assets.len();
    for (index, asset) in assets.iter().enumerate() {
        let prev = &assets[(index + count - 1) % count];
        let next_proof = next_proofs[(index + 1) % count];

        let inner_puzzle = ctx
            .alloc(&asset.inner_puzzle)
            .map_err(|e| IssuanceError::Alloc(format!("inner puzzle: {:?}", e)))?;
        let inner_solution = ctx
            .alloc(&asset.inner_solution)
            .map_err(|e| IssuanceError::Alloc(format!("inner solution: {:?}", e)))?;

        let puzzle = build_cat_puzzle(ctx, asset.asset_id, inner_puzzle)?;
        let solution = ctx
            .alloc(&CatSolution {
                inner_puzzle_solution: inner_solution,
                lineage_proof: None,
                prev_coin_id: prev.coin.coin_id(),
                this_coin_info: asset.coin,
                next_coin_proof: next_proof,
                prev_subtotal: subtotals[index],
                extra_delta: asset.extra_delta,
            })
            .map_err(|e| IssuanceError::Alloc(format!("cat solution: {:?}", e)))?;

        let puzzle_reveal = ctx
            .serialize(&puzzle)
            .map_err(|e| IssuanceError::Serialize(format!("{:?}", e)))?;
        let solution = ctx
            .serialize(&solution)
            .map_err(|e| IssuanceError::Serialize(format!("{:?}", e)))?;

        if tree_hash(&puzzle_reveal)? != asset.coin.puzzle_hash {
            return Err(IssuanceError::Eval(format!(
                "puzzle reveal does not match coin {}",
                hex::encode(asset.coin.coin_id())
            )));
        }

        ctx.insert(CoinSpend::new(asset.coin, puzzle_reveal, solution));
    }

    let coin_spends = ctx.take();
    tracing::debug!(spends = coin_spends.len(), "built unsigned genesis bundle");
    Ok(SpendBundle::new(coin_spends, Signature::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::assemble;
    use crate::puzzle::IssuancePuzzles;
    use clvm_traits::FromClvm;
    use clvmr::Allocator;

    fn issuance(amount: u64) -> (IssuancePuzzles, Coin) {
        let tail = assemble("(q . 1)").unwrap();
        let puzzles =
            IssuancePuzzles::build(tail, assemble("()").unwrap(), Bytes32::new([3u8; 32]), amount)
                .unwrap();
        let eve = Coin::new(Bytes32::new([1u8; 32]), puzzles.wrapped_puzzle_hash, amount);
        (puzzles, eve)
    }

    fn eve_asset(puzzles: &IssuancePuzzles, eve: Coin) -> SpendableAsset {
        SpendableAsset::eve(
            eve,
            puzzles.asset_id,
            puzzles.inner_puzzle.clone(),
            puzzles.tail.clone(),
            puzzles.tail_solution.clone(),
        )
    }

    fn decode_solution(spend: &CoinSpend) -> CatSolution<clvmr::NodePtr> {
        let mut a = Allocator::new();
        let node = crate::program::load(&mut a, &spend.solution).unwrap();
        CatSolution::from_clvm(&a, node).unwrap()
    }

    #[test]
    fn test_subtotals_are_shifted_to_zero() {
        assert_eq!(subtotals_for_deltas(&[0]).unwrap(), vec![0]);
        assert_eq!(subtotals_for_deltas(&[5, -10, 5]).unwrap(), vec![5, 10, 0]);
        assert!(subtotals_for_deltas(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_subtotal_overflow_is_an_error() {
        assert!(matches!(
            subtotals_for_deltas(&[i64::MAX, 1, -1]),
            Err(IssuanceError::InvalidAmount(_))
        ));
        assert!(matches!(
            subtotals_for_deltas(&[i64::MIN, i64::MAX]),
            Err(IssuanceError::InvalidAmount(_))
        ));
    }

    // Inner puzzle creates nothing, so the coin's full amount is its delta
    fn untracked_asset(parent: u8, amount: u64) -> SpendableAsset {
        SpendableAsset {
            coin: Coin::new(Bytes32::new([parent; 32]), Bytes32::new([6u8; 32]), amount),
            asset_id: Bytes32::new([7u8; 32]),
            inner_puzzle: assemble("(q . ())").unwrap(),
            inner_solution: assemble("()").unwrap(),
            limitations_program_reveal: None,
            limitations_solution: None,
            extra_delta: 0,
        }
    }

    #[test]
    fn test_delta_overflow_is_an_error() {
        let mut asset = untracked_asset(5, i64::MAX as u64);
        asset.extra_delta = 1;

        assert!(matches!(
            unsigned_spend_bundle(&[asset]),
            Err(IssuanceError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_ring_total_overflow_is_an_error() {
        let first = untracked_asset(5, i64::MAX as u64);
        let second = untracked_asset(8, i64::MAX as u64);

        assert!(matches!(
            unsigned_spend_bundle(&[first, second]),
            Err(IssuanceError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_single_eve_spend() {
        let (puzzles, eve) = issuance(1000);
        let bundle = unsigned_spend_bundle(&[eve_asset(&puzzles, eve)]).unwrap();

        assert_eq!(bundle.coin_spends.len(), 1);
        assert_eq!(bundle.aggregated_signature, Signature::default());

        let spend = &bundle.coin_spends[0];
        assert_eq!(spend.coin, eve);
        assert_eq!(spend.puzzle_reveal, puzzles.wrapped_puzzle);

        let solution = decode_solution(spend);
        assert_eq!(solution.prev_coin_id, eve.coin_id());
        assert_eq!(solution.this_coin_info, eve);
        assert_eq!(solution.next_coin_proof.parent_coin_info, eve.parent_coin_info);
        assert_eq!(solution.next_coin_proof.inner_puzzle_hash, puzzles.inner_puzzle_hash);
        assert_eq!(solution.next_coin_proof.amount, 1000);
        assert_eq!(solution.prev_subtotal, 0);
        assert_eq!(solution.extra_delta, 0);
        assert!(solution.lineage_proof.is_none());
    }

    #[test]
    fn test_ring_links_wrap_around() {
        let (first_puzzles, first) = issuance(10);
        let (second_puzzles, _) = issuance(20);
        let second = Coin::new(Bytes32::new([2u8; 32]), second_puzzles.wrapped_puzzle_hash, 20);

        let bundle = unsigned_spend_bundle(&[
            eve_asset(&first_puzzles, first),
            eve_asset(&second_puzzles, second),
        ])
        .unwrap();
        assert_eq!(bundle.coin_spends.len(), 2);

        let a = decode_solution(&bundle.coin_spends[0]);
        let b = decode_solution(&bundle.coin_spends[1]);
        assert_eq!(a.prev_coin_id, second.coin_id());
        assert_eq!(b.prev_coin_id, first.coin_id());
        assert_eq!(a.next_coin_proof.parent_coin_info, second.parent_coin_info);
        assert_eq!(b.next_coin_proof.parent_coin_info, first.parent_coin_info);
    }

    #[test]
    fn test_wrong_tail_reveal_rejected() {
        let (puzzles, eve) = issuance(1000);
        let mut asset = eve_asset(&puzzles, eve);
        asset.limitations_program_reveal = Some(assemble("(q . 2)").unwrap());

        assert!(matches!(
            unsigned_spend_bundle(&[asset]),
            Err(IssuanceError::Eval(_))
        ));
    }

    #[test]
    fn test_unbalanced_amounts_rejected() {
        let (puzzles, _) = issuance(1000);
        let eve = Coin::new(Bytes32::new([1u8; 32]), puzzles.wrapped_puzzle_hash, 999);

        assert!(matches!(
            unsigned_spend_bundle(&[eve_asset(&puzzles, eve)]),
            Err(IssuanceError::InvalidAmount(_))
        ));
    }
}
