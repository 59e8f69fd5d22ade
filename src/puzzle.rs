//! Issuance puzzle construction
//!
//! The eve coin is locked by the CAT outer puzzle wrapped around a one-shot
//! inner puzzle. When spent, the inner puzzle runs the TAIL (through the
//! `-113` sentinel) and pays the full amount to the destination.

use chia::protocol::{Bytes32, Program};
use chia::puzzles::cat::CatArgs;
use chia_wallet_sdk::driver::SpendContext;
use clvm_traits::{FromClvm, ToClvm};
use clvm_utils::{CurriedProgram, TreeHash};
use clvmr::NodePtr;

use crate::conditions::{CREATE_COIN, RUN_TAIL_MAGIC_AMOUNT};
use crate::error::IssuanceError;
use crate::program::tree_hash;

/// `(51 () -113 program solution)`
#[derive(Debug, Clone, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct RunTail<P, S> {
    pub opcode: u8,
    pub puzzle_hash: (),
    pub magic_amount: i64,
    pub program: P,
    pub solution: S,
}

impl<P, S> RunTail<P, S> {
    pub fn new(program: P, solution: S) -> Self {
        Self {
            opcode: CREATE_COIN,
            puzzle_hash: (),
            magic_amount: RUN_TAIL_MAGIC_AMOUNT,
            program,
            solution,
        }
    }
}

/// `(51 puzzle_hash amount)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct CreateCoin {
    pub opcode: u8,
    pub puzzle_hash: Bytes32,
    pub amount: u64,
}

impl CreateCoin {
    pub fn new(puzzle_hash: Bytes32, amount: u64) -> Self {
        Self {
            opcode: CREATE_COIN,
            puzzle_hash,
            amount,
        }
    }
}

/// Load the CAT v2 outer puzzle and curry it around `inner_puzzle`.
pub fn build_cat_puzzle(
    ctx: &mut SpendContext,
    asset_id: Bytes32,
    inner_puzzle: NodePtr,
) -> Result<NodePtr, IssuanceError> {
    let cat_mod_hash = TreeHash::new(chia_puzzles::CAT_PUZZLE_HASH);
    let cat_ptr = ctx
        .puzzle(cat_mod_hash, &chia_puzzles::CAT_PUZZLE)
        .map_err(|e| IssuanceError::Alloc(format!("cat puzzle: {:?}", e)))?;

    ctx.alloc(&CurriedProgram {
        program: cat_ptr,
        args: CatArgs::new(asset_id, inner_puzzle),
    })
    .map_err(|e| IssuanceError::Alloc(format!("cat curry: {:?}", e)))
}

/// Puzzle hash of a CAT with the given asset id and inner puzzle hash.
pub fn cat_puzzle_hash(asset_id: Bytes32, inner_puzzle_hash: Bytes32) -> Bytes32 {
    CatArgs::curry_tree_hash(asset_id, TreeHash::from(inner_puzzle_hash)).into()
}

/// Every puzzle and hash derived for one issuance.
///
/// Built purely from its inputs; nothing here touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuancePuzzles {
    /// The fully curried TAIL
    pub tail: Program,
    /// Solution passed to the TAIL when the eve coin is spent
    pub tail_solution: Program,
    /// Tree hash of the curried TAIL
    pub asset_id: Bytes32,
    /// `(q . ((51 () -113 TAIL SOLUTION) (51 DESTINATION AMOUNT)))`
    pub inner_puzzle: Program,
    pub inner_puzzle_hash: Bytes32,
    /// The CAT outer puzzle around `inner_puzzle`
    pub wrapped_puzzle: Program,
    /// Where the wallet must send `amount` to create the eve coin
    pub wrapped_puzzle_hash: Bytes32,
    pub destination: Bytes32,
    pub amount: u64,
}

impl IssuancePuzzles {
    /// Derive the issuance puzzles for `amount` of the asset defined by `tail`.
    pub fn build(
        tail: Program,
        tail_solution: Program,
        destination: Bytes32,
        amount: u64,
    ) -> Result<Self, IssuanceError> {
        if amount == 0 {
            return Err(IssuanceError::InvalidAmount(
                "cannot issue zero mojos".to_string(),
            ));
        }
        // The CAT ring tracks deltas as signed 64-bit values
        if i64::try_from(amount).is_err() {
            return Err(IssuanceError::InvalidAmount(format!(
                "cannot issue {amount} mojos, the most a CAT coin can hold is {}",
                i64::MAX
            )));
        }

        let asset_id = tree_hash(&tail)?;

        let ctx = &mut SpendContext::new();
        let inner_ptr = ctx
            .alloc(&(
                1u8,
                (
                    RunTail::new(tail.clone(), tail_solution.clone()),
                    (CreateCoin::new(destination, amount), ()),
                ),
            ))
            .map_err(|e| IssuanceError::Alloc(format!("inner puzzle: {:?}", e)))?;
        let wrapped_ptr = build_cat_puzzle(ctx, asset_id, inner_ptr)?;

        let inner_puzzle = ctx
            .serialize(&inner_ptr)
            .map_err(|e| IssuanceError::Serialize(format!("{:?}", e)))?;
        let wrapped_puzzle = ctx
            .serialize(&wrapped_ptr)
            .map_err(|e| IssuanceError::Serialize(format!("{:?}", e)))?;

        let inner_puzzle_hash = tree_hash(&inner_puzzle)?;
        let wrapped_puzzle_hash = tree_hash(&wrapped_puzzle)?;

        tracing::debug!(
            asset_id = %hex::encode(asset_id),
            inner_puzzle_hash = %hex::encode(inner_puzzle_hash),
            wrapped_puzzle_hash = %hex::encode(wrapped_puzzle_hash),
            "derived issuance puzzles"
        );

        Ok(Self {
            tail,
            tail_solution,
            asset_id,
            inner_puzzle,
            inner_puzzle_hash,
            wrapped_puzzle,
            wrapped_puzzle_hash,
            destination,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{run_puzzle, Condition};
    use crate::program::assemble;

    const DESTINATION: [u8; 32] = [0x42; 32];

    fn tail() -> Program {
        assemble("(q . 1)").unwrap()
    }

    fn nil() -> Program {
        assemble("()").unwrap()
    }

    #[test]
    fn test_asset_id_is_tail_hash() {
        let puzzles = IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), 1000).unwrap();
        assert_eq!(puzzles.asset_id, tree_hash(&tail()).unwrap());
    }

    #[test]
    fn test_wrapped_hash_matches_cat_curry() {
        let puzzles = IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), 1000).unwrap();
        assert_eq!(
            puzzles.wrapped_puzzle_hash,
            cat_puzzle_hash(puzzles.asset_id, puzzles.inner_puzzle_hash)
        );
        assert_ne!(puzzles.wrapped_puzzle_hash, puzzles.inner_puzzle_hash);
    }

    #[test]
    fn test_asset_id_independent_of_destination_and_amount() {
        let a = IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), 1000).unwrap();
        let b = IssuancePuzzles::build(tail(), nil(), Bytes32::new([7u8; 32]), 55).unwrap();

        assert_eq!(a.asset_id, b.asset_id);
        assert_ne!(a.wrapped_puzzle_hash, b.wrapped_puzzle_hash);
    }

    #[test]
    fn test_inner_puzzle_emits_two_conditions() {
        let solution = assemble("(1 2)").unwrap();
        let puzzles =
            IssuancePuzzles::build(tail(), solution.clone(), Bytes32::new(DESTINATION), 1000).unwrap();

        let conditions = run_puzzle(&puzzles.inner_puzzle, &nil()).unwrap();
        assert_eq!(
            conditions,
            vec![
                Condition::RunTail {
                    program: tail(),
                    solution,
                },
                Condition::CreateCoin {
                    puzzle_hash: Bytes32::new(DESTINATION),
                    amount: 1000,
                },
            ]
        );
    }

    #[test]
    fn test_inner_puzzle_layout() {
        let puzzles = IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), 1000).unwrap();
        let expected = assemble(&format!(
            "(q . ((51 () -113 (q . 1) ()) (51 0x{} 1000)))",
            hex::encode(DESTINATION)
        ))
        .unwrap();
        assert_eq!(puzzles.inner_puzzle, expected);
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(matches!(
            IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), 0),
            Err(IssuanceError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_amount_above_signed_range_rejected() {
        let too_big = i64::MAX as u64 + 1;
        assert!(matches!(
            IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), too_big),
            Err(IssuanceError::InvalidAmount(_))
        ));
        assert!(matches!(
            IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), u64::MAX),
            Err(IssuanceError::InvalidAmount(_))
        ));

        let largest = IssuancePuzzles::build(tail(), nil(), Bytes32::new(DESTINATION), i64::MAX as u64);
        assert_eq!(largest.unwrap().amount, i64::MAX as u64);
    }
}
