//! Puzzle evaluation and the few conditions issuance cares about.

use chia::protocol::{Bytes32, Coin, CoinSpend, Program, SpendBundle};
use clvm_traits::FromClvm;
use clvmr::{run_program, Allocator, ChiaDialect, NodePtr};

use crate::error::IssuanceError;
use crate::program::{load, to_program};

/// CREATE_COIN opcode
pub const CREATE_COIN: u8 = 51;

/// Amount marking a CREATE_COIN as the "run the TAIL" sentinel.
pub const RUN_TAIL_MAGIC_AMOUNT: i64 = -113;

/// Cost ceiling for evaluating a single spend (one block's worth).
pub const MAX_SPEND_COST: u64 = 11_000_000_000;

/// A condition emitted by a puzzle, reduced to what issuance needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Create a coin of `amount` at `puzzle_hash`
    CreateCoin { puzzle_hash: Bytes32, amount: u64 },
    /// Run the TAIL `program` with `solution` during CAT verification
    RunTail { program: Program, solution: Program },
    /// Anything else
    Other,
}

/// Run `puzzle` with `solution` and return its conditions.
pub fn run_puzzle(puzzle: &Program, solution: &Program) -> Result<Vec<Condition>, IssuanceError> {
    let mut a = Allocator::new();
    let puzzle = load(&mut a, puzzle)?;
    let solution = load(&mut a, solution)?;

    let output = run_program(&mut a, &ChiaDialect::new(0), puzzle, solution, MAX_SPEND_COST)
        .map_err(|e| IssuanceError::Eval(format!("{e:?}")))?
        .1;

    let conditions = Vec::<NodePtr>::from_clvm(&a, output)
        .map_err(|e| IssuanceError::Eval(format!("conditions are not a list: {e:?}")))?;

    conditions
        .into_iter()
        .map(|condition| parse_condition(&a, condition))
        .collect()
}

fn parse_condition(a: &Allocator, node: NodePtr) -> Result<Condition, IssuanceError> {
    let Ok(fields) = Vec::<NodePtr>::from_clvm(a, node) else {
        return Ok(Condition::Other);
    };
    if fields.len() < 3 || !matches!(u8::from_clvm(a, fields[0]), Ok(CREATE_COIN)) {
        return Ok(Condition::Other);
    }

    if matches!(i64::from_clvm(a, fields[2]), Ok(RUN_TAIL_MAGIC_AMOUNT)) {
        let (Some(program), Some(solution)) = (fields.get(3), fields.get(4)) else {
            return Err(IssuanceError::Eval(
                "run-TAIL condition without program and solution".to_string(),
            ));
        };
        return Ok(Condition::RunTail {
            program: to_program(a, *program).map_err(IssuanceError::Serialize)?,
            solution: to_program(a, *solution).map_err(IssuanceError::Serialize)?,
        });
    }

    let puzzle_hash = Bytes32::from_clvm(a, fields[1])
        .map_err(|e| IssuanceError::Eval(format!("CREATE_COIN puzzle hash: {e:?}")))?;
    let amount = u64::from_clvm(a, fields[2])
        .map_err(|e| IssuanceError::Eval(format!("CREATE_COIN amount: {e:?}")))?;
    Ok(Condition::CreateCoin {
        puzzle_hash,
        amount,
    })
}

/// Coins created by one spend.
pub fn spend_additions(spend: &CoinSpend) -> Result<Vec<Coin>, IssuanceError> {
    let parent = spend.coin.coin_id();
    Ok(run_puzzle(&spend.puzzle_reveal, &spend.solution)?
        .into_iter()
        .filter_map(|condition| match condition {
            Condition::CreateCoin {
                puzzle_hash,
                amount,
            } => Some(Coin::new(parent, puzzle_hash, amount)),
            _ => None,
        })
        .collect())
}

/// Coins created by every spend in the bundle, in spend order.
pub fn additions(bundle: &SpendBundle) -> Result<Vec<Coin>, IssuanceError> {
    let mut coins = Vec::new();
    for spend in &bundle.coin_spends {
        coins.extend(spend_additions(spend)?);
    }
    Ok(coins)
}

/// Coins consumed by the bundle.
pub fn removals(bundle: &SpendBundle) -> Vec<Coin> {
    bundle.coin_spends.iter().map(|spend| spend.coin).collect()
}
