//! Driver for issuing Chia Asset Tokens (CAT v2)
//!
//! This crate builds everything needed to mint a new CAT in one transaction:
//! - `ProgramSource` / `resolve_program` - Load a TAIL from inline CLVM, hex bytes or a file
//! - `IssuancePuzzles` - Derive the eve inner puzzle, the CAT-wrapped puzzle and the asset id
//! - `FundingCoordinator` - Ask the wallet for a signed transaction creating the eve coin
//! - `unsigned_spend_bundle` - Spend the eve coin under the TAIL
//! - `final_bundle` - Fold funding, genesis, extra bundles and extra signatures together
//!
//! # Flow
//!
//! ```rust,ignore
//! let wallet = WalletRpcClient::connect(WalletRpcConfig::default())?;
//!
//! let mut request = IssuanceRequest::new("(q . 1)", "xch1...", 1000);
//! request.curry_args.push("0xcafe".to_string());
//!
//! match run(&request, &wallet).await? {
//!     IssuanceOutcome::Issued { asset_id, bundle } => {
//!         println!("{}", render_asset_id(asset_id));
//!         println!("{}", render_bundle(&bundle, OutputFormat::Json)?);
//!     }
//!     IssuanceOutcome::SelectedCoin(coin) => println!("{}", render_coin(&coin)?),
//! }
//! ```

mod aggregate;
mod conditions;
mod error;
mod funding;
mod genesis;
mod pipeline;
mod present;
mod program;
mod puzzle;

pub use aggregate::{
    aggregate_bundles, aggregate_signatures, final_bundle, parse_signature, parse_spend_bundle,
};
pub use conditions::{additions, removals, run_puzzle, Condition};
pub use error::IssuanceError;
pub use funding::{find_eve_coin, select_funding_coin, FundedIssuance, FundingCoordinator};
pub use genesis::{subtotals_for_deltas, unsigned_spend_bundle, SpendableAsset};
pub use pipeline::{
    prepare, run, run_prepared, IssuanceOutcome, IssuanceRequest, PreparedIssuance,
};
pub use present::{render_asset_id, render_bundle, render_coin, sorted_json, OutputFormat};
pub use program::{assemble, curry, resolve_program, tree_hash, uncurry, ProgramSource};
pub use puzzle::{build_cat_puzzle, cat_puzzle_hash, CreateCoin, IssuancePuzzles, RunTail};

// Re-export commonly used types from dependencies
pub use chia::protocol::{Bytes32, Coin, CoinSpend, Program, SpendBundle};
pub use chia_wallet_sdk::driver::SpendContext;
pub use clvm_utils::TreeHash;
