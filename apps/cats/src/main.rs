//! cats - Issue a new CAT from a TAIL.
//!
//! Asks the local wallet for a signed transaction that creates the eve coin,
//! spends the eve coin under the TAIL and prints the combined spend bundle.
//! Nothing is pushed to the network.
//!
//! Usage:
//!   cats --tail ./genesis_by_coin_id.clsp --curry 0x<coin id> --send-to xch1... --amount 1000
//!   cats --tail "(q . 1)" --send-to xch1... --amount 1000 --as-bytes
//!   cats --tail ./tail.clvm.hex --send-to <puzzle hash> --amount 1000 --select-coin

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use console::style;

use cat_issuance_driver::{
    prepare, render_asset_id, render_bundle, render_coin, run_prepared, IssuanceOutcome,
    IssuanceRequest, OutputFormat,
};
use issuance_wallet::{
    WalletRpcClient, WalletRpcConfig, DEFAULT_WALLET_RPC_HOST, DEFAULT_WALLET_RPC_PORT,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cats")]
#[command(about = "Issue a CAT and print the resulting spend bundle")]
#[command(version)]
struct Cli {
    /// The TAIL program to launch this CAT with
    #[arg(short = 'l', long)]
    tail: String,

    /// An argument to curry into the TAIL
    #[arg(short, long)]
    curry: Vec<String>,

    /// The solution to the TAIL program
    #[arg(short, long, default_value = "()")]
    solution: String,

    /// The address these CATs will appear at once they are issued
    #[arg(short = 't', long)]
    send_to: String,

    /// The amount to issue in mojos (regular XCH will be used to fund this)
    #[arg(short, long)]
    amount: u64,

    /// The XCH fee to use for this issuance
    #[arg(short, long, default_value = "0")]
    fee: u64,

    /// A signature to aggregate with the transaction
    #[arg(long, visible_alias = "sig")]
    signature: Vec<String>,

    /// An additional spend to aggregate with the transaction
    #[arg(long, visible_alias = "as")]
    spend: Vec<String>,

    /// Output the spend bundle as a sequence of bytes instead of JSON
    #[arg(short = 'b', long)]
    as_bytes: bool,

    /// Stop once the wallet has selected a coin and print that coin
    #[arg(long, visible_alias = "sc")]
    select_coin: bool,

    /// Include directory for Chialisp compilation
    #[arg(short, long)]
    include: Vec<PathBuf>,

    /// Chia root holding the wallet's SSL certificates
    #[arg(long, env = "CHIA_ROOT")]
    chia_root: Option<PathBuf>,

    #[arg(long, env = "CHIA_WALLET_RPC_HOST", default_value = DEFAULT_WALLET_RPC_HOST)]
    rpc_host: String,

    #[arg(long, env = "CHIA_WALLET_RPC_PORT", default_value_t = DEFAULT_WALLET_RPC_PORT)]
    rpc_port: u16,

    #[arg(long, default_value = "1")]
    wallet_id: u32,

    /// Give up on the wallet after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn wallet_config(&self) -> WalletRpcConfig {
        let root = self
            .chia_root
            .clone()
            .unwrap_or_else(WalletRpcConfig::default_chia_root);

        WalletRpcConfig::for_root(root)
            .host(self.rpc_host.clone())
            .port(self.rpc_port)
            .wallet_id(self.wallet_id)
            .timeout(self.timeout_secs.map(Duration::from_secs))
    }

    fn request(&self) -> IssuanceRequest {
        IssuanceRequest {
            tail: self.tail.clone(),
            curry_args: self.curry.clone(),
            solution: self.solution.clone(),
            destination: self.send_to.clone(),
            amount: self.amount,
            fee: self.fee,
            signatures: self.signature.clone(),
            spends: self.spend.clone(),
            include: self.include.clone(),
            select_coin: self.select_coin,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Bad inputs are reported before any connection to the wallet is attempted
    let prepared = prepare(&cli.request())?;

    let config = cli.wallet_config();
    let endpoint = config.base_url();
    let outcome = {
        let wallet = WalletRpcClient::connect(config)
            .with_context(|| format!("Connection error. Check if the wallet is running at {endpoint}"))?;
        run_prepared(prepared, &wallet).await?
    };

    match outcome {
        IssuanceOutcome::SelectedCoin(coin) => {
            println!("{}", render_coin(&coin)?);
        }
        IssuanceOutcome::Issued { asset_id, bundle } => {
            let rendered = render_bundle(&bundle, OutputFormat::from_flag(cli.as_bytes))?;
            println!("{} {}", style("Asset ID:").bold(), render_asset_id(asset_id));
            println!("{} {}", style("Spend Bundle:").bold(), rendered);
        }
    }

    Ok(())
}
