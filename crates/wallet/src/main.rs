use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use wallet::config::Config;
use wallet::shell::{self, Shell};
use wallet::state::WalletState;

#[derive(Parser)]
#[command(name = "wallet")]
#[command(about = "Non-custodial Sui wallet with Google zkLogin", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// devnet, testnet or mainnet
    #[arg(long)]
    chain: Option<String>,

    #[arg(long)]
    rpc_url: Option<String>,

    #[arg(long)]
    prover_url: Option<String>,

    /// Use the deterministic mock prover (not on mainnet)
    #[arg(long)]
    mock_prover: bool,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Port of the local OAuth callback listener
    #[arg(long)]
    port: Option<u16>,

    /// Debug-level logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive wallet shell (default)
    Shell {
        /// Paste redirect URLs instead of running the callback listener
        #[arg(long)]
        manual: bool,
    },

    /// Show token balances
    Balances {
        /// Defaults to the signed-in address
        address: Option<String>,
    },

    /// Show recent transactions
    History {
        /// Defaults to the signed-in address
        address: Option<String>,
    },

    /// Show the signed-in identity
    Whoami,

    /// Forget the signed-in identity
    Logout,

    /// Show configuration
    Config,
}

fn address_or_signed_in(state: &WalletState, address: Option<String>) -> Result<String> {
    address
        .or_else(|| state.auth().user().map(|u| u.address.clone()))
        .ok_or_else(|| anyhow!("not signed in; pass an address or run `wallet shell` and `login`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    wallet::logging::init(cli.verbose)?;

    // Load config from environment
    let mut config = Config::from_env()?;

    // Override with CLI arguments
    if let Some(chain) = cli.chain {
        config.set_chain(&chain)?;
    }
    if let Some(url) = cli.rpc_url {
        config.rpc_url = Some(url);
    }
    if let Some(url) = cli.prover_url {
        config.prover_url = url;
    }
    if cli.mock_prover {
        config.mock_prover = true;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(port) = cli.port {
        config.set_callback_port(port);
    }
    config.validate()?;

    info!("Using {} via {}", config.network, config.rpc_url());

    let mut state = WalletState::new(config);
    state.mount_auth();

    match cli.command.unwrap_or(Commands::Shell { manual: false }) {
        Commands::Shell { manual } => Shell::new(state, manual).run().await?,
        Commands::Balances { address } => {
            let address = address_or_signed_in(&state, address)?;
            println!("{} {}", "Balances for".bold().blue(), address);
            shell::print_balances(&state.chain.fetch_balances(&address).await);
        }
        Commands::History { address } => {
            let address = address_or_signed_in(&state, address)?;
            println!("{} {}", "Transactions for".bold().blue(), address);
            shell::print_history(&state.chain.fetch_transactions(&address).await);
        }
        Commands::Whoami => shell::print_identity(state.auth().user()),
        Commands::Logout => {
            state.logout();
            println!("{}", "Signed out.".green());
        }
        Commands::Config => {
            println!("{}", "Configuration".bold().blue());
            println!("{}", serde_json::to_string_pretty(&state.config)?);
        }
    }

    Ok(())
}
