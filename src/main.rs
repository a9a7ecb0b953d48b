//! Escrow Wallet CLI
//!
//! Command-line interface for keystores and offline escrow script handling

use clap::Parser;
use escrow_wallet::address::Address;
use escrow_wallet::cli::args::{Cli, Commands, ConfigAction, EscrowAction, KeystoreAction};
use escrow_wallet::cli::commands;
use escrow_wallet::config::{ConfigOverrides, NetworkType};
use std::process;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let network = cli.network.as_ref().map(|n| match n.parse::<NetworkType>() {
        Ok(network) => network,
        Err(_) => {
            eprintln!(
                "Error: Invalid network '{}'. Use: mainnet, sepolia, ropsten, or dev",
                n
            );
            process::exit(1);
        }
    });

    let escrow_contract = cli.escrow_contract.as_ref().map(|c| match Address::parse(c) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("Error: Invalid escrow contract '{}': {}", c, e);
            process::exit(1);
        }
    });

    // Build config overrides from global arguments
    let overrides = ConfigOverrides {
        network,
        rpc_url: cli.rpc_url.clone(),
        escrow_contract,
        request_timeout_secs: None,
        keystores_dir: cli.data_dir.clone(),
    };

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Init { network } => commands::config::init(network).map_err(Into::into),
            ConfigAction::Show => commands::config::show(overrides).map_err(Into::into),
        },

        Commands::Keystore { action } => match action {
            KeystoreAction::Create { name, password } => {
                commands::keystore::create(name, password, overrides).map_err(Into::into)
            }

            KeystoreAction::Import {
                name,
                private_key,
                password,
            } => commands::keystore::import(name, private_key, password, overrides)
                .map_err(Into::into),

            KeystoreAction::List => commands::keystore::list(overrides).map_err(Into::into),

            KeystoreAction::Show { name, password } => {
                commands::keystore::show(name, password, overrides).map_err(Into::into)
            }
        },

        Commands::Escrow { action } => match action {
            EscrowAction::Open {
                buyer,
                seller,
                moderator,
                timeout_hours,
            } => commands::escrow::open(buyer, seller, moderator, timeout_hours)
                .map_err(Into::into),

            EscrowAction::Verify { script, hash } => {
                commands::escrow::verify(script, hash).map_err(Into::into)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
