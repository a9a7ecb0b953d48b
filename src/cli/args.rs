//! CLI argument definitions using clap

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "escrow-wallet",
    version,
    about = "Escrow Wallet - single-account wallet with threshold escrow for marketplaces",
    long_about = None
)]
pub struct Cli {
    /// Network to use: mainnet, sepolia, ropsten, dev (overrides config)
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    /// Chain JSON-RPC endpoint (overrides config)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Escrow contract address (overrides config)
    #[arg(long, global = true)]
    pub escrow_contract: Option<String>,

    /// Custom directory for keystores
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize or manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Keystore management commands
    Keystore {
        #[command(subcommand)]
        action: KeystoreAction,
    },

    /// Escrow script commands
    Escrow {
        #[command(subcommand)]
        action: EscrowAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize configuration file with defaults
    Init {
        /// Network to initialize for (defaults to dev)
        #[arg(short, long)]
        network: Option<String>,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Subcommand, Debug)]
pub enum KeystoreAction {
    /// Create a keystore with a freshly generated account key
    Create {
        /// Name of the keystore
        name: String,

        /// Password to encrypt the key
        #[arg(short, long)]
        password: String,
    },

    /// Import an existing hex-encoded secret key
    Import {
        /// Name of the keystore
        name: String,

        /// Secret key (64 hex digits, optional 0x prefix)
        #[arg(short = 'k', long)]
        private_key: String,

        /// Password to encrypt the key
        #[arg(short, long)]
        password: String,
    },

    /// List all keystores
    List,

    /// Show a keystore's address, optionally checking its password
    Show {
        /// Name of the keystore
        name: String,

        /// Password to verify by unlocking the key
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EscrowAction {
    /// Create a redeem script and its commitment hash
    Open {
        /// Buyer address
        #[arg(long)]
        buyer: String,

        /// Seller address
        #[arg(long)]
        seller: String,

        /// Moderator address (makes the escrow 2-of-3)
        #[arg(long)]
        moderator: Option<String>,

        /// Hours after which the seller may release alone (0 disables)
        #[arg(long, default_value = "0")]
        timeout_hours: u32,
    },

    /// Decode a serialized redeem script and recompute its hash
    Verify {
        /// Hex-encoded canonical script
        script: String,

        /// Commitment hash the script must match
        #[arg(long)]
        hash: Option<String>,
    },
}
