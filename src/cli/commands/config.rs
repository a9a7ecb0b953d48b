//! Config command implementations

use crate::config::{load_config, ConfigError, ConfigOverrides, GlobalConfig, NetworkType};

/// Initialize configuration file with network-specific defaults
pub fn init(network: Option<String>) -> Result<(), ConfigError> {
    let network_type = match network.as_deref() {
        Some(n) => n.parse::<NetworkType>()?,
        None => NetworkType::Dev,
    };

    let config = GlobalConfig::for_network(network_type);
    crate::config::save_config(&config, None)?;

    let config_path = crate::config::default_config_path()?;
    println!("✓ Configuration initialized for {}", network_type);
    println!("  Config file: {}", config_path.display());
    println!("  Chain ID:    {}", config.chain.chain_id);
    println!("  RPC URL:     {}", config.chain.rpc_url);

    Ok(())
}

/// Print the configuration after file, environment and CLI layering
pub fn show(overrides: ConfigOverrides) -> Result<(), ConfigError> {
    let config = load_config(None, overrides)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
