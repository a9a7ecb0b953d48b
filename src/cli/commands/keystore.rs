//! Keystore command implementations

use crate::config::{load_config, ConfigError, ConfigOverrides};
use crate::storage::credential::{CredentialError, LocalCredential};
use crate::storage::file_system::{
    keystore_path, list_keystores, load_keystore, save_keystore, FileSystemError,
};
use crate::storage::keys::{generate_secret_key, parse_secret_key, KeyError};

#[derive(Debug, thiserror::Error)]
pub enum KeystoreCommandError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Create a keystore with a newly generated key
pub fn create(
    name: String,
    password: String,
    overrides: ConfigOverrides,
) -> Result<(), KeystoreCommandError> {
    let config = load_config(None, overrides)?;
    let secret_key = generate_secret_key();
    let keystore = save_keystore(
        &name,
        &secret_key,
        &password,
        config.chain.network,
        config.keystores_dir.as_deref(),
    )?;

    println!("✓ Keystore '{}' created successfully", name);
    println!();
    println!("  Network: {}", keystore.network);
    println!("  Address: {}", keystore.address);

    Ok(())
}

/// Import a hex-encoded secret key
pub fn import(
    name: String,
    private_key: String,
    password: String,
    overrides: ConfigOverrides,
) -> Result<(), KeystoreCommandError> {
    let config = load_config(None, overrides)?;
    let secret_key = parse_secret_key(&private_key)?;
    let keystore = save_keystore(
        &name,
        &secret_key,
        &password,
        config.chain.network,
        config.keystores_dir.as_deref(),
    )?;

    println!("✓ Keystore '{}' imported successfully", name);
    println!();
    println!("  Network: {}", keystore.network);
    println!("  Address: {}", keystore.address);

    Ok(())
}

/// List all keystores
pub fn list(overrides: ConfigOverrides) -> Result<(), KeystoreCommandError> {
    let config = load_config(None, overrides)?;
    let keystores = list_keystores(config.keystores_dir.as_deref())?;

    if keystores.is_empty() {
        println!("No keystores found.");
        println!();
        println!("Create a new keystore with:");
        println!("  escrow-wallet keystore create <name> --password <password>");
        return Ok(());
    }

    println!("Keystores ({}):", keystores.len());
    println!();

    for keystore in keystores {
        println!("  {} [{}]", keystore.name, keystore.network);
        println!("    Address: {}", keystore.address);
        println!(
            "    Created: {}",
            keystore.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    Ok(())
}

/// Show a keystore, unlocking it when a password is given
pub fn show(
    name: String,
    password: Option<String>,
    overrides: ConfigOverrides,
) -> Result<(), KeystoreCommandError> {
    let config = load_config(None, overrides)?;
    let custom_base = config.keystores_dir.as_deref();
    let keystore = load_keystore(&name, custom_base)?;

    println!("Keystore '{}':", keystore.name);
    println!("  Address: {}", keystore.address);
    println!("  Network: {}", keystore.network);
    println!(
        "  Created: {}",
        keystore.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(password) = password {
        let credential = LocalCredential::unlock(&keystore_path(&name, custom_base)?, &password)?;
        println!("  ✓ Password verified for {:?}", credential);
    }

    Ok(())
}
