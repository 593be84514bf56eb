use alloy::signers::local::PrivateKeySigner;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".ethereum").join("keystore"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let entry = entry.wrap_err("Failed to read keystore entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

/// Picks the named keystore, or the only one present when no name is given.
pub fn find_wallet(dir: &Path, name: Option<&str>) -> Result<WalletDescriptor> {
    let mut wallets = list_wallets(dir)?;
    match name {
        Some(name) => wallets
            .into_iter()
            .find(|w| w.name == name)
            .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy())),
        None if wallets.len() == 1 => Ok(wallets.remove(0)),
        None if wallets.is_empty() => Err(eyre!(
            "No keystore files found in {}",
            dir.to_string_lossy()
        )),
        None => Err(eyre!(
            "Multiple keystores in {}; pick one with --wallet <name>",
            dir.to_string_lossy()
        )),
    }
}

/// Prompts for the keystore password and decrypts the signer. An empty
/// password is treated as the user declining the connect request and yields
/// `None` without touching the keystore.
pub fn unlock_wallet(descriptor: &WalletDescriptor) -> Result<Option<PrivateKeySigner>> {
    let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read wallet password")?;
    if password.is_empty() {
        return Ok(None);
    }

    let signer = PrivateKeySigner::decrypt_keystore(&descriptor.path, password)
        .map_err(|err| eyre!("Unable to unlock wallet '{}': {err}", descriptor.name))?;
    Ok(Some(signer))
}
