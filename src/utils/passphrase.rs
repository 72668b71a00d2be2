//! Passphrase loading for SQLCipher: env var → .env in dir → secure prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use std::path::Path;

use crate::utils::config::PackagePaths;

fn non_empty_var(key: &str) -> Option<String> {
    let s = std::env::var(key).ok()?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn try_env_then_dotenv(dir: &Path, key: &str) -> Option<String> {
    if let Some(s) = non_empty_var(key) {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        return non_empty_var(key);
    }
    None
}

/// Read the database passphrase: env (CREDSINK_DB_KEY) → .env in `dir` → secure prompt.
/// `is_new`: true when creating a new encrypted database.
pub fn get_passphrase(dir: &Path, is_new: bool) -> Result<String> {
    info!("Encryption mode (either flag was provided or an encrypted database was detected)");
    let key = PackagePaths::get().key_env_var();
    if let Some(s) = try_env_then_dotenv(dir, key) {
        info!("Passphrase found in environment");
        return Ok(s);
    }
    let label = format!("[{}]", PackagePaths::get().pkg_name()).cyan().bold();
    let prompt = if is_new {
        "Create new passphrase: "
    } else {
        "Enter passphrase: "
    };
    let pass =
        rpassword::prompt_password(format!("{} {}", label, prompt)).context("read passphrase")?;
    let pass = pass.trim().to_string();
    if pass.is_empty() {
        anyhow::bail!("empty passphrase");
    }
    if is_new {
        warn!("Lost passphrase = lost access to {}", key);
    }
    Ok(pass)
}
