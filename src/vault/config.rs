use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Runtime configuration, resolved as defaults <- TOML file <- environment.
///
/// The gateway triple (URL, token, channel) is required only for remote
/// operations; the ledger path is optional and its absence disables all
/// local accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub gateway_url: String,
    pub api_token: String,
    pub channel_id: i64,
    pub ledger_path: Option<PathBuf>,
    pub download_dir: PathBuf,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            gateway_url: String::new(),
            api_token: String::new(),
            channel_id: 0,
            ledger_path: None,
            download_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialVaultConfig {
    gateway_url: Option<String>,
    api_token: Option<String>,
    channel_id: Option<i64>,
    ledger_path: Option<PathBuf>,
    download_dir: Option<PathBuf>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_i64(var: &str, fallback: i64) -> i64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<i64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_opt_path(var: &str, fallback: Option<PathBuf>) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => fallback,
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("CHANVAULT_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".chanvault").join("config.toml"))
}

fn merge_file_config(base: &mut VaultConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialVaultConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(gateway_url) = parsed.gateway_url {
        base.gateway_url = gateway_url;
    }
    if let Some(api_token) = parsed.api_token {
        base.api_token = api_token;
    }
    if let Some(channel_id) = parsed.channel_id {
        base.channel_id = channel_id;
    }
    if let Some(ledger_path) = parsed.ledger_path {
        base.ledger_path = Some(ledger_path);
    }
    if let Some(download_dir) = parsed.download_dir {
        base.download_dir = download_dir;
    }
    Ok(())
}

pub fn load_config() -> Result<VaultConfig> {
    let mut cfg = VaultConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.gateway_url = env_or_string("CHANVAULT_GATEWAY_URL", &cfg.gateway_url);
    cfg.api_token = env_or_string("CHANVAULT_API_TOKEN", &cfg.api_token);
    cfg.channel_id = env_or_i64("CHANVAULT_CHANNEL_ID", cfg.channel_id);
    cfg.ledger_path = env_opt_path("CHANVAULT_LEDGER_PATH", cfg.ledger_path.take());
    cfg.download_dir = env_opt_path("CHANVAULT_DOWNLOAD_DIR", Some(cfg.download_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(cfg)
}

impl VaultConfig {
    /// Remote operations need the full gateway triple; `status` does not.
    pub fn ensure_remote(&self) -> Result<()> {
        if self.gateway_url.trim().is_empty() {
            return Err(anyhow!(
                "gateway URL missing: set CHANVAULT_GATEWAY_URL or gateway_url in config.toml"
            ));
        }
        if self.api_token.trim().is_empty() {
            return Err(anyhow!(
                "API token missing: set CHANVAULT_API_TOKEN or api_token in config.toml"
            ));
        }
        if self.channel_id == 0 {
            return Err(anyhow!(
                "channel id missing: set CHANVAULT_CHANNEL_ID or channel_id in config.toml"
            ));
        }
        Ok(())
    }
}
