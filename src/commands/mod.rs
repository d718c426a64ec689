pub mod delete;
pub mod download;
pub mod latest;
pub mod status;
pub mod upload;

use crate::gateway::http::HttpTransport;
use crate::vault::client::StorageClient;
use crate::vault::config::VaultConfig;
use crate::vault::ledger::Ledger;
use anyhow::Result;

pub fn build_client(cfg: &VaultConfig) -> Result<StorageClient<HttpTransport>> {
    cfg.ensure_remote()?;
    let transport = HttpTransport::new(
        &cfg.gateway_url,
        &cfg.api_token,
        cfg.download_dir.clone(),
    )?;
    let ledger = Ledger::new(cfg.ledger_path.clone());
    Ok(StorageClient::new(transport, cfg.channel_id, ledger))
}
