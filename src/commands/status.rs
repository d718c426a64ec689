use crate::vault::config::load_config;
use crate::vault::ledger::Ledger;
use anyhow::Result;

/// Ledger-only report; works without any gateway configuration.
pub fn run() -> Result<()> {
    let cfg = load_config()?;
    let ledger = Ledger::new(cfg.ledger_path.clone());

    let Some(summary) = ledger.summary()? else {
        println!("no ledger configured; set CHANVAULT_LEDGER_PATH to enable storage accounting");
        return Ok(());
    };

    println!("total_size_bytes={}", summary.total_size);
    println!("total_size_mb={:.2}", summary.total_size_mb);
    println!("active_files={}", summary.active_files);
    println!("deleted_files={}", summary.deleted_files);
    println!("total_files={}", summary.total_files);
    Ok(())
}
