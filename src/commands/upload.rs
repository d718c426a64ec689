use crate::commands::build_client;
use crate::gateway::ProgressFn;
use crate::vault::config::load_config;
use anyhow::Result;
use std::path::Path;

fn progress_printer() -> ProgressFn {
    let mut last_bucket = 0u64;
    Box::new(move |transferred, total| {
        if total == 0 {
            return;
        }
        let pct = transferred * 100 / total;
        let bucket = pct / 10;
        if bucket > last_bucket {
            last_bucket = bucket;
            eprintln!("uploading... {pct}%");
        }
    })
}

pub fn run(path: &Path) -> Result<()> {
    let cfg = load_config()?;
    let client = build_client(&cfg)?;

    let message = client.upload(path, Some(progress_printer()))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");
    println!("uploaded {name} as message {}", message.id);
    Ok(())
}
