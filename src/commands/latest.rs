use crate::commands::build_client;
use crate::vault::config::load_config;
use anyhow::Result;

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    let client = build_client(&cfg)?;

    match client.latest_message_id()? {
        Some(id) => println!("{id}"),
        None => println!("channel empty"),
    }
    Ok(())
}
