use crate::commands::build_client;
use crate::vault::config::load_config;
use anyhow::Result;

pub fn run(message_id: i64) -> Result<()> {
    let cfg = load_config()?;
    let client = build_client(&cfg)?;

    let response = client.delete(message_id)?;
    println!("message {message_id} deleted");
    if !response.ok {
        eprintln!("warning: gateway reported ok=false for message {message_id}");
    }
    Ok(())
}
