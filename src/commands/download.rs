use crate::commands::build_client;
use crate::vault::config::load_config;
use anyhow::Result;

pub fn run(message_id: i64) -> Result<()> {
    let cfg = load_config()?;
    let client = build_client(&cfg)?;

    match client.download(message_id)? {
        Some(path) => println!("downloaded message {message_id} to {}", path.display()),
        None => println!("message {message_id} has no media"),
    }
    Ok(())
}
