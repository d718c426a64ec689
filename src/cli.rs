use crate::commands;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "chanvault",
    version,
    about = "Use a messaging channel as a blob store, with local storage accounting"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file as a channel attachment
    Upload {
        /// File to upload
        path: PathBuf,
    },
    /// Download a previously uploaded file by message id
    Download {
        /// Remote message id
        message_id: i64,
    },
    /// Delete a message from the channel and soft-delete it locally
    Delete {
        /// Remote message id
        message_id: i64,
    },
    /// Print the id of the newest message on the channel
    Latest,
    /// Print the local storage ledger summary (no network)
    Status,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Upload { path } => commands::upload::run(&path),
        Command::Download { message_id } => commands::download::run(message_id),
        Command::Delete { message_id } => commands::delete::run(message_id),
        Command::Latest => commands::latest::run(),
        Command::Status => commands::status::run(),
    }
}
