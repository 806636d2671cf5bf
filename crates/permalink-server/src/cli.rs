use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "permalink-server", version)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create the Postgres tables.
    Migrate,
    /// Issue an API key for a principal. The key is printed once.
    CreateApiKey {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        admin: bool,
    },
    /// Delete every expired permalink and exit.
    PurgeExpired,
}
