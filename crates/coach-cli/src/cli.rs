use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "coach",
    about = "Coaching credit service: credit ledger and purchase gateway",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the default configuration as TOML
    Config,
    /// Load a configuration file and report problems
    CheckConfig(CheckConfigArgs),
    /// Verify journal chains and balances in a file store
    VerifyJournal(VerifyJournalArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override `server.bind_addr`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    #[arg(short, long)]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct VerifyJournalArgs {
    /// Path of the JSON snapshot written by the file store
    #[arg(long)]
    pub store: PathBuf,
    /// Only check this account
    #[arg(long)]
    pub account: Option<String>,
}
