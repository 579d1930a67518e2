use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

mod config;
mod engine;
mod ledger;
mod model;
mod parsing;
mod print;
mod simulator;
mod summarize;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding one subdirectory per user.
    #[arg(long, value_name = "DIR", default_value = "./users")]
    users: PathBuf,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cash flow summary for one month of the ledger.
    Summarize(summarize::Command),
    /// Projects the balance forward and recommends a surplus transfer.
    Simulator(simulator::Command),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fn get_rust_log(verbose: u8) -> String {
        let default = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into())
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log(cli.verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let workspace = config::Workspace::new(cli.users, Local::now().date_naive());

    match &cli.command {
        Commands::Summarize(cmd) => summarize::execute_command(&workspace, cmd),
        Commands::Simulator(cmd) => simulator::execute_command(&workspace, cmd),
    }
}
