//! Argument parsing for the `jaryd` binary: a script path plus an
//! optional module search directory.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "jaryd")]
#[command(about = "Compile and run a Jary rule script against an event store")]
#[command(version)]
pub struct Cli {
    /// Path to the `.jary` script to compile and run.
    pub script: PathBuf,

    /// Directory to search for dynamically loaded modules (`import`).
    #[arg(long)]
    pub modules: Option<PathBuf>,

    /// SQLite database path. Defaults to an in-memory database.
    #[arg(long)]
    pub db: Option<PathBuf>,
}
