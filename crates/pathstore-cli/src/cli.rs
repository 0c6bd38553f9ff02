use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pathstore",
    about = "Inspect path-addressed array and object stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with store settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path separator, overriding the config file
    #[arg(long, global = true)]
    pub separator: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty store
    Init(StoreArgs),
    /// List every saved path and its row id
    Ls(StoreArgs),
    /// Describe one saved record
    Show(PathArgs),
    /// Show row counts and the id counter
    Stats(StoreArgs),
    /// Print the contents of a saved array
    Cat(PathArgs),
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Store file; the configured suffix is appended if missing
    pub store: PathBuf,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    pub store: PathBuf,
    /// Separator-delimited record path
    pub path: String,
}
