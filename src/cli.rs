use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "docdex",
    about = "Named, remotely-updatable full-text documentation search indices"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage search index records
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Search an index
    Search(SearchArgs),
    /// Refresh an index from its remote archive
    Update(UpdateArgs),
    /// Show data directory and index status
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

#[derive(Debug, Subcommand)]
pub enum IndexAction {
    /// Register a new index
    Add {
        /// Human-readable display name
        #[arg(long)]
        name: String,
        /// Base URL serving the downloadable archive; omit for a
        /// local-only index
        #[arg(long)]
        url: Option<String>,
    },
    /// Remove an index record
    Remove {
        /// Id of the record to remove
        id: u64,
    },
    /// List all index records
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Id of the index to search
    pub id: u64,

    /// Query text; terms default to the body field
    pub query: String,

    /// Maximum number of hits
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct UpdateArgs {
    /// Id of the index to update
    pub id: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
