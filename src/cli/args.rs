//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};
use clap_complete::Shell;

/// XML hierarchy viewer and editor: import, lay out, re-parent and export documents
#[derive(Parser, Debug)]
#[command(name = "xmlflux")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory searched for a local .xmlflux.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Print shell completions and exit
    #[arg(long = "completions", value_enum)]
    pub generator: Option<Shell>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a document and export it again to stdout
    Roundtrip {
        /// XML document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show the element hierarchy as a tree
    Tree {
        /// XML document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Print computed node positions
    Layout {
        /// XML document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Viewport width
        #[arg(long, default_value_t = 960.0)]
        width: f64,
        /// Viewport height
        #[arg(long, default_value_t = 600.0)]
        height: f64,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Move a node under a new parent and print the resulting document
    Move {
        /// XML document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Slash-separated name path of the node to move, e.g. root/b/c
        node: String,
        /// Slash-separated name path of the new parent
        target: String,
        /// Write the result back to FILE instead of stdout
        #[arg(short, long)]
        in_place: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}
