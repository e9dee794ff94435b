//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Live patching of an authored page from edit notifications
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: livepatch.toml)
    #[arg(short = 'C', long, global = true, default_value = "livepatch.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Replay recorded notifications against a page and print the result
    #[command(visible_alias = "a")]
    Apply {
        /// Page to patch
        #[arg(value_hint = clap::ValueHint::FilePath)]
        page: PathBuf,

        /// Notifications, one JSON object per line
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        events: PathBuf,

        /// Write the patched page here instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Serve a page and patch it live from WebSocket notifications
    #[command(visible_alias = "s")]
    Serve {
        /// Page to serve
        #[arg(value_hint = clap::ValueHint::FilePath)]
        page: PathBuf,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// HTTP port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// WebSocket port for authoring clients
        #[arg(long)]
        ws_port: Option<u16>,
    },
}

impl Commands {
    /// Page the command operates on.
    pub fn page(&self) -> &PathBuf {
        match self {
            Self::Apply { page, .. } | Self::Serve { page, .. } => page,
        }
    }
}
