//! livepatch - apply authoring edit notifications to a live page.
//!
//! An authoring tool reports each edit as a notification carrying freshly
//! rendered markup. livepatch finds the edited resource in the live
//! document, works out how much of the page the edit affects, and swaps
//! that subtree for its sanitized, decorated replacement without a reload.
//!
//! # Modules
//!
//! - `dom` - arena document tree, parsing and serialization
//! - `patch` - locate, resolve scope, sanitize, swap
//! - `decorate` - the decoration pipeline run on swapped-in markup
//! - `actor` - the notification dispatcher and WebSocket clients
//! - `channel` - wire messages and the WebSocket listener
//! - `cli` - `apply` and `serve`

#![allow(dead_code)]

mod actor;
mod channel;
mod cli;
mod config;
mod core;
mod decorate;
mod dom;
mod logger;
mod patch;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{LivepatchConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = LivepatchConfig::load(&cli)?;
    config.validate()?;
    let config = init_config(config);

    match &cli.command {
        Commands::Apply {
            page,
            events,
            output,
        } => cli::apply::run(&config, page, events, output.as_deref()),
        Commands::Serve { page, .. } => cli::serve::run(page),
    }
}
