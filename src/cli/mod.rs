//! Command-line interface module.

pub mod apply;
mod args;
pub mod serve;

pub use args::{Cli, Commands};
