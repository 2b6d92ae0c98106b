//! Work session tracker CLI library.
//!
//! This crate provides the `wl` daemon runner and the query commands.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, Paging};
pub use config::Config;
