//! CLI subcommand implementations.

pub mod day;
pub mod days;
pub mod run;
pub mod sessions;
pub mod status;
pub mod today;
mod util;
pub mod week;
