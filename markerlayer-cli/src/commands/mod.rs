//! CLI subcommands.

pub mod modes;
pub mod run;
