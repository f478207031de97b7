//! CLI subcommands.

pub mod bulk;
pub mod common;
pub mod track;
