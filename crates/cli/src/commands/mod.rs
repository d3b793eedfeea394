//! Subcommand implementations.

pub mod account;
pub mod content;
pub mod shop;
