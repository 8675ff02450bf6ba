//! Command-line client for server-hosted terminals.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
