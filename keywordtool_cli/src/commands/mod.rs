//! CLI subcommand implementations.

pub mod analyze;
pub mod credentials;
