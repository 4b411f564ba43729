//! Subcommand implementations, one module per `Commands` variant body.

/// `bulletin`/`cve`: CVE/exploitation summary printing.
pub mod bulletin;
/// `gather`/`fetch`/`build`/`rss`/`all`: stage-running subcommands.
pub mod run_stage;
