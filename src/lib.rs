//! # debug-ninja
//!
//! A one-shot diagnostic collector for Unix-like hosts.
//!
//! ## Overview
//!
//! debug-ninja runs a fixed set of probes (system commands, log file copies,
//! configuration file copies), stages their output in a directory under
//! `$TMPDIR`, and packs that directory into a single tar.gz for offline
//! troubleshooting. Every executed probe leaves a metadata record with its
//! invocation and exit status, so the archive says both what was collected
//! and what could not be.
//!
//! ## Usage
//!
//! ```no_run
//! use debug_ninja::cli::Args;
//! use debug_ninja::collectors::PathLookup;
//! use debug_ninja::config::RunConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! if let Some(args) = Args::parse_argv(["debug-ninja", "-l"])? {
//!     let config = RunConfig::from_args(&args)?;
//!     let stats = debug_ninja::run::execute(&config, PathLookup, std::io::stderr())?;
//!     println!("{} probes executed", stats.executed);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: Probe plans and run configuration
//! - [`staging`]: The staging directory a run writes into
//! - [`collectors`]: Probe execution, platform policies and metadata records
//! - [`utils`]: Archive creation
//! - [`run`]: A complete run, from staging to archive
//! - [`error`]: Errors that abort a run
//! - [`constants`]: Names and layout shared across modules

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Probe execution and category collection
pub mod collectors;

/// Archive creation
pub mod utils;

/// Probe plans and run configuration
pub mod config;

/// Staging tree ownership
pub mod staging;

/// End-to-end run orchestration
pub mod run;

/// Fatal error taxonomy
pub mod error;

/// Application constants and layout names
pub mod constants;
