use std::ffi::OsString;

use clap::Parser;

use crate::constants::STDOUT_MARKER;
use crate::error::{NinjaError, Result};

/// Command-line arguments for debug-ninja.
///
/// Category flags may be combined freely; with none given the system
/// commands, logs and configuration categories are collected. The optional
/// positional argument names the archive, or `-` to stream it to stdout, and
/// must come last.
#[derive(Parser, Debug)]
#[clap(
    name = "debug-ninja",
    about = "Collect system diagnostics, logs and configuration into one tar.gz"
)]
pub struct Args {
    /// Collect output of system inspection commands and /proc entries
    #[clap(short, long)]
    pub syscmds: bool,

    /// Collect configuration files
    #[clap(short, long)]
    pub cfgs: bool,

    /// Collect log files
    #[clap(short, long)]
    pub logs: bool,

    /// Collect extra, slower diagnostics (not part of the default set)
    #[clap(short, long)]
    pub extra: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Archive path, or "-" for standard output (default: ./<hostname>-debug-ninja.tar.gz)
    #[clap(value_name = "FILENAME")]
    pub filename: Option<String>,
}

impl Args {
    /// Parse a full argv, mapping every failure to [`NinjaError::Usage`].
    ///
    /// Returns `Ok(None)` when help was requested and has already been printed.
    pub fn parse_argv<I, T>(argv: I) -> Result<Option<Args>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        check_positional_last(&argv)?;

        match Args::try_parse_from(&argv) {
            Ok(args) => Ok(Some(args)),
            Err(e) => match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    e.print().map_err(|io| NinjaError::Usage(io.to_string()))?;
                    Ok(None)
                }
                _ => Err(NinjaError::Usage(e.render().to_string().trim_end().to_string())),
            },
        }
    }
}

/// Reject a positional argument that is not the last one.
///
/// clap accepts positionals anywhere, so `debug-ninja out.tgz -l` would
/// otherwise parse. The argument after a positional is also refused when it
/// is a second positional, which keeps the message about ordering rather
/// than arity.
pub fn check_positional_last(argv: &[OsString]) -> Result<()> {
    let mut positional: Option<&OsString> = None;

    for arg in argv.iter().skip(1) {
        if let Some(previous) = positional {
            return Err(NinjaError::Usage(format!(
                "FILENAME ({}) must be the last argument, found {} after it",
                previous.to_string_lossy(),
                arg.to_string_lossy()
            )));
        }
        if is_positional(arg) {
            positional = Some(arg);
        }
    }

    Ok(())
}

fn is_positional(arg: &OsString) -> bool {
    let text = arg.to_string_lossy();
    text == STDOUT_MARKER || !text.starts_with('-')
}
