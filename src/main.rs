use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use debug_ninja::cli::Args;
use debug_ninja::collectors::PathLookup;
use debug_ninja::config::RunConfig;
use debug_ninja::error::NinjaError;
use debug_ninja::run;

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<NinjaError>() {
                // clap has already rendered usage text
                Some(NinjaError::Usage(message)) => eprintln!("{}", message),
                Some(err) => eprintln!("debug-ninja: {}", err),
                None => eprintln!("debug-ninja: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> Result<()> {
    // Parse arguments; help output ends the run successfully
    let args = match Args::parse_argv(std::env::args_os())? {
        Some(args) => args,
        None => return Ok(()),
    };

    initialize_logging(args.verbose)?;

    let config = RunConfig::from_args(&args)?;
    info!("Collecting {:?} into {}", config.selection.categories(), config.output);

    // Progress shares stderr with the logs so stdout stays free for the archive
    let stats = run::execute(&config, PathLookup, io::stderr())?;
    info!(
        "{} probes executed, {} failed, {} skipped",
        stats.executed, stats.failed, stats.skipped
    );

    eprintln!("\n{}", config.output);
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}
