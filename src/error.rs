//! Fatal error taxonomy.
//!
//! Only conditions that must stop the whole run live here. A probe that fails
//! or is missing is never an error: it is recorded (or skipped) by the
//! collectors and the run carries on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for operations that can abort the run
pub type Result<T> = std::result::Result<T, NinjaError>;

/// Errors that abort a collection run
#[derive(Error, Debug)]
pub enum NinjaError {
    /// Malformed command line. The message is already rendered for the user.
    #[error("{0}")]
    Usage(String),

    #[error("staging directory {} already exists, remove it or set TMPDIR elsewhere", .0.display())]
    StagingExists(PathBuf),

    #[error("output file {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write archive: {0}")]
    Archive(#[source] io::Error),

    #[error("cannot determine hostname: {0}")]
    Hostname(#[source] io::Error),
}

impl NinjaError {
    /// Wrap a directory-creation failure with the offending path
    pub fn create_dir(path: impl Into<PathBuf>, source: io::Error) -> Self {
        NinjaError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
