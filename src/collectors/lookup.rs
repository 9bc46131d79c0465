use std::path::PathBuf;

use log::debug;

/// Capability lookup: is a command available, and where.
///
/// Queried by the probe runner before every command probe. A `None` answer
/// means the probe is skipped without a trace.
#[cfg_attr(test, mockall::automock)]
pub trait CommandLookup {
    fn find(&self, program: &str) -> Option<PathBuf>;
}

/// Resolves programs through `PATH`
#[derive(Debug, Default, Clone, Copy)]
pub struct PathLookup;

impl CommandLookup for PathLookup {
    fn find(&self, program: &str) -> Option<PathBuf> {
        match which::which(program) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("{} not available: {}", program, e);
                None
            }
        }
    }
}
