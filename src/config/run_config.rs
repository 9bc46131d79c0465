use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::cli::Args;
use crate::config::env_vars;
use crate::config::probes::Category;
use crate::constants::{ARCHIVE_EXTENSION, DEFAULT_HOST_ROOT, STAGING_SUFFIX, STDOUT_MARKER};
use crate::error::{NinjaError, Result};

/// Which categories a run collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub syscmds: bool,
    pub logs: bool,
    pub cfgs: bool,
    pub extra: bool,
}

impl Selection {
    /// Selection used when no category flag is given
    pub const DEFAULT: Selection = Selection {
        syscmds: true,
        logs: true,
        cfgs: true,
        extra: false,
    };

    /// Build from the four category flags; all-false means [`Selection::DEFAULT`]
    pub fn from_flags(syscmds: bool, logs: bool, cfgs: bool, extra: bool) -> Self {
        let requested = Selection {
            syscmds,
            logs,
            cfgs,
            extra,
        };
        if requested.is_empty() {
            Self::DEFAULT
        } else {
            requested
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.syscmds || self.logs || self.cfgs || self.extra)
    }

    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::SysCmds => self.syscmds,
            Category::Logs => self.logs,
            Category::Cfgs => self.cfgs,
            Category::Extra => self.extra,
        }
    }

    /// Selected categories in collection order
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .iter()
            .copied()
            .filter(|c| self.contains(*c))
            .collect()
    }
}

/// Where the archive goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl OutputTarget {
    /// Resolve the positional argument.
    ///
    /// `-` selects standard output. No argument means
    /// `<cwd>/<staging name>.tar.gz`. A relative path is taken relative to `cwd`.
    pub fn resolve(arg: Option<&str>, cwd: &Path, staging_name: &str) -> Self {
        match arg {
            Some(STDOUT_MARKER) => OutputTarget::Stdout,
            Some(path) => OutputTarget::File(cwd.join(path)),
            None => OutputTarget::File(cwd.join(format!("{}.{}", staging_name, ARCHIVE_EXTENSION))),
        }
    }

    /// Fail if the archive would overwrite an existing file
    pub fn ensure_available(&self) -> Result<()> {
        match self {
            OutputTarget::File(path) if path.exists() => Err(NinjaError::OutputExists(path.clone())),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => write!(f, "{}", path.display()),
            OutputTarget::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// Immutable configuration for one run, assembled once from the command line
/// and the environment
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub selection: Selection,
    pub output: OutputTarget,
    /// Directory the staging tree is created in
    pub tmp_root: PathBuf,
    pub hostname: String,
    /// Prefix file probes are resolved against
    pub host_root: PathBuf,
}

impl RunConfig {
    /// Assemble from parsed arguments, the real hostname, cwd and `TMPDIR`
    pub fn from_args(args: &Args) -> Result<Self> {
        let hostname = hostname::get()
            .map_err(NinjaError::Hostname)?
            .to_string_lossy()
            .to_string();
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let config = Self::build(args, hostname, &cwd, env_vars::tmp_root());
        debug!("Run configuration: {:?}", config);
        Ok(config)
    }

    /// Assemble from explicit inputs
    pub fn build(args: &Args, hostname: String, cwd: &Path, tmp_root: PathBuf) -> Self {
        let selection = Selection::from_flags(args.syscmds, args.logs, args.cfgs, args.extra);
        let output = OutputTarget::resolve(args.filename.as_deref(), cwd, &staging_name(&hostname));
        RunConfig {
            selection,
            output,
            tmp_root,
            hostname,
            host_root: PathBuf::from(DEFAULT_HOST_ROOT),
        }
    }

    pub fn staging_name(&self) -> String {
        staging_name(&self.hostname)
    }
}

/// `<hostname>-debug-ninja`, used for the staging root and the archive
pub fn staging_name(hostname: &str) -> String {
    format!("{}{}", hostname, STAGING_SUFFIX)
}
