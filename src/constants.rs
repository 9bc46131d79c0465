//! Global constants for debug-ninja.
//!
//! Directory names here define the layout inside the archive, so changing
//! any of them changes what downstream tooling sees.

/// Suffix appended to the hostname for the staging root and the archive name
pub const STAGING_SUFFIX: &str = "-debug-ninja";

/// Extension of the produced archive
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Positional argument that selects standard output for the archive
pub const STDOUT_MARKER: &str = "-";

// Staging tree layout
/// Command output subtree
pub const COMMANDS_DIR: &str = "commands";

/// Flat file copies (logs, configs, /proc entries)
pub const FILES_DIR: &str = "files";

/// Structure-preserving directory mirrors
pub const CONFIG_DIR: &str = "config";

/// Per-subtree metadata record directory
pub const INFO_DIR: &str = ".info";

/// Prefix of metadata records for file copies
pub const COPY_LABEL_PREFIX: &str = "cp_";

// Environment
/// Environment variable naming the staging location
pub const TMPDIR_ENV: &str = "TMPDIR";

/// Staging location when TMPDIR is unset or empty
pub const DEFAULT_TMP_ROOT: &str = "/tmp";

/// Filesystem root probes are resolved against in production
pub const DEFAULT_HOST_ROOT: &str = "/";

// Progress characters
pub const PROGRESS_OK: u8 = b'.';
pub const PROGRESS_FAILED: u8 = b'E';

// Exit statuses synthesised for probes that never produced one
/// Resolved command could not be spawned (shell convention)
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// In-process file copy failed
pub const EXIT_COPY_FAILED: i32 = 1;

/// Base added to a terminating signal number (shell convention)
pub const EXIT_SIGNAL_BASE: i32 = 128;

// Platform markers
pub const PROC_PATH: &str = "/proc";
pub const DISKSTATS_PATH: &str = "/proc/diskstats";
pub const PROC_MODULES_PATH: &str = "/proc/modules";

/// Extension of the files mirrored from limits.d
pub const LIMITS_CONF_EXTENSION: &str = "conf";
