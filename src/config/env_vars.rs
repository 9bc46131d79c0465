use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::constants::{DEFAULT_TMP_ROOT, TMPDIR_ENV};

/// Staging location taken from `TMPDIR`, falling back to `/tmp`
pub fn tmp_root() -> PathBuf {
    tmp_root_from(env::var_os(TMPDIR_ENV))
}

/// Resolve the staging location from a raw `TMPDIR` value.
///
/// An unset or empty variable means the default. Trailing separators are
/// harmless since the value is only ever joined onto.
pub fn tmp_root_from(value: Option<OsString>) -> PathBuf {
    match value {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_TMP_ROOT),
    }
}
