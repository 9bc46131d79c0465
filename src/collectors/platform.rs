use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::config::{ProbeSpec, IOSTAT_BSD, IOSTAT_LINUX, IOSTAT_SOLARIS};
use crate::constants::{DEFAULT_HOST_ROOT, DISKSTATS_PATH, PROC_MODULES_PATH, PROC_PATH};

/// Filesystem prefix that file probes and platform markers are resolved
/// against. `/` on a live system.
#[derive(Debug, Clone)]
pub struct HostRoot {
    root: PathBuf,
}

impl HostRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HostRoot { root: root.into() }
    }

    pub fn system() -> Self {
        HostRoot::new(DEFAULT_HOST_ROOT)
    }

    /// Map an absolute system path onto this root
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    /// Pick the iostat flavour from the platform markers.
    ///
    /// `/proc/diskstats` only exists on Linux. A `/proc` without it is
    /// Solaris or illumos. No `/proc` at all is treated as BSD.
    pub fn iostat_variant(&self) -> ProbeSpec {
        if self.exists(DISKSTATS_PATH) {
            IOSTAT_LINUX
        } else if self.exists(PROC_PATH) {
            IOSTAT_SOLARIS
        } else {
            IOSTAT_BSD
        }
    }

    /// Whether `module` appears in the loaded-module list.
    ///
    /// An unreadable list counts as not loaded, so callers fall back to the
    /// side-effect-free path.
    pub fn module_loaded(&self, module: &str) -> bool {
        let modules = match fs::read_to_string(self.resolve(PROC_MODULES_PATH)) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("Cannot read module list: {}", e);
                return false;
            }
        };
        modules
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .any(|name| name == module)
    }

    /// Whether the directory at `path` holds at least one file with
    /// `extension`, at any depth
    pub fn has_files_with_extension(&self, path: &str, extension: &str) -> bool {
        let dir = self.resolve(path);
        if !dir.is_dir() {
            return false;
        }
        WalkDir::new(&dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_type().is_file() && has_extension(entry.path(), extension))
    }
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension() == Some(OsStr::new(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve() {
        let host = HostRoot::new("/srv/fixture");
        assert_eq!(host.resolve("/etc/hosts"), PathBuf::from("/srv/fixture/etc/hosts"));
        assert_eq!(HostRoot::system().resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_iostat_linux() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("proc")).unwrap();
        fs::write(root.path().join("proc/diskstats"), b"").unwrap();

        assert_eq!(HostRoot::new(root.path()).iostat_variant(), IOSTAT_LINUX);
    }

    #[test]
    fn test_iostat_solaris() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("proc")).unwrap();

        assert_eq!(HostRoot::new(root.path()).iostat_variant(), IOSTAT_SOLARIS);
    }

    #[test]
    fn test_iostat_bsd() {
        let root = TempDir::new().unwrap();
        assert_eq!(HostRoot::new(root.path()).iostat_variant(), IOSTAT_BSD);
    }

    #[test]
    fn test_module_loaded() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("proc")).unwrap();
        fs::write(
            root.path().join("proc/modules"),
            "nf_conntrack 172032 1 nf_nat, Live 0x0000000000000000\n\
             ext4 1081344 2 - Live 0x0000000000000000\n",
        )
        .unwrap();
        let host = HostRoot::new(root.path());

        assert!(host.module_loaded("nf_conntrack"));
        assert!(host.module_loaded("ext4"));
        assert!(!host.module_loaded("iptable_filter"));
        // Names must match whole tokens
        assert!(!host.module_loaded("nf_conn"));
    }

    #[test]
    fn test_module_list_missing() {
        let root = TempDir::new().unwrap();
        assert!(!HostRoot::new(root.path()).module_loaded("iptable_filter"));
    }

    #[test]
    fn test_has_files_with_extension() {
        let root = TempDir::new().unwrap();
        let limits = root.path().join("etc/security/limits.d");
        fs::create_dir_all(&limits).unwrap();
        let host = HostRoot::new(root.path());

        assert!(!host.has_files_with_extension("/etc/security/limits.d", "conf"));

        fs::write(limits.join("README"), b"notes").unwrap();
        assert!(!host.has_files_with_extension("/etc/security/limits.d", "conf"));

        fs::create_dir(limits.join("nested")).unwrap();
        fs::write(limits.join("nested/90-nproc.conf"), b"* soft nproc 4096").unwrap();
        assert!(host.has_files_with_extension("/etc/security/limits.d", "conf"));

        assert!(!host.has_files_with_extension("/etc/missing.d", "conf"));
    }
}
