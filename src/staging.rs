//! Staging tree builder.
//!
//! The staging tree is the on-disk directory the probes write into before it
//! is archived. Its root is `<tmp-root>/<hostname>-debug-ninja`. Finding that
//! root already present aborts the run: another collection may be using it,
//! or it is left over from one that failed and still holds its data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::constants::INFO_DIR;
use crate::error::{NinjaError, Result};

/// Exclusive owner of one run's staging directory
#[derive(Debug)]
pub struct StagingTree {
    root: PathBuf,
    name: String,
}

impl StagingTree {
    /// Create the staging root `tmp_root/name`.
    ///
    /// The root itself is created non-recursively so that a pre-existing
    /// directory is detected atomically. `tmp_root` must already exist; a
    /// missing one fails with the staging path named.
    pub fn create(tmp_root: &Path, name: &str) -> Result<Self> {
        let root = tmp_root.join(name);
        match fs::create_dir(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(NinjaError::StagingExists(root));
            }
            Err(e) => return Err(NinjaError::create_dir(&root, e)),
        }

        info!("Staging tree created at {}", root.display());
        Ok(StagingTree {
            root,
            name: name.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name of the root, also the top-level name inside the archive
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of a path relative to the root
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Create `relative` (and its parents) under the root. Idempotent.
    pub fn ensure_dir(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.path(relative);
        if !path.is_dir() {
            fs::create_dir_all(&path).map_err(|e| NinjaError::create_dir(&path, e))?;
            debug!("Created {}", path.display());
        }
        Ok(path)
    }

    /// Create an output subtree together with its `.info` companion.
    ///
    /// Returns the `.info` directory.
    pub fn ensure_subtree(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let subtree = self.ensure_dir(relative)?;
        let info = subtree.join(INFO_DIR);
        if !info.is_dir() {
            fs::create_dir(&info).map_err(|e| NinjaError::create_dir(&info, e))?;
        }
        Ok(info)
    }

    /// Recursively delete the tree
    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.root)?;
        debug!("Removed staging tree {}", self.root.display());
        Ok(())
    }
}
