//! Output utilities.
//!
//! ### Archiving a Staging Tree
//!
//! ```no_run
//! use debug_ninja::config::OutputTarget;
//! use debug_ninja::staging::StagingTree;
//! use debug_ninja::utils::archive::archive;
//! use std::path::{Path, PathBuf};
//!
//! # fn example() -> debug_ninja::error::Result<()> {
//! let tree = StagingTree::create(Path::new("/tmp"), "web01-debug-ninja")?;
//! archive(&tree, &OutputTarget::File(PathBuf::from("web01-debug-ninja.tar.gz")))?;
//! # Ok(())
//! # }
//! ```

/// tar.gz archive creation
pub mod archive;
