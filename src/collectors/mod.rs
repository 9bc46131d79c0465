//! Probe execution and collection.
//!
//! Collection is layered bottom-up:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          collect_categories             │
//! ├─────────────────────────────────────────┤
//! │   CategoryCollector (plan + policies)   │
//! ├───────────────────┬─────────────────────┤
//! │   ProbeRunner     │   ResultRecorder    │
//! ├───────────────────┼─────────────────────┤
//! │   CommandLookup   │   HostRoot          │
//! └───────────────────┴─────────────────────┘
//! ```
//!
//! Probes never fail the run. The only collection-phase error is a staging
//! directory that cannot be created.
//!
//! ## Usage Example
//!
//! ```no_run
//! use debug_ninja::collectors::{collect_categories, HostRoot, PathLookup, ProbeRunner};
//! use debug_ninja::config::Category;
//! use debug_ninja::staging::StagingTree;
//! use std::path::Path;
//!
//! # fn example() -> debug_ninja::error::Result<()> {
//! let tree = StagingTree::create(Path::new("/tmp"), "web01-debug-ninja")?;
//! let mut runner = ProbeRunner::new(PathLookup, std::io::stderr());
//! let stats = collect_categories(&[Category::Logs], &tree, &HostRoot::system(), &mut runner)?;
//! println!("{} probes executed", stats.executed);
//! # Ok(())
//! # }
//! ```

use std::io::Write;

use crate::config::Category;
use crate::error::Result;
use crate::staging::StagingTree;

pub mod category;
pub mod lookup;
pub mod platform;
pub mod recorder;
pub mod runner;

pub use category::{CategoryCollector, CollectionStats};
pub use lookup::{CommandLookup, PathLookup};
pub use platform::HostRoot;
pub use recorder::{MetadataRecord, ResultRecorder};
pub use runner::{ProbeResult, ProbeRunner, ProbeStatus};

/// Collect `categories` in the order given into `tree`
pub fn collect_categories<L: CommandLookup, W: Write>(
    categories: &[Category],
    tree: &StagingTree,
    host: &HostRoot,
    runner: &mut ProbeRunner<L, W>,
) -> Result<CollectionStats> {
    let mut total = CollectionStats::default();
    for category in categories {
        let stats = CategoryCollector::new(tree, host, runner).collect(*category)?;
        total.absorb(stats);
    }
    Ok(total)
}
