//! One collection run, from staging to archive.

use std::io::Write;
use std::time::Instant;

use log::{error, info, warn};

use crate::collectors::{collect_categories, CollectionStats, CommandLookup, HostRoot, ProbeRunner};
use crate::config::RunConfig;
use crate::error::Result;
use crate::staging::StagingTree;
use crate::utils::archive::archive;

/// Run a full collection described by `config`.
///
/// The output target is checked before anything is created. The staging
/// tree is removed once the archive is complete; if archiving fails it is
/// left in place so nothing collected is lost.
pub fn execute<L: CommandLookup, W: Write>(
    config: &RunConfig,
    lookup: L,
    progress: W,
) -> Result<CollectionStats> {
    let start = Instant::now();
    config.output.ensure_available()?;

    let tree = StagingTree::create(&config.tmp_root, &config.staging_name())?;
    let host = HostRoot::new(&config.host_root);
    let mut runner = ProbeRunner::new(lookup, progress);

    let stats = match collect_categories(&config.selection.categories(), &tree, &host, &mut runner) {
        Ok(stats) => stats,
        Err(e) => {
            discard(tree);
            return Err(e);
        }
    };
    info!(
        "Collected {} probes ({} failed, {} skipped)",
        stats.executed, stats.failed, stats.skipped
    );

    if let Err(e) = archive(&tree, &config.output) {
        error!("Archiving failed, collected data kept in {}", tree.root().display());
        return Err(e);
    }

    discard(tree);
    info!("Run finished in {:?}", start.elapsed());
    Ok(stats)
}

fn discard(tree: StagingTree) {
    let root = tree.root().to_path_buf();
    if let Err(e) = tree.remove() {
        warn!("Cannot remove staging tree {}: {}", root.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::lookup::MockCommandLookup;
    use crate::config::{OutputTarget, Selection};
    use crate::error::NinjaError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn logs_only(tmp_root: &Path, host_root: &Path, output: OutputTarget) -> RunConfig {
        RunConfig {
            selection: Selection::from_flags(false, true, false, false),
            output,
            tmp_root: tmp_root.to_path_buf(),
            hostname: "box".to_string(),
            host_root: host_root.to_path_buf(),
        }
    }

    fn no_tools() -> MockCommandLookup {
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().returning(|_| None);
        lookup
    }

    #[test]
    fn test_run_removes_staging_tree() {
        let tmp = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().join("box.tar.gz");
        let config = logs_only(tmp.path(), host.path(), OutputTarget::File(output.clone()));

        let stats = execute(&config, no_tools(), Vec::new()).unwrap();

        assert_eq!(stats.executed, 0);
        assert!(output.is_file());
        assert!(!tmp.path().join("box-debug-ninja").exists());
    }

    #[test]
    fn test_existing_output_aborts_before_staging() {
        let tmp = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().join("box.tar.gz");
        fs::write(&output, b"keep").unwrap();
        let config = logs_only(tmp.path(), host.path(), OutputTarget::File(output.clone()));

        let err = execute(&config, MockCommandLookup::new(), Vec::new()).unwrap_err();

        assert!(matches!(err, NinjaError::OutputExists(_)));
        assert!(!tmp.path().join("box-debug-ninja").exists());
        assert_eq!(fs::read(&output).unwrap(), b"keep");
    }

    #[test]
    fn test_existing_staging_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let leftover = tmp.path().join("box-debug-ninja");
        fs::create_dir(&leftover).unwrap();
        fs::write(leftover.join("old"), b"earlier run").unwrap();
        let output = out.path().join("box.tar.gz");
        let config = logs_only(tmp.path(), host.path(), OutputTarget::File(output.clone()));

        let err = execute(&config, MockCommandLookup::new(), Vec::new()).unwrap_err();

        assert!(matches!(err, NinjaError::StagingExists(_)));
        assert_eq!(fs::read(leftover.join("old")).unwrap(), b"earlier run");
        assert!(!output.exists());
    }

    #[test]
    fn test_collection_failure_removes_staging_tree() {
        let tmp = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();
        fs::create_dir_all(host.path().join("proc")).unwrap();
        fs::write(host.path().join("proc/cpuinfo"), "processor\t: 0\n").unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().join("box.tar.gz");
        let mut config = logs_only(tmp.path(), host.path(), OutputTarget::File(output.clone()));
        config.selection = Selection::from_flags(true, false, false, false);

        // Commands run before file copies; block files/ while they are looked up
        let blocker = tmp.path().join("box-debug-ninja/files");
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().returning(move |_| {
            if !blocker.exists() {
                fs::write(&blocker, b"in the way").unwrap();
            }
            None
        });

        let err = execute(&config, lookup, Vec::new()).unwrap_err();

        assert!(matches!(err, NinjaError::CreateDir { .. }));
        assert!(!tmp.path().join("box-debug-ninja").exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_failed_archive_keeps_staging_tree() {
        let tmp = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();
        fs::create_dir_all(host.path().join("var/log")).unwrap();
        fs::write(host.path().join("var/log/syslog"), "boot\n").unwrap();
        let output = tmp.path().join("no-such-dir/box.tar.gz");
        let config = logs_only(tmp.path(), host.path(), OutputTarget::File(output.clone()));

        let err = execute(&config, no_tools(), Vec::new()).unwrap_err();

        assert!(matches!(err, NinjaError::Archive(_)));
        assert!(tmp
            .path()
            .join("box-debug-ninja/files/var/log/syslog")
            .is_file());
        assert!(!output.exists());
    }
}
