use std::io::Write;
use std::path::Path;

use log::{debug, info, warn};

use crate::collectors::lookup::CommandLookup;
use crate::collectors::platform::HostRoot;
use crate::collectors::recorder::ResultRecorder;
use crate::collectors::runner::{ProbeRunner, ProbeStatus};
use crate::config::{Category, ProbeKind, ProbeSpec, Step, LIMITS_D, SWAPCTL, SWAPON};
use crate::error::Result;
use crate::staging::StagingTree;

/// Counts for one or more category runs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    /// Probes that ran, successfully or not
    pub executed: usize,
    /// Executed probes with a nonzero status
    pub failed: usize,
    /// Probes skipped because their tool or source was absent
    pub skipped: usize,
}

impl CollectionStats {
    pub fn absorb(&mut self, other: CollectionStats) {
        self.executed += other.executed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Walks a category's plan, running each probe and recording its result
pub struct CategoryCollector<'a, L, W> {
    tree: &'a StagingTree,
    host: &'a HostRoot,
    runner: &'a mut ProbeRunner<L, W>,
    recorder: ResultRecorder,
}

impl<'a, L: CommandLookup, W: Write> CategoryCollector<'a, L, W> {
    pub fn new(tree: &'a StagingTree, host: &'a HostRoot, runner: &'a mut ProbeRunner<L, W>) -> Self {
        CategoryCollector {
            tree,
            host,
            runner,
            recorder: ResultRecorder::new(),
        }
    }

    /// Collect every step of `category` in order.
    ///
    /// Only a staging directory that cannot be created is an error.
    pub fn collect(&mut self, category: Category) -> Result<CollectionStats> {
        info!("Collecting {}", category);
        let mut stats = CollectionStats::default();

        for step in category.plan() {
            self.step(step, &mut stats)?;
        }

        debug!(
            "{}: {} executed, {} failed, {} skipped",
            category, stats.executed, stats.failed, stats.skipped
        );
        Ok(stats)
    }

    fn step(&mut self, step: &Step, stats: &mut CollectionStats) -> Result<()> {
        match step {
            Step::Probe(spec) => self.probe(spec, stats),
            Step::Swap => {
                let swapctl = self.runner.lookup().find("swapctl");
                match swapctl {
                    Some(program) => self.probe_with(&SWAPCTL, Some(program.as_path()), stats),
                    None => self.probe(&SWAPON, stats),
                }
            }
            Step::Iostat => {
                let spec = self.host.iostat_variant();
                self.probe(&spec, stats)
            }
            Step::Iptables(table) => {
                let spec = if self.host.module_loaded(table.module()) {
                    table.probe()
                } else {
                    info!("{} not loaded, not running iptables", table.module());
                    table.substitute()
                };
                self.probe(&spec, stats)
            }
            Step::LimitsDir => match LIMITS_D.kind {
                ProbeKind::CopyTree { source, extension }
                    if !self.host.has_files_with_extension(source, extension) =>
                {
                    debug!("No *.{} under {}, skipping", extension, source);
                    stats.skipped += 1;
                    Ok(())
                }
                _ => self.probe(&LIMITS_D, stats),
            },
        }
    }

    fn probe(&mut self, spec: &ProbeSpec, stats: &mut CollectionStats) -> Result<()> {
        self.probe_with(spec, None, stats)
    }

    /// Run `spec`, using `resolved` as the command's program when the
    /// lookup has already been made
    fn probe_with(
        &mut self,
        spec: &ProbeSpec,
        resolved: Option<&Path>,
        stats: &mut CollectionStats,
    ) -> Result<()> {
        if let Some(source) = spec.source() {
            if !self.host.exists(source) {
                debug!("{} absent, skipping {}", source, spec.label);
                stats.skipped += 1;
                return Ok(());
            }
        }

        let info_dir = self.tree.ensure_subtree(spec.subtree())?;
        let result = match (resolved, spec.kind) {
            (Some(program), ProbeKind::Command(argv)) => {
                let output = self.tree.path(spec.destination());
                self.runner.run_command_at(spec.label, argv, program, &output)
            }
            _ => self.runner.run(spec, self.host, self.tree),
        };

        match result.status {
            ProbeStatus::ToolNotFound => {
                stats.skipped += 1;
                return Ok(());
            }
            ProbeStatus::Exited(_) => {
                stats.executed += 1;
                if !result.success {
                    stats.failed += 1;
                }
            }
        }

        if let Err(e) = self.recorder.record(&info_dir, &result) {
            warn!("Cannot write record for {}: {}", spec.label, e);
        }

        // Records only explain failures of copies
        if result.success && spec.source().is_some() {
            if let Err(e) = self.recorder.discard(&info_dir, &result.label) {
                warn!("Cannot remove record for {}: {}", spec.label, e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::lookup::MockCommandLookup;
    use crate::collectors::recorder::MetadataRecord;
    use crate::config::IptablesTable;
    use std::fs;
    use crate::error::NinjaError;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Lookup that resolves only the listed programs, through `PATH`
    fn lookup_allowing(allowed: &'static [&'static str]) -> MockCommandLookup {
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().returning(move |program| {
            if allowed.iter().any(|a| *a == program) {
                which::which(program).ok()
            } else {
                None
            }
        });
        lookup
    }

    struct Fixture {
        _host_dir: TempDir,
        _tmp_dir: TempDir,
        host: HostRoot,
        tree: StagingTree,
    }

    impl Fixture {
        fn new() -> Self {
            let host_dir = TempDir::new().unwrap();
            let tmp_dir = TempDir::new().unwrap();
            let host = HostRoot::new(host_dir.path());
            let tree = StagingTree::create(tmp_dir.path(), "box-debug-ninja").unwrap();
            Fixture {
                _host_dir: host_dir,
                _tmp_dir: tmp_dir,
                host,
                tree,
            }
        }

        fn host_file(&self, path: &str, contents: &str) {
            let full = self.host.resolve(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }

        fn staged(&self, relative: &str) -> PathBuf {
            self.tree.path(relative)
        }
    }

    fn record_at(path: &Path) -> MetadataRecord {
        MetadataRecord::read(path).unwrap().unwrap()
    }

    #[test]
    fn test_logs_copied_and_records_discarded() {
        let fx = Fixture::new();
        fx.host_file("/var/log/syslog", "Jan 1 host kernel: up\n");
        let mut runner = ProbeRunner::new(lookup_allowing(&[]), Vec::new());

        let stats = CategoryCollector::new(&fx.tree, &fx.host, &mut runner)
            .collect(Category::Logs)
            .unwrap();

        assert_eq!(
            fs::read_to_string(fx.staged("files/var/log/syslog")).unwrap(),
            "Jan 1 host kernel: up\n"
        );
        assert!(!fx.staged("files/var/log/.info/cp_syslog").exists());
        assert!(!fx.staged("files/var/log/.info/cp_messages").exists());
        assert!(!fx.staged("files/var/log/messages").exists());
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.skipped, Category::Logs.plan().len() - 1);
        assert_eq!(runner.progress(), b".");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_copy_is_recorded() {
        let fx = Fixture::new();
        // A directory where a file is expected cannot be copied
        fs::create_dir_all(fx.host.resolve("/etc/fstab")).unwrap();
        let mut runner = ProbeRunner::new(lookup_allowing(&[]), Vec::new());

        let stats = CategoryCollector::new(&fx.tree, &fx.host, &mut runner)
            .collect(Category::Cfgs)
            .unwrap();

        assert_eq!(stats.failed, 1);
        assert!(!fx.staged("files/etc/fstab").exists());
        let record = record_at(&fx.staged("files/etc/.info/cp_fstab"));
        assert_eq!(record.exit_status, 1);
        assert!(record.invocation.starts_with("cp "));
        assert_eq!(runner.progress(), b"E");
    }

    #[test]
    fn test_iptables_substituted_without_modules() {
        let fx = Fixture::new();
        fx.host_file("/proc/modules", "ext4 1081344 2 - Live 0x0\n");
        let mut runner = ProbeRunner::new(lookup_allowing(&["echo", "iptables"]), Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector
            .step(&Step::Iptables(IptablesTable::Filter), &mut stats)
            .unwrap();
        collector
            .step(&Step::Iptables(IptablesTable::Nat), &mut stats)
            .unwrap();

        for table in [IptablesTable::Filter, IptablesTable::Nat] {
            let label = table.probe().label;
            let record = record_at(&fx.staged(&format!("commands/.info/{}", label)));
            assert!(record.invocation.starts_with("echo "));
            assert!(!record.invocation.contains("iptables -"));
            assert_eq!(record.exit_status, 0);
            let output = fs::read_to_string(fx.staged(&format!("commands/{}", label))).unwrap();
            assert!(output.contains(table.module()));
        }
    }

    #[test]
    fn test_iptables_runs_when_module_loaded() {
        let fx = Fixture::new();
        fx.host_file(
            "/proc/modules",
            "iptable_filter 16384 1 - Live 0x0\nip_tables 32768 1 iptable_filter, Live 0x0\n",
        );
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().returning(|program| {
            assert_eq!(program, "iptables", "only the real iptables may be resolved");
            None
        });
        let mut runner = ProbeRunner::new(lookup, Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector
            .step(&Step::Iptables(IptablesTable::Filter), &mut stats)
            .unwrap();

        // iptables absent in the lookup: silently skipped, no record
        assert_eq!(stats.skipped, 1);
        assert!(!fx.staged("commands/.info/iptables_filter").exists());
    }

    #[test]
    fn test_nat_runs_when_conntrack_loaded() {
        let fx = Fixture::new();
        fx.host_file(
            "/proc/modules",
            "nf_conntrack 172032 1 nf_nat, Live 0x0\next4 1081344 2 - Live 0x0\n",
        );
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().times(1).returning(|program| {
            assert_eq!(program, "iptables", "only the real iptables may be resolved");
            which::which("true").ok()
        });
        let mut runner = ProbeRunner::new(lookup, Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector
            .step(&Step::Iptables(IptablesTable::Nat), &mut stats)
            .unwrap();

        assert_eq!(stats.executed, 1);
        let record = record_at(&fx.staged("commands/.info/iptables_nat"));
        assert_eq!(record.invocation, "iptables -t nat -L -n -v");
        assert_eq!(record.exit_status, 0);
    }

    #[test]
    fn test_blocked_subtree_aborts_collection() {
        let fx = Fixture::new();
        fx.host_file("/var/log/syslog", "Jan 1 host kernel: up\n");
        // A file where the files/ subtree belongs
        fs::write(fx.staged("files"), b"in the way").unwrap();
        let mut runner = ProbeRunner::new(lookup_allowing(&[]), Vec::new());

        let result = CategoryCollector::new(&fx.tree, &fx.host, &mut runner).collect(Category::Logs);

        match result {
            Err(NinjaError::CreateDir { path, .. }) => {
                assert!(path.starts_with(fx.staged("files")), "{}", path.display())
            }
            other => panic!("expected CreateDir, got {:?}", other),
        }
        assert!(runner.progress().is_empty());
    }

    #[test]
    fn test_exactly_one_iostat_variant() {
        let fx = Fixture::new();
        fx.host_file("/proc/diskstats", "");
        // Stand in for iostat with sh so the probe actually runs
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().returning(|program| {
            assert_eq!(program, "iostat");
            which::which("true").ok()
        });
        let mut runner = ProbeRunner::new(lookup, Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector.step(&Step::Iostat, &mut stats).unwrap();

        assert_eq!(stats.executed, 1);
        let record = record_at(&fx.staged("commands/.info/iostat"));
        assert_eq!(record.invocation, "iostat -x 5 2");
    }

    #[test]
    fn test_swapctl_preferred() {
        let fx = Fixture::new();
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().times(1).returning(|program| {
            assert_eq!(program, "swapctl", "swap tool must be resolved once");
            which::which("true").ok()
        });
        let mut runner = ProbeRunner::new(lookup, Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector.step(&Step::Swap, &mut stats).unwrap();

        assert_eq!(stats.executed, 1);
        assert_eq!(record_at(&fx.staged("commands/.info/swap")).invocation, "swapctl -l");
    }

    #[test]
    fn test_swapon_without_swapctl() {
        let fx = Fixture::new();
        let mut lookup = MockCommandLookup::new();
        lookup.expect_find().returning(|program| match program {
            "swapon" => which::which("true").ok(),
            _ => None,
        });
        let mut runner = ProbeRunner::new(lookup, Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector.step(&Step::Swap, &mut stats).unwrap();

        assert_eq!(record_at(&fx.staged("commands/.info/swap")).invocation, "swapon -s");
    }

    #[test]
    fn test_limits_d_mirrored_into_config() {
        let fx = Fixture::new();
        fx.host_file("/etc/security/limits.conf", "* soft core 0\n");
        fx.host_file("/etc/security/limits.d/90-nproc.conf", "* soft nproc 4096\n");
        fx.host_file("/etc/security/limits.d/README", "not a conf\n");
        let mut runner = ProbeRunner::new(lookup_allowing(&[]), Vec::new());

        CategoryCollector::new(&fx.tree, &fx.host, &mut runner)
            .collect(Category::Cfgs)
            .unwrap();

        assert!(fx.staged("files/etc/security/limits.conf").exists());
        assert!(fx.staged("config/etc/security/limits.d/90-nproc.conf").exists());
        assert!(!fx.staged("config/etc/security/limits.d/README").exists());
        assert!(fx.staged("config/etc/security/.info").is_dir());
        assert!(!fx.staged("config/etc/security/.info/cp_limits.d").exists());
    }

    #[test]
    fn test_limits_d_without_conf_is_skipped() {
        let fx = Fixture::new();
        fx.host_file("/etc/security/limits.d/README", "nothing here\n");
        let mut runner = ProbeRunner::new(lookup_allowing(&[]), Vec::new());
        let mut collector = CategoryCollector::new(&fx.tree, &fx.host, &mut runner);
        let mut stats = CollectionStats::default();

        collector.step(&Step::LimitsDir, &mut stats).unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(!fx.staged("config").exists());
    }

    #[test]
    fn test_missing_commands_leave_no_trace() {
        let fx = Fixture::new();
        let mut runner = ProbeRunner::new(lookup_allowing(&[]), Vec::new());

        let stats = CategoryCollector::new(&fx.tree, &fx.host, &mut runner)
            .collect(Category::Extra)
            .unwrap();

        assert_eq!(stats.executed, 0);
        assert_eq!(stats.skipped, Category::Extra.plan().len());
        let records: Vec<_> = fs::read_dir(fx.staged("commands/.info")).unwrap().collect();
        assert!(records.is_empty());
        assert!(runner.progress().is_empty());
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = CollectionStats {
            executed: 2,
            failed: 1,
            skipped: 3,
        };
        total.absorb(CollectionStats {
            executed: 1,
            failed: 0,
            skipped: 4,
        });
        assert_eq!(
            total,
            CollectionStats {
                executed: 3,
                failed: 1,
                skipped: 7
            }
        );
    }
}
