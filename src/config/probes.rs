//! Static probe plans.
//!
//! Every category maps to a fixed ordered list of [`Step`]s. Most steps are
//! plain probes; the few that need a runtime decision (swap tool, iostat
//! flavour, iptables safety, limits.d mirroring) are named policy steps and
//! resolved by the category collector.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{COMMANDS_DIR, CONFIG_DIR, FILES_DIR, LIMITS_CONF_EXTENSION};

/// How a probe gathers its data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Run an external command; the first element is the program name
    Command(&'static [&'static str]),
    /// Copy one file byte for byte
    CopyFile(&'static str),
    /// Mirror a directory, keeping only files with the given extension
    CopyTree {
        source: &'static str,
        extension: &'static str,
    },
}

/// One unit of collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSpec {
    pub label: &'static str,
    pub kind: ProbeKind,
}

impl ProbeSpec {
    pub const fn command(label: &'static str, argv: &'static [&'static str]) -> Self {
        ProbeSpec {
            label,
            kind: ProbeKind::Command(argv),
        }
    }

    pub const fn file(label: &'static str, source: &'static str) -> Self {
        ProbeSpec {
            label,
            kind: ProbeKind::CopyFile(source),
        }
    }

    pub const fn tree(label: &'static str, source: &'static str, extension: &'static str) -> Self {
        ProbeSpec {
            label,
            kind: ProbeKind::CopyTree { source, extension },
        }
    }

    /// Source path for copy probes, `None` for commands
    pub fn source(&self) -> Option<&'static str> {
        match self.kind {
            ProbeKind::Command(_) => None,
            ProbeKind::CopyFile(source) => Some(source),
            ProbeKind::CopyTree { source, .. } => Some(source),
        }
    }

    /// Staging subtree (relative to the staging root) the probe writes into.
    ///
    /// The subtree's `.info` directory holds the probe's metadata record.
    /// Commands share `commands/`; file copies land under `files/` at their
    /// source's parent path; tree mirrors land under `config/` the same way.
    pub fn subtree(&self) -> PathBuf {
        match self.kind {
            ProbeKind::Command(_) => PathBuf::from(COMMANDS_DIR),
            ProbeKind::CopyFile(source) => mirrored_parent(FILES_DIR, source),
            ProbeKind::CopyTree { source, .. } => mirrored_parent(CONFIG_DIR, source),
        }
    }

    /// Relative path of the probe's output inside the staging tree
    pub fn destination(&self) -> PathBuf {
        let subtree = self.subtree();
        match self.source() {
            None => subtree.join(self.label),
            Some(source) => match Path::new(source).file_name() {
                Some(name) => subtree.join(name),
                None => subtree.join(self.label),
            },
        }
    }
}

fn mirrored_parent(area: &str, source: &str) -> PathBuf {
    let relative = source.trim_start_matches('/');
    match Path::new(relative).parent() {
        Some(parent) => Path::new(area).join(parent),
        None => PathBuf::from(area),
    }
}

/// iptables table guarded by a kernel-module check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IptablesTable {
    Filter,
    Nat,
}

impl IptablesTable {
    /// Module whose absence means `iptables` would autoload it
    pub fn module(&self) -> &'static str {
        match self {
            IptablesTable::Filter => "iptable_filter",
            IptablesTable::Nat => "nf_conntrack",
        }
    }

    pub fn probe(&self) -> ProbeSpec {
        match self {
            IptablesTable::Filter => IPTABLES_FILTER,
            IptablesTable::Nat => IPTABLES_NAT,
        }
    }

    /// Stand-in run when the module is not loaded
    pub fn substitute(&self) -> ProbeSpec {
        match self {
            IptablesTable::Filter => IPTABLES_FILTER_SKIPPED,
            IptablesTable::Nat => IPTABLES_NAT_SKIPPED,
        }
    }
}

/// A plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Plain probe; copy probes are skipped when their source is absent
    Probe(ProbeSpec),
    /// `swapctl` when available, otherwise `swapon`
    Swap,
    /// One iostat flavour chosen from the platform markers
    Iostat,
    /// iptables listing, only if the table's module is already loaded
    Iptables(IptablesTable),
    /// Mirror of limits.d, only if it holds at least one `.conf`
    LimitsDir,
}

pub const SWAPCTL: ProbeSpec = ProbeSpec::command("swap", &["swapctl", "-l"]);
pub const SWAPON: ProbeSpec = ProbeSpec::command("swap", &["swapon", "-s"]);

pub const IOSTAT_LINUX: ProbeSpec = ProbeSpec::command("iostat", &["iostat", "-x", "5", "2"]);
pub const IOSTAT_SOLARIS: ProbeSpec = ProbeSpec::command("iostat", &["iostat", "-xn", "5", "2"]);
pub const IOSTAT_BSD: ProbeSpec =
    ProbeSpec::command("iostat", &["iostat", "-x", "-w", "5", "-c", "2"]);

pub const IPTABLES_FILTER: ProbeSpec =
    ProbeSpec::command("iptables_filter", &["iptables", "-L", "-n", "-v"]);
pub const IPTABLES_NAT: ProbeSpec =
    ProbeSpec::command("iptables_nat", &["iptables", "-t", "nat", "-L", "-n", "-v"]);
pub const IPTABLES_FILTER_SKIPPED: ProbeSpec = ProbeSpec::command(
    "iptables_filter",
    &[
        "echo",
        "iptable_filter module not loaded; iptables not run to avoid loading it",
    ],
);
pub const IPTABLES_NAT_SKIPPED: ProbeSpec = ProbeSpec::command(
    "iptables_nat",
    &[
        "echo",
        "nf_conntrack module not loaded; iptables not run to avoid loading it",
    ],
);

pub const LIMITS_D: ProbeSpec =
    ProbeSpec::tree("cp_limits.d", "/etc/security/limits.d", LIMITS_CONF_EXTENSION);

static SYSCMDS: &[Step] = &[
    Step::Probe(ProbeSpec::command("uname", &["uname", "-a"])),
    Step::Probe(ProbeSpec::command("hostname", &["hostname"])),
    Step::Probe(ProbeSpec::command("uptime", &["uptime"])),
    Step::Probe(ProbeSpec::command("date", &["date"])),
    Step::Probe(ProbeSpec::command("lsb_release", &["lsb_release", "-a"])),
    Step::Probe(ProbeSpec::command("lscpu", &["lscpu"])),
    Step::Probe(ProbeSpec::command("free", &["free", "-m"])),
    Step::Probe(ProbeSpec::command("df", &["df", "-h"])),
    Step::Probe(ProbeSpec::command("mount", &["mount"])),
    Step::Probe(ProbeSpec::command("ps", &["ps", "aux"])),
    Step::Probe(ProbeSpec::command("top", &["top", "-b", "-n", "1"])),
    Step::Probe(ProbeSpec::command("vmstat", &["vmstat", "1", "5"])),
    Step::Iostat,
    Step::Swap,
    Step::Probe(ProbeSpec::command("ifconfig", &["ifconfig", "-a"])),
    Step::Probe(ProbeSpec::command("ip_addr", &["ip", "addr"])),
    Step::Probe(ProbeSpec::command("netstat", &["netstat", "-an"])),
    Step::Probe(ProbeSpec::command("netstat", &["netstat", "-rn"])),
    Step::Probe(ProbeSpec::command("lsmod", &["lsmod"])),
    Step::Probe(ProbeSpec::command("numactl", &["numactl", "--hardware"])),
    Step::Iptables(IptablesTable::Filter),
    Step::Iptables(IptablesTable::Nat),
    Step::Probe(ProbeSpec::file("cp_cpuinfo", "/proc/cpuinfo")),
    Step::Probe(ProbeSpec::file("cp_meminfo", "/proc/meminfo")),
    Step::Probe(ProbeSpec::file("cp_mounts", "/proc/mounts")),
    Step::Probe(ProbeSpec::file("cp_version", "/proc/version")),
    Step::Probe(ProbeSpec::file("cp_loadavg", "/proc/loadavg")),
    Step::Probe(ProbeSpec::file("cp_swaps", "/proc/swaps")),
    Step::Probe(ProbeSpec::file("cp_vmstat", "/proc/vmstat")),
    Step::Probe(ProbeSpec::file("cp_swappiness", "/proc/sys/vm/swappiness")),
    Step::Probe(ProbeSpec::file("cp_overcommit_memory", "/proc/sys/vm/overcommit_memory")),
    Step::Probe(ProbeSpec::file("cp_file-max", "/proc/sys/fs/file-max")),
    Step::Probe(ProbeSpec::file(
        "cp_enabled",
        "/sys/kernel/mm/transparent_hugepage/enabled",
    )),
    Step::Probe(ProbeSpec::file(
        "cp_defrag",
        "/sys/kernel/mm/transparent_hugepage/defrag",
    )),
];

static LOGS: &[Step] = &[
    Step::Probe(ProbeSpec::file("cp_syslog", "/var/log/syslog")),
    Step::Probe(ProbeSpec::file("cp_messages", "/var/log/messages")),
    Step::Probe(ProbeSpec::file("cp_kern.log", "/var/log/kern.log")),
    Step::Probe(ProbeSpec::file("cp_dmesg", "/var/log/dmesg")),
    Step::Probe(ProbeSpec::file("cp_boot.log", "/var/log/boot.log")),
];

static CFGS: &[Step] = &[
    Step::Probe(ProbeSpec::file("cp_fstab", "/etc/fstab")),
    Step::Probe(ProbeSpec::file("cp_hosts", "/etc/hosts")),
    Step::Probe(ProbeSpec::file("cp_resolv.conf", "/etc/resolv.conf")),
    Step::Probe(ProbeSpec::file("cp_nsswitch.conf", "/etc/nsswitch.conf")),
    Step::Probe(ProbeSpec::file("cp_sysctl.conf", "/etc/sysctl.conf")),
    Step::Probe(ProbeSpec::file("cp_limits.conf", "/etc/security/limits.conf")),
    Step::LimitsDir,
];

static EXTRA: &[Step] = &[
    Step::Probe(ProbeSpec::command("sysctl", &["sysctl", "-a"])),
    Step::Probe(ProbeSpec::command("dmesg", &["dmesg"])),
    Step::Probe(ProbeSpec::command("lsof", &["lsof", "-n"])),
    Step::Probe(ProbeSpec::command("ps_threads", &["ps", "-eLf"])),
    Step::Probe(ProbeSpec::command("netstat_stats", &["netstat", "-s"])),
    Step::Probe(ProbeSpec::command(
        "journalctl",
        &["journalctl", "--no-pager", "-n", "10000"],
    )),
    Step::Probe(ProbeSpec::command("lsblk", &["lsblk"])),
    Step::Probe(ProbeSpec::command("lspci", &["lspci"])),
];

/// Top-level collection group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    SysCmds,
    Logs,
    Cfgs,
    Extra,
}

impl Category {
    /// Every category in collection order
    pub const ALL: [Category; 4] = [
        Category::SysCmds,
        Category::Logs,
        Category::Cfgs,
        Category::Extra,
    ];

    pub fn plan(&self) -> &'static [Step] {
        match self {
            Category::SysCmds => SYSCMDS,
            Category::Logs => LOGS,
            Category::Cfgs => CFGS,
            Category::Extra => EXTRA,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::SysCmds => write!(f, "syscmds"),
            Category::Logs => write!(f, "logs"),
            Category::Cfgs => write!(f, "cfgs"),
            Category::Extra => write!(f, "extra"),
        }
    }
}
