//! Probe runner.
//!
//! Executes a single probe and reports what happened. Nothing a probe does
//! can fail the run: a missing tool is a skip, a failing command or copy is a
//! nonzero status. The only side effect besides the probe's own output is one
//! progress character per executed probe.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::collectors::lookup::CommandLookup;
use crate::collectors::platform::{has_extension, HostRoot};
use crate::config::{ProbeKind, ProbeSpec};
use crate::constants::{
    EXIT_COPY_FAILED, EXIT_SIGNAL_BASE, EXIT_SPAWN_FAILED, PROGRESS_FAILED, PROGRESS_OK,
};
use crate::staging::StagingTree;

/// How a probe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Exited(i32),
    /// The command was not found; nothing was executed
    ToolNotFound,
}

/// Outcome of one probe execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub label: String,
    /// The command line as executed, space separated
    pub invocation: String,
    pub status: ProbeStatus,
    pub success: bool,
}

impl ProbeResult {
    pub fn new(label: impl Into<String>, invocation: impl Into<String>, status: ProbeStatus) -> Self {
        ProbeResult {
            label: label.into(),
            invocation: invocation.into(),
            success: status == ProbeStatus::Exited(0),
            status,
        }
    }
}

/// Runs probes, resolving commands through `L` and writing progress to `W`
pub struct ProbeRunner<L, W> {
    lookup: L,
    progress: W,
}

impl<L: CommandLookup, W: Write> ProbeRunner<L, W> {
    pub fn new(lookup: L, progress: W) -> Self {
        ProbeRunner { lookup, progress }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn progress(&self) -> &W {
        &self.progress
    }

    pub fn into_progress(self) -> W {
        self.progress
    }

    /// Run `spec` with file sources resolved against `host` and output
    /// written under `tree`. The probe's subtree must already exist.
    pub fn run(&mut self, spec: &ProbeSpec, host: &HostRoot, tree: &StagingTree) -> ProbeResult {
        match spec.kind {
            ProbeKind::Command(argv) => {
                self.run_command(spec.label, argv, &tree.path(spec.destination()))
            }
            ProbeKind::CopyFile(source) => {
                self.copy_file(spec.label, &host.resolve(source), &tree.path(spec.subtree()))
            }
            ProbeKind::CopyTree { source, extension } => self.copy_tree(
                spec.label,
                &host.resolve(source),
                &tree.path(spec.subtree()),
                extension,
            ),
        }
    }

    /// Run `argv`, appending its stdout and stderr to `output`
    pub fn run_command(&mut self, label: &str, argv: &[&str], output: &Path) -> ProbeResult {
        let program = match argv.first() {
            Some(program) => *program,
            None => return ProbeResult::new(label, "", ProbeStatus::ToolNotFound),
        };

        match self.lookup.find(program) {
            Some(resolved) => self.run_command_at(label, argv, &resolved, output),
            None => {
                debug!("Skipping {}: {} not found", label, program);
                ProbeResult::new(label, argv.join(" "), ProbeStatus::ToolNotFound)
            }
        }
    }

    /// Run `argv` with its program already resolved to `resolved`, skipping
    /// the lookup
    pub fn run_command_at(
        &mut self,
        label: &str,
        argv: &[&str],
        resolved: &Path,
        output: &Path,
    ) -> ProbeResult {
        let invocation = argv.join(" ");
        let args = argv.get(1..).unwrap_or_default();

        let code = match execute(resolved, args, output) {
            Ok(code) => code,
            Err(e) => {
                warn!("Failed to run {}: {}", invocation, e);
                EXIT_SPAWN_FAILED
            }
        };
        debug!("{} exited with {}", invocation, code);

        self.finish(ProbeResult::new(label, invocation, ProbeStatus::Exited(code)))
    }

    /// Copy `source` into `dest_dir`, keeping its file name
    pub fn copy_file(&mut self, label: &str, source: &Path, dest_dir: &Path) -> ProbeResult {
        let invocation = format!("cp {} {}/", source.display(), dest_dir.display());

        let code = match copy_into(source, dest_dir) {
            Ok(bytes) => {
                debug!("Copied {} ({} bytes)", source.display(), bytes);
                0
            }
            Err(e) => {
                debug!("Copy of {} failed: {}", source.display(), e);
                EXIT_COPY_FAILED
            }
        };

        self.finish(ProbeResult::new(label, invocation, ProbeStatus::Exited(code)))
    }

    /// Mirror `source` into `dest_dir/<source name>`, keeping only files
    /// with `extension` and preserving their relative paths
    pub fn copy_tree(
        &mut self,
        label: &str,
        source: &Path,
        dest_dir: &Path,
        extension: &str,
    ) -> ProbeResult {
        let invocation = format!("cp -r {} {}/", source.display(), dest_dir.display());

        let code = match source.file_name() {
            Some(name) => {
                let target = dest_dir.join(name);
                match mirror_tree(source, &target, extension) {
                    Ok(count) => {
                        debug!("Mirrored {} files from {}", count, source.display());
                        0
                    }
                    Err(e) => {
                        debug!("Mirror of {} failed: {}", source.display(), e);
                        // Leave nothing half-copied behind
                        let _ = fs::remove_dir_all(&target);
                        EXIT_COPY_FAILED
                    }
                }
            }
            None => EXIT_COPY_FAILED,
        };

        self.finish(ProbeResult::new(label, invocation, ProbeStatus::Exited(code)))
    }

    fn finish(&mut self, result: ProbeResult) -> ProbeResult {
        let mark = if result.success {
            PROGRESS_OK
        } else {
            PROGRESS_FAILED
        };
        let progress = &mut self.progress;
        if let Err(e) = progress.write_all(&[mark]).and_then(|_| progress.flush()) {
            debug!("Cannot write progress: {}", e);
        }
        result
    }
}

fn execute(program: &Path, args: &[&str], output: &Path) -> io::Result<i32> {
    let stdout = OpenOptions::new().create(true).append(true).open(output)?;
    let stderr = stdout.try_clone()?;

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .status()?;

    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return EXIT_SIGNAL_BASE + signal;
        }
    }
    EXIT_SPAWN_FAILED
}

/// Copy one file into `dest_dir`. A failed copy removes the partial file.
fn copy_into(source: &Path, dest_dir: &Path) -> io::Result<u64> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "source has no file name")
    })?;
    let dest = dest_dir.join(name);

    let mut reader = File::open(source)?;
    let copied = File::create(&dest).and_then(|mut writer| io::copy(&mut reader, &mut writer));
    if copied.is_err() {
        let _ = fs::remove_file(&dest);
    }
    copied
}

fn mirror_tree(source: &Path, target: &Path, extension: &str) -> io::Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let dest = target.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        copied += 1;
    }

    Ok(copied)
}
