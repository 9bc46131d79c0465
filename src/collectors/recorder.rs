//! Result recorder.
//!
//! Each executed probe leaves a two-line record in its subtree's `.info`
//! directory: the invocation, then the exit status. The presence of records
//! is meaningful on its own:
//!
//! - no record: the probe's tool or source was absent
//! - record with a nonzero status: the probe ran and failed
//! - record with status 0: a command that succeeded (copies that succeed have
//!   their record discarded, the copied file is trace enough)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::collectors::runner::{ProbeResult, ProbeStatus};

/// Writes and removes metadata records
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultRecorder;

impl ResultRecorder {
    pub fn new() -> Self {
        ResultRecorder
    }

    /// Write the record for `result` into `info_dir`, replacing any earlier
    /// record for the same label.
    ///
    /// Returns `Ok(None)` for a probe whose tool was not found: absence is
    /// expressed by the lack of a record.
    pub fn record(&self, info_dir: &Path, result: &ProbeResult) -> io::Result<Option<PathBuf>> {
        let code = match result.status {
            ProbeStatus::Exited(code) => code,
            ProbeStatus::ToolNotFound => return Ok(None),
        };

        let path = info_dir.join(&result.label);
        fs::write(&path, format!("{}\n{}\n", result.invocation, code))?;
        debug!("Recorded {} -> {}", result.label, code);
        Ok(Some(path))
    }

    /// Remove the record for `label`; a missing record is not an error
    pub fn discard(&self, info_dir: &Path, label: &str) -> io::Result<()> {
        match fs::remove_file(info_dir.join(label)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// A parsed metadata record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub invocation: String,
    pub exit_status: i32,
}

impl MetadataRecord {
    pub fn parse(contents: &str) -> Option<Self> {
        let mut lines = contents.lines();
        let invocation = lines.next()?.to_string();
        let exit_status = lines.next()?.trim().parse().ok()?;
        Some(MetadataRecord {
            invocation,
            exit_status,
        })
    }

    pub fn read(path: &Path) -> io::Result<Option<Self>> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }
}
