use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use tar::Builder;
use walkdir::WalkDir;

use crate::config::OutputTarget;
use crate::error::{NinjaError, Result};
use crate::staging::StagingTree;

/// Write `root` as a gzip-compressed tar stream into `writer`.
///
/// Every entry is stored under `name/`, so unpacking recreates a single
/// top-level directory. Entries are added in sorted order and symlinks are
/// stored as links, never followed.
///
/// Returns the writer once the gzip trailer has been written.
pub fn write_archive<W: Write>(root: &Path, name: &str, writer: W) -> io::Result<W> {
    let mut builder = Builder::new(GzEncoder::new(writer, Compression::default()));
    builder.follow_symlinks(false);

    let mut entries = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let archive_path = Path::new(name).join(relative);

        if entry.file_type().is_dir() {
            builder.append_dir(&archive_path, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), &archive_path)?;
        }
        entries += 1;
    }
    debug!("Archived {} entries from {}", entries, root.display());

    builder.into_inner()?.finish()
}

/// Archive the staging tree to `target`.
///
/// A file target is created exclusively; an existing file is never
/// overwritten. If writing fails the partial file is removed.
pub fn archive(tree: &StagingTree, target: &OutputTarget) -> Result<()> {
    let start = Instant::now();

    match target {
        OutputTarget::File(path) => {
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => NinjaError::OutputExists(path.clone()),
                    _ => NinjaError::Archive(e),
                })?;

            let written = write_archive(tree.root(), tree.name(), BufWriter::new(file))
                .and_then(|writer| writer.into_inner().map_err(|e| e.into_error()))
                .and_then(|file| file.sync_all());

            if let Err(e) = written {
                if let Err(rm) = fs::remove_file(path) {
                    debug!("Cannot remove partial archive {}: {}", path.display(), rm);
                }
                return Err(NinjaError::Archive(e));
            }
        }
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            write_archive(tree.root(), tree.name(), stdout.lock())
                .and_then(|mut out| out.flush())
                .map_err(NinjaError::Archive)?;
        }
    }

    info!("Archived {} to {} in {:?}", tree.root().display(), target, start.elapsed());
    Ok(())
}
