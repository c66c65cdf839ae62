// src/artifact/archive.rs

//! Unpacking of single-file `.tgz` archives
//!
//! A plugin or asset archive must contain exactly one regular file. Directory
//! entries and pax global headers are ignored; anything else (no file, several files, links or
//! devices) rejects the archive.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tar::{Archive, EntryType};
use tracing::debug;

/// Maximum size of the unpacked file (1 GB)
pub const MAX_UNPACKED_SIZE: u64 = 1024 * 1024 * 1024;

/// Unpack the single file in `archive_path` to `dest`, marking it executable
///
/// The file is written to a temporary sibling first and renamed into place,
/// so `dest` either does not exist or holds the complete content.
pub fn unpack_single_file(archive_path: &Path, dest: &Path) -> Result<()> {
    let archive_error = |reason: String| Error::ArchiveError {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path)
        .map_err(|e| archive_error(format!("failed to open: {e}")))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let parent = dest.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let mut unpacked: Option<(String, tempfile::NamedTempFile)> = None;
    let entries = archive
        .entries()
        .map_err(|e| archive_error(format!("failed to read entries: {e}")))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(format!("failed to read entry: {e}")))?;
        let name = entry
            .path()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| "<invalid path>".to_string());

        match entry.header().entry_type() {
            EntryType::Directory | EntryType::XGlobalHeader => continue,
            EntryType::Regular | EntryType::Continuous => {}
            other => {
                return Err(archive_error(format!(
                    "entry {} has unsupported type {:?}",
                    name, other
                )));
            }
        }

        if let Some((first, _)) = &unpacked {
            return Err(archive_error(format!(
                "archive must contain exactly one file, found {} and {}",
                first, name
            )));
        }

        let size = entry.header().size().unwrap_or(0);
        if size > MAX_UNPACKED_SIZE {
            return Err(archive_error(format!(
                "entry {} is {} bytes, larger than the {} byte limit",
                name, size, MAX_UNPACKED_SIZE
            )));
        }

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        io::copy(&mut (&mut entry).take(MAX_UNPACKED_SIZE), temp.as_file_mut())
            .map_err(|e| archive_error(format!("failed to unpack {}: {e}", name)))?;
        unpacked = Some((name, temp));
    }

    let (name, temp) = unpacked.ok_or_else(|| {
        archive_error("archive must contain exactly one file, found none".to_string())
    })?;

    temp.as_file().sync_all()?;
    set_executable(temp.path())?;
    temp.persist(dest).map_err(|e| {
        Error::IoError(format!("Failed to move unpacked file to {}: {}", dest.display(), e.error))
    })?;

    debug!("Unpacked {} from {} to {}", name, archive_path.display(), dest.display());
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
