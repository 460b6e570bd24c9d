//! Zip archive decompression between object storage locations
//!
//! The archive is downloaded to a scratch directory, then each matching
//! member is extracted to a scratch file and uploaded on its own, so memory
//! use stays flat regardless of archive size.

use super::ObjectStore;
use crate::context::LogContext;
use crate::error::Result;
use gnaf_common::types::{join_key, ObjectRef};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A member selected for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Position in the zip central directory
    pub index: usize,
    /// Full path of the member inside the archive
    pub path: String,
    /// Last path segment; the member is written under this name
    pub file_name: String,
}

/// Members of the zip at `archive_path` whose extension equals `extension`
/// (case-insensitive). Directories and members with unsafe paths are skipped.
pub fn matching_members(
    archive_path: &Path,
    extension: &str,
    log: &LogContext,
) -> Result<Vec<ArchiveMember>> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut members = Vec::new();

    for index in 0..archive.len() {
        let file = archive.by_index(index)?;

        if file.is_dir() {
            continue;
        }

        let Some(enclosed) = file.enclosed_name() else {
            warn!(
                parent: log.span(),
                "Skipping archive member with unsafe path: {}",
                file.name()
            );
            continue;
        };

        let matches = enclosed
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));

        if !matches {
            continue;
        }

        let Some(file_name) = enclosed.file_name() else {
            continue;
        };

        members.push(ArchiveMember {
            index,
            path: file.name().to_string(),
            file_name: file_name.to_string_lossy().to_string(),
        });
    }

    Ok(members)
}

/// Write one member of the zip at `archive_path` to `destination`
pub fn extract_member(archive_path: &Path, index: usize, destination: &Path) -> Result<u64> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut member = archive.by_index(index)?;
    let mut out = BufWriter::new(File::create(destination)?);
    let size = std::io::copy(&mut member, &mut out)?;
    out.flush()?;
    Ok(size)
}

/// Decompress the zip at `source` into `destination_bucket`, writing each
/// member with the given extension to `<destination_prefix>/<file name>`.
///
/// Returns the uploaded objects in archive order.
pub async fn unzip_archive(
    store: &dyn ObjectStore,
    source: &ObjectRef,
    destination_bucket: &str,
    destination_prefix: &str,
    extension: &str,
    log: &LogContext,
) -> Result<Vec<ObjectRef>> {
    let scratch = tempfile::tempdir()?;
    let archive_path = scratch.path().join("archive.zip");

    let size = store.download(source, &archive_path).await?;
    info!(parent: log.span(), "Downloaded archive {} ({} bytes)", source, size);

    let members = matching_members(&archive_path, extension, log)?;
    info!(
        parent: log.span(),
        "Found {} .{} members in {}",
        members.len(),
        extension,
        source
    );

    let mut uploaded = Vec::with_capacity(members.len());

    for member in members {
        let member_path: PathBuf = scratch.path().join(&member.file_name);
        let bytes = extract_member(&archive_path, member.index, &member_path)?;
        debug!(parent: log.span(), "Extracted {} ({} bytes)", member.path, bytes);

        let object = ObjectRef::new(
            destination_bucket,
            join_key(destination_prefix, &member.file_name),
        );

        if uploaded.contains(&object) {
            warn!(
                parent: log.span(),
                "Archive member {} overwrites an earlier member at {}",
                member.path,
                object
            );
        }

        store.upload(&member_path, &object).await?;
        std::fs::remove_file(&member_path)?;

        uploaded.push(object);
    }

    Ok(uploaded)
}
