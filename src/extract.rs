use std::{
    fs,
    io::{self, Read, Seek},
    path::Path,
};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Archive members that make up a legacy Whoosh-format index. Members
/// with any other extension are never extracted.
pub const DEFAULT_INDEX_EXTENSIONS: &[&str] =
    &["dci", "dcz", "pst", "tiz", "toc"];

/// Extract the index members of a zip archive into `dest`.
///
/// `dest` is always a freshly created directory: anything already at
/// that path is removed first, so the result can never mix files from
/// two index versions. Only members whose filename extension is in
/// `allowed` are written, and member names are flattened to their final
/// component, so a hostile archive cannot drop files outside `dest`.
///
/// Returns the number of files written. A malformed archive or an I/O
/// failure mid-extraction leaves `dest` partially populated; the caller
/// must not treat it as a valid index.
pub fn extract_archive<R: Read + Seek>(
    reader: R,
    dest: &Path,
    allowed: &[&str],
) -> Result<usize> {
    let mut archive = ZipArchive::new(reader).map_err(|e| {
        Error::Extract(format!("not a readable zip archive: {e}"))
    })?;

    if dest.is_dir() {
        fs::remove_dir_all(dest).map_err(|e| {
            Error::Extract(format!("cannot clear {}: {e}", dest.display()))
        })?;
    }
    fs::create_dir_all(dest).map_err(|e| {
        Error::Extract(format!("cannot create {}: {e}", dest.display()))
    })?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .map_err(|e| Error::Extract(e.to_string()))?;
        if member.is_dir() {
            continue;
        }

        let member_name = member.name().to_string();
        let Some(file_name) = Path::new(&member_name).file_name() else {
            continue;
        };
        let is_index_file = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| allowed.contains(&ext));
        if !is_index_file {
            debug!(member = %member_name, "skipping non-index archive member");
            continue;
        }

        let target = dest.join(file_name);
        let mut out = fs::File::create(&target).map_err(|e| {
            Error::Extract(format!("cannot create {}: {e}", target.display()))
        })?;
        io::copy(&mut member, &mut out).map_err(|e| {
            Error::Extract(format!("cannot write {}: {e}", target.display()))
        })?;
        written += 1;
    }

    Ok(written)
}
