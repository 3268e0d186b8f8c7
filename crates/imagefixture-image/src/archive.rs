//! Tar serialization of a build context.
//!
//! Archives carry the directory contents at the archive root with no
//! filtering and no compression, which is what the engine expects for a
//! plain build context.

use std::path::Path;

use imagefixture_common::error::{FixtureError, Result};

/// Archives every file below `dir` into an in-memory tar stream.
///
/// # Errors
///
/// Returns `FixtureError::Archive` if the directory cannot be walked or read.
pub fn archive_dir(dir: &Path) -> Result<Vec<u8>> {
    tracing::info!(path = %dir.display(), "archiving build context");

    let archive_err = |e| FixtureError::Archive {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(true);
    builder.append_dir_all(".", dir).map_err(archive_err)?;
    let bytes = builder.into_inner().map_err(archive_err)?;

    tracing::debug!(bytes = bytes.len(), "build context archived");
    Ok(bytes)
}

/// Lists the regular-file paths contained in a tar stream.
///
/// # Errors
///
/// Returns `FixtureError::Archive` if the stream is not a valid archive.
pub fn list_entries(bytes: &[u8]) -> Result<Vec<String>> {
    let archive_err = |e| FixtureError::Archive {
        path: "<memory>".into(),
        source: e,
    };

    let mut archive = tar::Archive::new(bytes);
    let mut names = Vec::new();
    for entry in archive.entries().map_err(archive_err)? {
        let entry = entry.map_err(archive_err)?;
        if entry.header().entry_type().is_file() {
            let path = entry.path().map_err(archive_err)?;
            names.push(path.to_string_lossy().trim_start_matches("./").to_string());
        }
    }
    names.sort();
    Ok(names)
}
