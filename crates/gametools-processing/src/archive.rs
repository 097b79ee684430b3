//! Archive bundler
//!
//! Packs per-role files into one umbrella zip: every file sits at
//! `<Folder>/<filename>`, and each sub-archived role is also embedded as
//! `<Folder>.zip` at the root containing just that role's files.

use bytes::Bytes;
use gametools_core::{AppError, AppResult, AssetRole};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Files per role, keyed by file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleFolders {
    folders: BTreeMap<AssetRole, BTreeMap<String, Bytes>>,
}

impl BundleFolders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: AssetRole, filename: impl Into<String>, data: Bytes) {
        self.folders
            .entry(role)
            .or_default()
            .insert(filename.into(), data);
    }

    pub fn files(&self, role: AssetRole) -> Option<&BTreeMap<String, Bytes>> {
        self.folders.get(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetRole, &BTreeMap<String, Bytes>)> {
        self.folders.iter().map(|(role, files)| (*role, files))
    }

    /// Total number of files across all roles
    pub fn file_count(&self) -> usize {
        self.folders.values().map(BTreeMap::len).sum()
    }
}

/// Sanitize filename for archive entry to prevent path traversal.
/// Extracts only the base name (strips path components like `../`).
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

fn zip_error(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Archive(format!("{}: {}", context, err))
}

fn write_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    path: &str,
    data: &[u8],
    options: FileOptions,
) -> AppResult<()> {
    zip.start_file(path, options)
        .map_err(|e| zip_error(&format!("Failed to add {} to ZIP", path), e))?;
    zip.write_all(data)
        .map_err(|e| zip_error(&format!("Failed to write {} to ZIP", path), e))?;
    Ok(())
}

fn deflated() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

/// Zip of one role's files, each at the archive root
fn role_archive(role: AssetRole, files: &BTreeMap<String, Bytes>) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        for (index, (filename, data)) in files.iter().enumerate() {
            let safe_name =
                sanitize_archive_filename(filename, &format!("{}_{}", role.keyword(), index));
            write_entry(&mut zip, &safe_name, data, deflated())?;
        }
        zip.finish()
            .map_err(|e| zip_error("Failed to finalize ZIP archive", e))?;
    }
    Ok(buffer)
}

/// Build the umbrella archive.
///
/// `sub_archive_roles` lists the roles that also get a `<Folder>.zip` entry;
/// roles without files are skipped.
pub fn bundle(folders: &BundleFolders, sub_archive_roles: &[AssetRole]) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));

        for (role, files) in folders.iter() {
            for (index, (filename, data)) in files.iter().enumerate() {
                let safe_name =
                    sanitize_archive_filename(filename, &format!("{}_{}", role.keyword(), index));
                let path = format!("{}/{}", role.folder_name(), safe_name);
                write_entry(&mut zip, &path, data, deflated())?;
            }
        }

        for role in sub_archive_roles {
            let Some(files) = folders.files(*role).filter(|files| !files.is_empty()) else {
                continue;
            };
            let nested = role_archive(*role, files)?;
            let path = format!("{}.zip", role.folder_name());
            debug!(role = %role, size_bytes = nested.len(), "Embedding role archive");
            // Already deflated inside; store as-is.
            let stored = FileOptions::default()
                .compression_method(CompressionMethod::Stored)
                .unix_permissions(0o644);
            write_entry(&mut zip, &path, &nested, stored)?;
        }

        zip.finish()
            .map_err(|e| zip_error("Failed to finalize ZIP archive", e))?;
    }

    Ok(buffer)
}

/// Download name for a bundle: `<game>_bundle.zip`, `game_bundle.zip` when unnamed
pub fn bundle_file_name(game_name: &str) -> String {
    let name = game_name.trim();
    let name = if name.is_empty() { "game" } else { name };
    format!("{}_bundle.zip", sanitize_archive_filename(name, "game"))
}
