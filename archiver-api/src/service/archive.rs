//! Archive Service
//!
//! File operations on the archive directory. Names coming from requests are
//! checked to be a single path component before they touch the filesystem.

use archiver_core::domain::archive::{has_archive_extension, is_safe_archive_name, sanitize_archive_name};
use archiver_core::dto::archive::Archive;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Service error type
#[derive(Debug)]
pub enum ArchiveError {
    NotFound(String),
    InvalidName(String),
    AlreadyExists(String),
    Io(std::io::Error),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io(err)
    }
}

fn archive_path(dir: &Path, name: &str) -> Result<PathBuf, ArchiveError> {
    if !is_safe_archive_name(name) {
        return Err(ArchiveError::InvalidName(name.to_string()));
    }
    Ok(dir.join(name))
}

fn not_found_as(name: &str) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |err| match err.kind() {
        ErrorKind::NotFound => ArchiveError::NotFound(name.to_string()),
        _ => ArchiveError::Io(err),
    }
}

/// List the `.wacz` files in the archive directory, sorted by name
///
/// A missing directory has no archives.
pub async fn list_archives(dir: &Path) -> Result<Vec<Archive>, ArchiveError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut archives = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !has_archive_extension(&name) || !entry.file_type().await?.is_file() {
            continue;
        }
        archives.push(Archive { name });
    }

    archives.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(archives)
}

/// Resolve the path of an existing archive file
///
/// The file itself is streamed by the HTTP layer.
pub async fn locate_archive(dir: &Path, name: &str) -> Result<PathBuf, ArchiveError> {
    let path = archive_path(dir, name)?;
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(not_found_as(name))?;

    if !metadata.is_file() {
        return Err(ArchiveError::NotFound(name.to_string()));
    }
    Ok(path)
}

/// Delete an archive
pub async fn delete_archive(dir: &Path, name: &str) -> Result<(), ArchiveError> {
    let path = archive_path(dir, name)?;
    tokio::fs::remove_file(&path)
        .await
        .map_err(not_found_as(name))?;

    tracing::info!("Deleted archive {}", name);
    Ok(())
}

/// Rename an archive, sanitizing the requested name
///
/// # Returns
/// The final file name
pub async fn rename_archive(dir: &Path, name: &str, new_name: &str) -> Result<String, ArchiveError> {
    let source = archive_path(dir, name)?;

    if new_name.trim().is_empty() {
        return Err(ArchiveError::InvalidName(new_name.to_string()));
    }
    let target_name = sanitize_archive_name(new_name);
    let target = archive_path(dir, &target_name)?;

    tokio::fs::metadata(&source)
        .await
        .map_err(not_found_as(name))?;

    if target_name == name {
        return Ok(target_name);
    }

    if tokio::fs::try_exists(&target).await? {
        return Err(ArchiveError::AlreadyExists(target_name));
    }

    tokio::fs::rename(&source, &target)
        .await
        .map_err(not_found_as(name))?;

    tracing::info!("Renamed archive {} to {}", name, target_name);
    Ok(target_name)
}
