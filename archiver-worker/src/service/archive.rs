//! Archive hand-off
//!
//! Moves a finished crawl's archive into the archive directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Where the crawler leaves the archive of a job
///
/// `<workdir>/collections/<job_id>/<job_id>.wacz`
pub fn collection_archive_path(workdir: &Path, job_id: Uuid) -> PathBuf {
    let id = job_id.to_string();
    workdir
        .join("collections")
        .join(&id)
        .join(format!("{}.wacz", id))
}

/// Copies `source` into `archives_dir` as `name` and syncs it to disk
///
/// The directory is created if needed. The copy is written under a
/// temporary name first so a partial file never shows up as an archive.
pub async fn store_archive(source: &Path, archives_dir: &Path, name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(archives_dir)
        .await
        .with_context(|| format!("Failed to create archive directory {}", archives_dir.display()))?;

    let destination = archives_dir.join(name);
    let partial = archives_dir.join(format!("{}.part", name));

    tokio::fs::copy(source, &partial)
        .await
        .with_context(|| format!("Failed to copy archive {}", source.display()))?;

    let file = tokio::fs::File::open(&partial)
        .await
        .context("Failed to reopen copied archive")?;
    file.sync_all().await.context("Failed to sync archive")?;
    drop(file);

    tokio::fs::rename(&partial, &destination)
        .await
        .with_context(|| format!("Failed to move archive into {}", destination.display()))?;

    info!("Stored archive {}", destination.display());
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_archive_path() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let path = collection_archive_path(Path::new("/crawls"), id);
        assert_eq!(
            path,
            PathBuf::from(
                "/crawls/collections/550e8400-e29b-41d4-a716-446655440000/550e8400-e29b-41d4-a716-446655440000.wacz"
            )
        );
    }

    #[tokio::test]
    async fn test_store_creates_directory_and_copies() {
        let work = tempfile::tempdir().unwrap();
        let source = work.path().join("out.wacz");
        std::fs::write(&source, b"archive bytes").unwrap();

        let archives = work.path().join("nested").join("archives");
        let stored = store_archive(&source, &archives, "my-site.wacz").await.unwrap();

        assert_eq!(stored, archives.join("my-site.wacz"));
        assert_eq!(std::fs::read(&stored).unwrap(), b"archive bytes");
        assert!(!archives.join("my-site.wacz.part").exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let work = tempfile::tempdir().unwrap();
        let result = store_archive(&work.path().join("absent.wacz"), work.path(), "x.wacz").await;
        assert!(result.is_err());
        assert!(!work.path().join("x.wacz").exists());
    }
}
